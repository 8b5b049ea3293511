//! Write a synthetic pandemic table (OWID column layout) as CSV and Parquet.
//!
//! Usage: `generate_sample [OUTPUT_STEM]` → `OUTPUT_STEM.csv`, `OUTPUT_STEM.parquet`
//! (default stem `cleaned_covid_data`).

use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Date32Array, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use chrono::{Days, NaiveDate};
use parquet::arrow::ArrowWriter;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// Static facts about one synthetic country.
struct Country {
    name: &'static str,
    iso: &'static str,
    continent: &'static str,
    population: f64,
    gdp_per_capita: f64,
    median_age: f64,
    life_expectancy: f64,
}

const COUNTRIES: [Country; 14] = [
    Country {
        name: "United States",
        iso: "USA",
        continent: "North America",
        population: 331e6,
        gdp_per_capita: 54225.0,
        median_age: 38.3,
        life_expectancy: 78.9,
    },
    Country {
        name: "Canada",
        iso: "CAN",
        continent: "North America",
        population: 38e6,
        gdp_per_capita: 44018.0,
        median_age: 41.4,
        life_expectancy: 82.4,
    },
    Country {
        name: "Mexico",
        iso: "MEX",
        continent: "North America",
        population: 129e6,
        gdp_per_capita: 17336.0,
        median_age: 29.3,
        life_expectancy: 75.1,
    },
    Country {
        name: "Brazil",
        iso: "BRA",
        continent: "South America",
        population: 213e6,
        gdp_per_capita: 14103.0,
        median_age: 33.5,
        life_expectancy: 75.9,
    },
    Country {
        name: "Argentina",
        iso: "ARG",
        continent: "South America",
        population: 45e6,
        gdp_per_capita: 18934.0,
        median_age: 31.9,
        life_expectancy: 76.7,
    },
    Country {
        name: "United Kingdom",
        iso: "GBR",
        continent: "Europe",
        population: 67e6,
        gdp_per_capita: 39753.0,
        median_age: 40.8,
        life_expectancy: 81.3,
    },
    Country {
        name: "Germany",
        iso: "DEU",
        continent: "Europe",
        population: 83e6,
        gdp_per_capita: 45229.0,
        median_age: 46.6,
        life_expectancy: 81.3,
    },
    Country {
        name: "Italy",
        iso: "ITA",
        continent: "Europe",
        population: 60e6,
        gdp_per_capita: 35220.0,
        median_age: 47.9,
        life_expectancy: 83.5,
    },
    Country {
        name: "India",
        iso: "IND",
        continent: "Asia",
        population: 1380e6,
        gdp_per_capita: 6426.0,
        median_age: 28.2,
        life_expectancy: 69.7,
    },
    Country {
        name: "Japan",
        iso: "JPN",
        continent: "Asia",
        population: 126e6,
        gdp_per_capita: 39002.0,
        median_age: 48.2,
        life_expectancy: 84.6,
    },
    Country {
        name: "Indonesia",
        iso: "IDN",
        continent: "Asia",
        population: 273e6,
        gdp_per_capita: 11188.0,
        median_age: 29.3,
        life_expectancy: 71.7,
    },
    Country {
        name: "Nigeria",
        iso: "NGA",
        continent: "Africa",
        population: 206e6,
        gdp_per_capita: 5338.0,
        median_age: 18.1,
        life_expectancy: 54.7,
    },
    Country {
        name: "South Africa",
        iso: "ZAF",
        continent: "Africa",
        population: 59e6,
        gdp_per_capita: 12295.0,
        median_age: 27.3,
        life_expectancy: 64.1,
    },
    Country {
        name: "Australia",
        iso: "AUS",
        continent: "Oceania",
        population: 25e6,
        gdp_per_capita: 44649.0,
        median_age: 37.9,
        life_expectancy: 83.4,
    },
];

const DAYS: u64 = 540;

#[derive(Default)]
struct Columns {
    location: Vec<String>,
    iso_code: Vec<String>,
    continent: Vec<String>,
    date: Vec<NaiveDate>,
    population: Vec<f64>,
    total_cases: Vec<f64>,
    new_cases: Vec<f64>,
    total_deaths: Vec<f64>,
    new_deaths: Vec<f64>,
    people_vaccinated: Vec<Option<f64>>,
    gdp_per_capita: Vec<f64>,
    median_age: Vec<f64>,
    life_expectancy: Vec<f64>,
}

fn simulate(rng: &mut SimpleRng) -> Result<Columns> {
    let start = NaiveDate::from_ymd_opt(2020, 3, 1).context("bad start date")?;
    let vaccine_day = 300;
    let mut cols = Columns::default();

    for c in &COUNTRIES {
        let attack = 0.05 + 0.15 * rng.next_f64();
        let fatality = 0.005 + 0.02 * rng.next_f64();
        let uptake = 0.4 + 0.55 * rng.next_f64();
        let (mut cases, mut deaths) = (0.0_f64, 0.0_f64);

        for day in 0..DAYS {
            // Two waves of daily incidence.
            let t = day as f64;
            let first = (-(t - 120.0).powi(2) / 2000.0).exp();
            let second = 1.4 * (-(t - 380.0).powi(2) / 3000.0).exp();
            let wave = first + second;
            let noise = 0.8 + 0.4 * rng.next_f64();
            let new_cases = (c.population * attack / 150.0 * wave * noise).round();
            let new_deaths = (new_cases * fatality).round();
            cases += new_cases;
            deaths += new_deaths;

            let vaccinated = (day >= vaccine_day).then(|| {
                let progress = ((day - vaccine_day) as f64 / 200.0).min(1.0);
                (c.population * uptake * progress).round()
            });

            cols.location.push(c.name.to_string());
            cols.iso_code.push(c.iso.to_string());
            cols.continent.push(c.continent.to_string());
            cols.date.push(start.checked_add_days(Days::new(day)).context("date overflow")?);
            cols.population.push(c.population);
            cols.total_cases.push(cases);
            cols.new_cases.push(new_cases);
            cols.total_deaths.push(deaths);
            cols.new_deaths.push(new_deaths);
            cols.people_vaccinated.push(vaccinated);
            cols.gdp_per_capita.push(c.gdp_per_capita);
            cols.median_age.push(c.median_age);
            cols.life_expectancy.push(c.life_expectancy);
        }
    }
    Ok(cols)
}

const HEADER: [&str; 13] = [
    "location",
    "iso_code",
    "continent",
    "date",
    "population",
    "total_cases",
    "new_cases",
    "total_deaths",
    "new_deaths",
    "people_vaccinated",
    "gdp_per_capita",
    "median_age",
    "life_expectancy",
];

fn write_csv(cols: &Columns, path: &str) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("creating {path}"))?;
    writer.write_record(HEADER)?;
    for i in 0..cols.location.len() {
        writer.write_record([
            cols.location[i].clone(),
            cols.iso_code[i].clone(),
            cols.continent[i].clone(),
            cols.date[i].format("%Y-%m-%d").to_string(),
            cols.population[i].to_string(),
            cols.total_cases[i].to_string(),
            cols.new_cases[i].to_string(),
            cols.total_deaths[i].to_string(),
            cols.new_deaths[i].to_string(),
            cols.people_vaccinated[i].map(|v| v.to_string()).unwrap_or_default(),
            cols.gdp_per_capita[i].to_string(),
            cols.median_age[i].to_string(),
            cols.life_expectancy[i].to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn to_batch(cols: &Columns) -> Result<RecordBatch> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).context("bad epoch")?;
    let days: Vec<i32> = cols
        .date
        .iter()
        .map(|d| (*d - epoch).num_days() as i32)
        .collect();
    let text = |v: &[String]| -> ArrayRef {
        Arc::new(StringArray::from(v.iter().map(|s| s.as_str()).collect::<Vec<_>>()))
    };
    let num = |v: &[f64]| -> ArrayRef { Arc::new(Float64Array::from(v.to_vec())) };

    let mut fields = vec![
        Field::new("location", DataType::Utf8, false),
        Field::new("iso_code", DataType::Utf8, false),
        Field::new("continent", DataType::Utf8, true),
        Field::new("date", DataType::Date32, false),
    ];
    fields.extend(HEADER[4..].iter().map(|name| Field::new(*name, DataType::Float64, true)));
    let schema = Arc::new(Schema::new(fields));

    let columns: Vec<ArrayRef> = vec![
        text(&cols.location),
        text(&cols.iso_code),
        text(&cols.continent),
        Arc::new(Date32Array::from(days)),
        num(&cols.population),
        num(&cols.total_cases),
        num(&cols.new_cases),
        num(&cols.total_deaths),
        num(&cols.new_deaths),
        Arc::new(Float64Array::from(cols.people_vaccinated.clone())),
        num(&cols.gdp_per_capita),
        num(&cols.median_age),
        num(&cols.life_expectancy),
    ];

    RecordBatch::try_new(schema, columns).context("building record batch")
}

fn write_parquet(batch: &RecordBatch, path: &str) -> Result<()> {
    let file = std::fs::File::create(path).with_context(|| format!("creating {path}"))?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(batch)?;
    writer.close()?;
    Ok(())
}

fn main() -> Result<()> {
    let stem = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "cleaned_covid_data".to_string());
    let mut rng = SimpleRng::new(42);

    let cols = simulate(&mut rng)?;
    let csv_path = format!("{stem}.csv");
    let parquet_path = format!("{stem}.parquet");

    write_csv(&cols, &csv_path)?;
    let batch = to_batch(&cols)?;
    write_parquet(&batch, &parquet_path)?;

    println!("{}", pretty_format_batches(&[batch.slice(0, 5)])?);
    println!(
        "Wrote {} rows ({} countries × {DAYS} days) to {csv_path} and {parquet_path}",
        cols.location.len(),
        COUNTRIES.len()
    );
    Ok(())
}
