use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use arrow::array::{
    Array, AsArray, Date32Array, Date64Array, Float32Array, Float64Array, Int32Array,
    Int64Array,
};
use arrow::datatypes::{DataType, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Deserialize;

use super::error::DashboardError;
use super::model::{Record, Table};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a pandemic table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv` / `.txt` – comma-separated, header row (OWID column names)
/// * `.tsv`          – tab-separated, same header
/// * `.parquet`      – same column names; `date` as Date32/Date64/Timestamp/Utf8
///
/// Any failure (missing file, missing column, bad date) is reported as
/// [`DashboardError::DataUnavailable`].
pub fn load_file(path: &Path) -> Result<Table, DashboardError> {
    load_any(path)
        .map(|table| {
            log::info!("Loaded {} rows from {}", table.len(), path.display());
            table
        })
        .map_err(|e| {
            log::error!("Failed to load {}: {e:#}", path.display());
            DashboardError::data_unavailable(path, &e)
        })
}

fn load_any(path: &Path) -> Result<Table> {
    if !path.exists() {
        bail!("file not found");
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" | "txt" => load_delimited(path, b','),
        "tsv" => load_delimited(path, b'\t'),
        "parquet" | "pq" => load_parquet(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

// ---------------------------------------------------------------------------
// Date parsing
// ---------------------------------------------------------------------------

/// Accepts `2021-01-31`, `2021-01-31 00:00:00` and `2021-01-31T00:00:00`.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(d);
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }
    bail!("'{s}' is not a calendar date")
}

// ---------------------------------------------------------------------------
// Delimited (CSV / TSV) loader
// ---------------------------------------------------------------------------

/// One CSV row as written by the cleaning step.
///
/// Numeric cells that are empty or unparsable become `None`; unknown columns
/// are ignored.
#[derive(Debug, Deserialize)]
struct CsvRow {
    location: String,
    #[serde(default)]
    continent: Option<String>,
    iso_code: String,
    date: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    population: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    total_cases: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    new_cases: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    total_deaths: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    new_deaths: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    total_vaccinations: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    people_vaccinated: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    people_fully_vaccinated: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    gdp_per_capita: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    population_density: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    median_age: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    hospital_beds_per_thousand: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    life_expectancy: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    human_development_index: Option<f64>,
}

impl CsvRow {
    fn into_record(self) -> Result<Record> {
        Ok(Record {
            date: parse_date(&self.date)?,
            entity: self.location,
            region_group: self.continent.filter(|c| !c.trim().is_empty()),
            iso_code: self.iso_code,
            population: self.population,
            total_cases: self.total_cases,
            new_cases: self.new_cases,
            total_deaths: self.total_deaths,
            new_deaths: self.new_deaths,
            total_vaccinations: self.total_vaccinations,
            people_vaccinated: self.people_vaccinated,
            people_fully_vaccinated: self.people_fully_vaccinated,
            gdp_per_capita: self.gdp_per_capita,
            population_density: self.population_density,
            median_age: self.median_age,
            hospital_beds_per_thousand: self.hospital_beds_per_thousand,
            life_expectancy: self.life_expectancy,
            human_development_index: self.human_development_index,
        })
    }
}

const REQUIRED_COLUMNS: [&str; 3] = ["location", "iso_code", "date"];

fn load_delimited(path: &Path, delimiter: u8) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::Headers)
        .from_path(path)
        .context("opening delimited file")?;

    let headers = reader.headers().context("reading header row")?.clone();
    for col in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == col) {
            bail!("missing '{col}' column");
        }
    }

    let mut records = Vec::new();
    for (row_no, result) in reader.deserialize::<CsvRow>().enumerate() {
        // +2: one for the header, one for 1-based line numbers.
        let line = row_no + 2;
        let row = result.with_context(|| format!("line {line}"))?;
        records.push(row.into_record().with_context(|| format!("line {line}"))?);
    }

    Ok(Table::from_records(records))
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with the same column names as the CSV export.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path) -> Result<Table> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut records = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        read_batch(&batch, &mut records)?;
    }
    Ok(Table::from_records(records))
}

fn read_batch(batch: &RecordBatch, out: &mut Vec<Record>) -> Result<()> {
    let schema = batch.schema();
    let columns: HashMap<&str, &Arc<dyn Array>> = schema
        .fields()
        .iter()
        .enumerate()
        .map(|(i, f)| (f.name().as_str(), batch.column(i)))
        .collect();

    let required = |name: &str| {
        columns
            .get(name)
            .copied()
            .ok_or_else(|| anyhow!("missing '{name}' column"))
    };
    let location = required("location")?;
    let iso_code = required("iso_code")?;
    let date = required("date")?;
    let continent = columns.get("continent").copied();
    let number = |name: &str, row: usize| {
        columns
            .get(name)
            .and_then(|col| extract_f64(col, row))
    };

    for row in 0..batch.num_rows() {
        let entity = extract_string(location, row)
            .with_context(|| format!("row {row}: 'location' is null or not text"))?;
        let day = extract_date(date, row).with_context(|| format!("row {row}: bad 'date'"))?;

        out.push(Record {
            entity,
            region_group: continent
                .and_then(|col| extract_string(col, row))
                .filter(|c| !c.trim().is_empty()),
            iso_code: extract_string(iso_code, row).unwrap_or_default(),
            date: day,
            population: number("population", row),
            total_cases: number("total_cases", row),
            new_cases: number("new_cases", row),
            total_deaths: number("total_deaths", row),
            new_deaths: number("new_deaths", row),
            total_vaccinations: number("total_vaccinations", row),
            people_vaccinated: number("people_vaccinated", row),
            people_fully_vaccinated: number("people_fully_vaccinated", row),
            gdp_per_capita: number("gdp_per_capita", row),
            population_density: number("population_density", row),
            median_age: number("median_age", row),
            hospital_beds_per_thousand: number("hospital_beds_per_thousand", row),
            life_expectancy: number("life_expectancy", row),
            human_development_index: number("human_development_index", row),
        });
    }
    Ok(())
}

// -- Arrow helpers --

fn extract_string(col: &Arc<dyn Array>, row: usize) -> Option<String> {
    if col.is_null(row) {
        return None;
    }
    match col.data_type() {
        DataType::Utf8 => Some(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => Some(col.as_string::<i64>().value(row).to_string()),
        _ => None,
    }
}

fn extract_f64(col: &Arc<dyn Array>, row: usize) -> Option<f64> {
    if col.is_null(row) {
        return None;
    }
    let any = col.as_any();
    let v = match col.data_type() {
        DataType::Float64 => any.downcast_ref::<Float64Array>()?.value(row),
        DataType::Float32 => any.downcast_ref::<Float32Array>()?.value(row) as f64,
        DataType::Int64 => any.downcast_ref::<Int64Array>()?.value(row) as f64,
        DataType::Int32 => any.downcast_ref::<Int32Array>()?.value(row) as f64,
        _ => return None,
    };
    Some(v).filter(|v| v.is_finite())
}

fn extract_date(col: &Arc<dyn Array>, row: usize) -> Result<NaiveDate> {
    if col.is_null(row) {
        bail!("null date");
    }
    let any = col.as_any();
    match col.data_type() {
        DataType::Date32 => {
            let days = any
                .downcast_ref::<Date32Array>()
                .context("expected Date32Array")?
                .value(row);
            date_from_millis(days as i64 * 86_400_000)
        }
        DataType::Date64 => {
            let millis = any
                .downcast_ref::<Date64Array>()
                .context("expected Date64Array")?
                .value(row);
            date_from_millis(millis)
        }
        DataType::Timestamp(unit, _) => {
            let raw = timestamp_value(col, unit, row)?;
            let millis = match unit {
                TimeUnit::Second => raw.saturating_mul(1_000),
                TimeUnit::Millisecond => raw,
                TimeUnit::Microsecond => raw / 1_000,
                TimeUnit::Nanosecond => raw / 1_000_000,
            };
            date_from_millis(millis)
        }
        DataType::Utf8 | DataType::LargeUtf8 => {
            let text = extract_string(col, row).context("expected text date")?;
            parse_date(&text)
        }
        other => bail!("unsupported date column type {other:?}"),
    }
}

fn timestamp_value(col: &Arc<dyn Array>, unit: &TimeUnit, row: usize) -> Result<i64> {
    use arrow::datatypes::{
        TimestampMicrosecondType, TimestampMillisecondType, TimestampNanosecondType,
        TimestampSecondType,
    };
    let v = match unit {
        TimeUnit::Second => col.as_primitive_opt::<TimestampSecondType>().map(|a| a.value(row)),
        TimeUnit::Millisecond => col
            .as_primitive_opt::<TimestampMillisecondType>()
            .map(|a| a.value(row)),
        TimeUnit::Microsecond => col
            .as_primitive_opt::<TimestampMicrosecondType>()
            .map(|a| a.value(row)),
        TimeUnit::Nanosecond => col
            .as_primitive_opt::<TimestampNanosecondType>()
            .map(|a| a.value(row)),
    };
    v.context("unreadable timestamp column")
}

fn date_from_millis(millis: i64) -> Result<NaiveDate> {
    DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.date_naive())
        .with_context(|| format!("timestamp {millis} out of range"))
}
