use std::collections::{BTreeSet, HashSet};
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::derived;

// ---------------------------------------------------------------------------
// Record – one (entity, date) observation
// ---------------------------------------------------------------------------

/// A single row of the source table.
///
/// Every numeric cell is optional: the cleaned exports leave plenty of blanks
/// (vaccinations before 2021, covariates for territories, ...).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    /// Country / region name (`location` in the source file).
    pub entity: String,
    /// Continent (`continent` in the source file). Absent for aggregates
    /// such as "World" or "European Union".
    pub region_group: Option<String>,
    pub iso_code: String,
    pub date: NaiveDate,
    pub population: Option<f64>,

    pub total_cases: Option<f64>,
    pub new_cases: Option<f64>,
    pub total_deaths: Option<f64>,
    pub new_deaths: Option<f64>,
    pub total_vaccinations: Option<f64>,
    pub people_vaccinated: Option<f64>,
    pub people_fully_vaccinated: Option<f64>,

    pub gdp_per_capita: Option<f64>,
    pub population_density: Option<f64>,
    pub median_age: Option<f64>,
    pub hospital_beds_per_thousand: Option<f64>,
    pub life_expectancy: Option<f64>,
    pub human_development_index: Option<f64>,
}

// ---------------------------------------------------------------------------
// Metric – a named numeric column, stored or derived
// ---------------------------------------------------------------------------

/// Every numeric quantity a chart can plot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    TotalCases,
    NewCases,
    TotalDeaths,
    NewDeaths,
    TotalVaccinations,
    PeopleVaccinated,
    PeopleFullyVaccinated,
    Population,
    GdpPerCapita,
    PopulationDensity,
    MedianAge,
    HospitalBedsPerThousand,
    LifeExpectancy,
    HumanDevelopmentIndex,
    // Derived
    VaccinationRate,
    MortalityRate,
    CasesPerMillion,
    DeathsPerMillion,
}

impl Metric {
    pub const ALL: [Metric; 18] = [
        Metric::TotalCases,
        Metric::NewCases,
        Metric::TotalDeaths,
        Metric::NewDeaths,
        Metric::TotalVaccinations,
        Metric::PeopleVaccinated,
        Metric::PeopleFullyVaccinated,
        Metric::Population,
        Metric::GdpPerCapita,
        Metric::PopulationDensity,
        Metric::MedianAge,
        Metric::HospitalBedsPerThousand,
        Metric::LifeExpectancy,
        Metric::HumanDevelopmentIndex,
        Metric::VaccinationRate,
        Metric::MortalityRate,
        Metric::CasesPerMillion,
        Metric::DeathsPerMillion,
    ];

    /// Column name as it appears in the source file (or would, for derived
    /// metrics).
    pub fn column(self) -> &'static str {
        match self {
            Metric::TotalCases => "total_cases",
            Metric::NewCases => "new_cases",
            Metric::TotalDeaths => "total_deaths",
            Metric::NewDeaths => "new_deaths",
            Metric::TotalVaccinations => "total_vaccinations",
            Metric::PeopleVaccinated => "people_vaccinated",
            Metric::PeopleFullyVaccinated => "people_fully_vaccinated",
            Metric::Population => "population",
            Metric::GdpPerCapita => "gdp_per_capita",
            Metric::PopulationDensity => "population_density",
            Metric::MedianAge => "median_age",
            Metric::HospitalBedsPerThousand => "hospital_beds_per_thousand",
            Metric::LifeExpectancy => "life_expectancy",
            Metric::HumanDevelopmentIndex => "human_development_index",
            Metric::VaccinationRate => "vaccination_rate",
            Metric::MortalityRate => "mortality_rate",
            Metric::CasesPerMillion => "cases_per_million",
            Metric::DeathsPerMillion => "deaths_per_million",
        }
    }

    pub fn from_column(name: &str) -> Option<Metric> {
        Metric::ALL.into_iter().find(|m| m.column() == name)
    }

    /// Human-readable label: `total_cases` → `Total Cases`.
    pub fn label(self) -> String {
        self.column()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Whether the value is computed rather than read from the file.
    pub fn is_derived(self) -> bool {
        matches!(
            self,
            Metric::VaccinationRate
                | Metric::MortalityRate
                | Metric::CasesPerMillion
                | Metric::DeathsPerMillion
        )
    }

    /// Whether the value is already normalised by population (or is a rate),
    /// so a per-million toggle must leave it alone.
    pub fn is_relative(self) -> bool {
        self.is_derived()
            || matches!(
                self,
                Metric::Population
                    | Metric::GdpPerCapita
                    | Metric::PopulationDensity
                    | Metric::MedianAge
                    | Metric::HospitalBedsPerThousand
                    | Metric::LifeExpectancy
                    | Metric::HumanDevelopmentIndex
            )
    }

    /// Read (or compute) the metric for one record.
    pub fn value(self, r: &Record) -> Option<f64> {
        let v = match self {
            Metric::TotalCases => r.total_cases,
            Metric::NewCases => r.new_cases,
            Metric::TotalDeaths => r.total_deaths,
            Metric::NewDeaths => r.new_deaths,
            Metric::TotalVaccinations => r.total_vaccinations,
            Metric::PeopleVaccinated => r.people_vaccinated,
            Metric::PeopleFullyVaccinated => r.people_fully_vaccinated,
            Metric::Population => r.population,
            Metric::GdpPerCapita => r.gdp_per_capita,
            Metric::PopulationDensity => r.population_density,
            Metric::MedianAge => r.median_age,
            Metric::HospitalBedsPerThousand => r.hospital_beds_per_thousand,
            Metric::LifeExpectancy => r.life_expectancy,
            Metric::HumanDevelopmentIndex => r.human_development_index,
            Metric::VaccinationRate => derived::vaccination_rate(r),
            Metric::MortalityRate => derived::mortality_rate(r),
            Metric::CasesPerMillion => derived::cases_per_million(r),
            Metric::DeathsPerMillion => derived::deaths_per_million(r),
        };
        v.filter(|x| x.is_finite())
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

// ---------------------------------------------------------------------------
// Table – the immutable collection of records
// ---------------------------------------------------------------------------

/// An ordered, immutable collection of records.
///
/// Operations never mutate a table in place; filters and aggregations build
/// new tables.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    records: Vec<Record>,
}

impl Table {
    pub fn from_records(records: Vec<Record>) -> Self {
        Table { records }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Earliest and latest date present.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let min = self.records.iter().map(|r| r.date).min()?;
        let max = self.records.iter().map(|r| r.date).max()?;
        Some((min, max))
    }

    /// Sorted distinct entity names.
    pub fn entities(&self) -> BTreeSet<String> {
        self.records.iter().map(|r| r.entity.clone()).collect()
    }

    /// Number of distinct entities, without allocating the names.
    pub fn entity_count(&self) -> usize {
        self.records
            .iter()
            .map(|r| r.entity.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Sorted distinct region groups (rows without one are skipped).
    pub fn region_groups(&self) -> BTreeSet<String> {
        self.records
            .iter()
            .filter_map(|r| r.region_group.clone())
            .collect()
    }

    /// All rows observed on `date`, in table order.
    pub fn on_date(&self, date: NaiveDate) -> Table {
        self.records
            .iter()
            .filter(|r| r.date == date)
            .cloned()
            .collect()
    }
}

impl FromIterator<Record> for Table {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Table {
            records: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Table {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
