//! Administrative bulk load of reference factors from CSV.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use super::domain::{EmissionFactor, FactorId, FactorKey, GhgScope};

/// Maximum number of fractional digits a factor value may carry.
pub const VALUE_SCALE: u32 = 7;
/// Maximum number of significant digits a factor value may carry.
pub const VALUE_PRECISION: u32 = 15;

const MIN_YEAR: i32 = 1900;
const MAX_YEAR: i32 = 2100;

/// A validated factor row, prior to being assigned an id by a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorRecord {
    pub name: String,
    pub category: String,
    pub sub_category: String,
    pub activity_unit: String,
    pub value: Decimal,
    pub factor_unit: String,
    pub year: i32,
    pub region: String,
    pub scope: Option<GhgScope>,
    pub source: String,
    pub source_url: Option<String>,
}

impl FactorRecord {
    pub fn key(&self) -> FactorKey {
        FactorKey {
            year: self.year,
            category: self.category.clone(),
            sub_category: self.sub_category.clone(),
            activity_unit: self.activity_unit.clone(),
            factor_unit: self.factor_unit.clone(),
            region: self.region.clone(),
            scope: self.scope,
        }
    }

    pub fn into_factor(self, id: FactorId) -> EmissionFactor {
        EmissionFactor {
            id,
            name: self.name,
            year: self.year,
            category: self.category,
            sub_category: self.sub_category,
            activity_unit: self.activity_unit,
            factor_unit: self.factor_unit,
            region: self.region,
            scope: self.scope,
            value: self.value,
            source: self.source,
            source_url: self.source_url,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        for (field, value) in [
            ("category", &self.category),
            ("sub_category", &self.sub_category),
            ("activity_unit", &self.activity_unit),
            ("factor_unit", &self.factor_unit),
            ("region", &self.region),
        ] {
            if value.trim().is_empty() {
                return Err(format!("{field} must not be blank"));
            }
        }

        if !(MIN_YEAR..=MAX_YEAR).contains(&self.year) {
            return Err(format!(
                "year {} outside {MIN_YEAR}..={MAX_YEAR}",
                self.year
            ));
        }

        if !fits_value_column(self.value) {
            return Err(format!(
                "value {} does not fit decimal({VALUE_PRECISION},{VALUE_SCALE})",
                self.value
            ));
        }

        Ok(())
    }
}

fn fits_value_column(value: Decimal) -> bool {
    let normalized = value.normalize();
    if normalized.scale() > VALUE_SCALE {
        return false;
    }
    let integer_limit = Decimal::from(10_i64.pow(VALUE_PRECISION - VALUE_SCALE));
    normalized.abs().trunc() < integer_limit
}

/// Error raised while reading a factor file.
#[derive(Debug, thiserror::Error)]
pub enum FactorLoadError {
    #[error("failed to read factor file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid factor CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("line {line}: {reason}")]
    InvalidRow { line: u64, reason: String },
    #[error("line {line}: duplicate factor {key} (first seen on line {first_line})")]
    DuplicateKey {
        line: u64,
        first_line: u64,
        key: String,
    },
}

pub fn read_factor_file<P: AsRef<Path>>(path: P) -> Result<Vec<FactorRecord>, FactorLoadError> {
    let file = std::fs::File::open(path)?;
    parse_factor_csv(file)
}

pub fn parse_factor_csv<R: Read>(reader: R) -> Result<Vec<FactorRecord>, FactorLoadError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut records = Vec::new();
    let mut seen: HashMap<FactorKey, u64> = HashMap::new();

    let headers = csv_reader.headers()?.clone();

    for row in csv_reader.records() {
        let row = row?;
        // physical line the record starts on
        let line = row.position().map_or(0, |position| position.line());
        let parsed: FactorRow = row.deserialize(Some(&headers))?;
        let record = parsed
            .into_record()
            .map_err(|reason| FactorLoadError::InvalidRow { line, reason })?;
        record
            .validate()
            .map_err(|reason| FactorLoadError::InvalidRow { line, reason })?;

        let key = record.key();
        if let Some(first_line) = seen.get(&key) {
            return Err(FactorLoadError::DuplicateKey {
                line,
                first_line: *first_line,
                key: key.to_string(),
            });
        }
        seen.insert(key, line);
        records.push(record);
    }

    Ok(records)
}

#[derive(Debug, Deserialize)]
struct FactorRow {
    #[serde(default)]
    name: String,
    category: String,
    sub_category: String,
    activity_unit: String,
    value: String,
    factor_unit: String,
    year: String,
    region: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    scope: Option<String>,
    #[serde(default)]
    source: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    source_url: Option<String>,
}

impl FactorRow {
    fn into_record(self) -> Result<FactorRecord, String> {
        let value = Decimal::from_str(&self.value)
            .map_err(|err| format!("value '{}' is not a decimal ({err})", self.value))?;
        let year = self
            .year
            .parse::<i32>()
            .map_err(|_| format!("year '{}' is not an integer", self.year))?;
        let scope = self
            .scope
            .map(|raw| {
                raw.parse::<u8>()
                    .map_err(|_| format!("scope '{raw}' is not a number"))
                    .and_then(|number| GhgScope::try_from(number).map_err(|err| err.to_string()))
            })
            .transpose()?;

        Ok(FactorRecord {
            name: self.name,
            category: self.category,
            sub_category: self.sub_category,
            activity_unit: self.activity_unit,
            value,
            factor_unit: self.factor_unit,
            year,
            region: self.region,
            scope,
            source: self.source,
            source_url: self.source_url,
        })
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
