use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(
    /// Identifier of one aggregated activity measurement.
    ActivityRecordId
);
string_id!(
    /// Identifier of the reporting assignment a record was submitted under.
    AssignmentId
);
string_id!(
    /// Organisational layer (site, subsidiary, ...) that owns the record.
    LayerId
);
string_id!(MetricId);

/// One aggregated measurement supplied by the submission system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: ActivityRecordId,
    pub aggregated_numeric_value: Option<Decimal>,
    pub activity_unit: String,
    pub reporting_period: NaiveDate,
    pub metric_id: MetricId,
    pub layer_id: LayerId,
    pub assignment_id: AssignmentId,
}

impl ActivityRecord {
    pub fn reporting_year(&self) -> i32 {
        self.reporting_period.year()
    }
}

/// Category, sub-category and lookup region shared by every metric shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmissionSettings {
    #[serde(default)]
    pub emission_category: Option<String>,
    #[serde(default)]
    pub emission_sub_category: Option<String>,
    /// Region used for factor lookup. Unrelated to the record's layer.
    #[serde(default)]
    pub location: Option<String>,
}

/// Unit configuration: a predefined unit type with an optional free-text override.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSettings {
    #[serde(default)]
    pub unit_type: Option<String>,
    #[serde(default)]
    pub custom_unit: Option<String>,
}

impl UnitSettings {
    pub fn resolved(&self) -> Option<&str> {
        non_blank(self.custom_unit.as_deref()).or_else(|| non_blank(self.unit_type.as_deref()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicMetric {
    pub id: MetricId,
    pub name: String,
    #[serde(default)]
    pub emission: EmissionSettings,
    #[serde(default)]
    pub unit: UnitSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabularMetric {
    pub id: MetricId,
    pub name: String,
    pub value_column: String,
    #[serde(default)]
    pub emission: EmissionSettings,
    #[serde(default)]
    pub unit: UnitSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodFrequency {
    Monthly,
    Quarterly,
    Annual,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSeriesMetric {
    pub id: MetricId,
    pub name: String,
    pub frequency: PeriodFrequency,
    #[serde(default)]
    pub emission: EmissionSettings,
    #[serde(default)]
    pub unit: UnitSettings,
}

/// Metric configuration as exposed by the submission system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MetricDefinition {
    Basic(BasicMetric),
    Tabular(TabularMetric),
    TimeSeries(TimeSeriesMetric),
}

/// Everything the calculation engine needs to know about a metric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmissionLinkage<'a> {
    pub emission_category: Option<&'a str>,
    pub emission_sub_category: Option<&'a str>,
    pub location: Option<&'a str>,
    pub resolved_unit: Option<&'a str>,
}

impl MetricDefinition {
    pub fn id(&self) -> &MetricId {
        match self {
            Self::Basic(metric) => &metric.id,
            Self::Tabular(metric) => &metric.id,
            Self::TimeSeries(metric) => &metric.id,
        }
    }

    pub fn linkage(&self) -> EmissionLinkage<'_> {
        let (emission, unit) = match self {
            Self::Basic(metric) => (&metric.emission, &metric.unit),
            Self::Tabular(metric) => (&metric.emission, &metric.unit),
            Self::TimeSeries(metric) => (&metric.emission, &metric.unit),
        };

        EmissionLinkage {
            emission_category: non_blank(emission.emission_category.as_deref()),
            emission_sub_category: non_blank(emission.emission_sub_category.as_deref()),
            location: non_blank(emission.location.as_deref()),
            resolved_unit: unit.resolved(),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
