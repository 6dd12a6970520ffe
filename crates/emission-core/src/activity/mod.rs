//! Activity data and metric configuration consumed from the submission system.

pub mod domain;
mod memory;
pub mod source;

pub use domain::{
    ActivityRecord, ActivityRecordId, AssignmentId, BasicMetric, EmissionLinkage,
    EmissionSettings, LayerId, MetricDefinition, MetricId, PeriodFrequency, TabularMetric,
    TimeSeriesMetric, UnitSettings,
};
pub use memory::InMemoryActivitySource;
pub use source::{ActivityFeed, MetricCatalog, SourceError};
