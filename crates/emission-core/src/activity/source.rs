use super::domain::{ActivityRecord, ActivityRecordId, AssignmentId, MetricDefinition, MetricId};

/// Read-only feed of aggregated activity records from the submission system.
pub trait ActivityFeed: Send + Sync {
    fn record(&self, id: &ActivityRecordId) -> Result<Option<ActivityRecord>, SourceError>;
    fn records_for_assignment(
        &self,
        assignment: &AssignmentId,
    ) -> Result<Vec<ActivityRecord>, SourceError>;
    /// Assignments that currently own at least one record.
    fn assignments(&self) -> Result<Vec<AssignmentId>, SourceError>;
}

/// Metric configuration lookup.
pub trait MetricCatalog: Send + Sync {
    fn metric(&self, id: &MetricId) -> Result<Option<MetricDefinition>, SourceError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("activity source unavailable: {0}")]
    Unavailable(String),
}
