use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::domain::{CalculatedEmissionValue, CalculationScope};
use crate::activity::{ActivityRecordId, AssignmentId, LayerId};

/// Persistence for derived results. Rows are keyed by their source activity record.
pub trait ResultStore: Send + Sync {
    fn upsert(&self, value: CalculatedEmissionValue) -> Result<UpsertOutcome, ResultStoreError>;
    fn remove(&self, record_id: &ActivityRecordId) -> Result<bool, ResultStoreError>;
    fn fetch(
        &self,
        record_id: &ActivityRecordId,
    ) -> Result<Option<CalculatedEmissionValue>, ResultStoreError>;
    fn query(&self, filter: &ResultFilter) -> Result<Vec<CalculatedEmissionValue>, ResultStoreError>;
    /// Apply every upsert and delete of a change set as one atomic unit.
    fn commit(&self, changes: ScopeChangeSet) -> Result<CommitSummary, ResultStoreError>;
}

/// Error enumeration for result store failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResultStoreError {
    #[error("concurrent write conflict on result for record {0}")]
    Conflict(ActivityRecordId),
    #[error("result store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    Created,
    Updated,
    Unchanged,
}

/// Rows to write for a scope plus the full set of records whose rows survive it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeChangeSet {
    pub scope: CalculationScope,
    pub upserts: Vec<CalculatedEmissionValue>,
    /// Superset of the upserted record ids. In-scope rows outside it are deleted.
    pub retain: BTreeSet<ActivityRecordId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommitSummary {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub removed: Vec<ActivityRecordId>,
}

/// Filter for reporting queries. Period bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultFilter {
    #[serde(default)]
    pub assignment_id: Option<AssignmentId>,
    #[serde(default)]
    pub layer_id: Option<LayerId>,
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
}

impl ResultFilter {
    pub fn for_assignment(assignment_id: AssignmentId) -> Self {
        Self {
            assignment_id: Some(assignment_id),
            ..Self::default()
        }
    }

    pub fn matches(&self, value: &CalculatedEmissionValue) -> bool {
        self.assignment_id
            .as_ref()
            .map_or(true, |assignment| &value.assignment_id == assignment)
            && self
                .layer_id
                .as_ref()
                .map_or(true, |layer| &value.layer_id == layer)
            && self.from.map_or(true, |from| value.reporting_period >= from)
            && self.to.map_or(true, |to| value.reporting_period <= to)
    }
}

/// Run a store operation, retrying exactly once when it reports a write conflict.
pub fn retry_on_conflict<T>(
    mut operation: impl FnMut() -> Result<T, ResultStoreError>,
) -> Result<T, ResultStoreError> {
    match operation() {
        Err(ResultStoreError::Conflict(record_id)) => {
            warn!(%record_id, "result write conflicted; retrying once");
            operation()
        }
        other => other,
    }
}
