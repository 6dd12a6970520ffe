use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use super::domain::{ActivityRecord, ActivityRecordId, AssignmentId, MetricDefinition, MetricId};
use super::source::{ActivityFeed, MetricCatalog, SourceError};

/// In-memory stand-in for the submission system's records and metric configuration.
#[derive(Debug, Default)]
pub struct InMemoryActivitySource {
    records: RwLock<BTreeMap<ActivityRecordId, ActivityRecord>>,
    metrics: RwLock<BTreeMap<MetricId, MetricDefinition>>,
}

fn poisoned() -> SourceError {
    SourceError::Unavailable("activity source lock poisoned".into())
}

impl InMemoryActivitySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_metric(&self, metric: MetricDefinition) -> Result<(), SourceError> {
        let mut guard = self.metrics.write().map_err(|_| poisoned())?;
        guard.insert(metric.id().clone(), metric);
        Ok(())
    }

    pub fn put_record(&self, record: ActivityRecord) -> Result<(), SourceError> {
        let mut guard = self.records.write().map_err(|_| poisoned())?;
        guard.insert(record.id.clone(), record);
        Ok(())
    }

    pub fn remove_record(&self, id: &ActivityRecordId) -> Result<Option<ActivityRecord>, SourceError> {
        let mut guard = self.records.write().map_err(|_| poisoned())?;
        Ok(guard.remove(id))
    }
}

impl ActivityFeed for InMemoryActivitySource {
    fn record(&self, id: &ActivityRecordId) -> Result<Option<ActivityRecord>, SourceError> {
        let guard = self.records.read().map_err(|_| poisoned())?;
        Ok(guard.get(id).cloned())
    }

    fn records_for_assignment(
        &self,
        assignment: &AssignmentId,
    ) -> Result<Vec<ActivityRecord>, SourceError> {
        let guard = self.records.read().map_err(|_| poisoned())?;
        Ok(guard
            .values()
            .filter(|record| &record.assignment_id == assignment)
            .cloned()
            .collect())
    }

    fn assignments(&self) -> Result<Vec<AssignmentId>, SourceError> {
        let guard = self.records.read().map_err(|_| poisoned())?;
        let unique: BTreeSet<AssignmentId> = guard
            .values()
            .map(|record| record.assignment_id.clone())
            .collect();
        Ok(unique.into_iter().collect())
    }
}

impl MetricCatalog for InMemoryActivitySource {
    fn metric(&self, id: &MetricId) -> Result<Option<MetricDefinition>, SourceError> {
        let guard = self.metrics.read().map_err(|_| poisoned())?;
        Ok(guard.get(id).cloned())
    }
}
