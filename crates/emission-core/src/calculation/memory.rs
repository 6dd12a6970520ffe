use std::collections::BTreeMap;
use std::sync::Mutex;

use super::domain::CalculatedEmissionValue;
use super::store::{
    CommitSummary, ResultFilter, ResultStore, ResultStoreError, ScopeChangeSet, UpsertOutcome,
};
use crate::activity::ActivityRecordId;

/// Result table held behind one lock; the record id map enforces one row per source record.
#[derive(Debug, Default)]
pub struct InMemoryResultStore {
    rows: Mutex<BTreeMap<ActivityRecordId, CalculatedEmissionValue>>,
}

fn poisoned() -> ResultStoreError {
    ResultStoreError::Unavailable("result store lock poisoned".into())
}

fn write_row(
    rows: &mut BTreeMap<ActivityRecordId, CalculatedEmissionValue>,
    value: CalculatedEmissionValue,
) -> UpsertOutcome {
    match rows.get_mut(&value.activity_record_id) {
        Some(existing) if *existing == value => UpsertOutcome::Unchanged,
        Some(existing) => {
            *existing = value;
            UpsertOutcome::Updated
        }
        None => {
            rows.insert(value.activity_record_id.clone(), value);
            UpsertOutcome::Created
        }
    }
}

impl InMemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Result<Vec<CalculatedEmissionValue>, ResultStoreError> {
        let guard = self.rows.lock().map_err(|_| poisoned())?;
        Ok(guard.values().cloned().collect())
    }

    pub fn len(&self) -> usize {
        self.rows.lock().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResultStore for InMemoryResultStore {
    fn upsert(&self, value: CalculatedEmissionValue) -> Result<UpsertOutcome, ResultStoreError> {
        let mut guard = self.rows.lock().map_err(|_| poisoned())?;
        Ok(write_row(&mut guard, value))
    }

    fn remove(&self, record_id: &ActivityRecordId) -> Result<bool, ResultStoreError> {
        let mut guard = self.rows.lock().map_err(|_| poisoned())?;
        Ok(guard.remove(record_id).is_some())
    }

    fn fetch(
        &self,
        record_id: &ActivityRecordId,
    ) -> Result<Option<CalculatedEmissionValue>, ResultStoreError> {
        let guard = self.rows.lock().map_err(|_| poisoned())?;
        Ok(guard.get(record_id).cloned())
    }

    fn query(&self, filter: &ResultFilter) -> Result<Vec<CalculatedEmissionValue>, ResultStoreError> {
        let guard = self.rows.lock().map_err(|_| poisoned())?;
        Ok(guard
            .values()
            .filter(|value| filter.matches(value))
            .cloned()
            .collect())
    }

    fn commit(&self, changes: ScopeChangeSet) -> Result<CommitSummary, ResultStoreError> {
        let ScopeChangeSet {
            scope,
            upserts,
            retain,
        } = changes;
        let mut guard = self.rows.lock().map_err(|_| poisoned())?;
        let mut summary = CommitSummary::default();

        for value in upserts {
            match write_row(&mut guard, value) {
                UpsertOutcome::Created => summary.created += 1,
                UpsertOutcome::Updated => summary.updated += 1,
                UpsertOutcome::Unchanged => summary.unchanged += 1,
            }
        }

        let stale: Vec<ActivityRecordId> = guard
            .values()
            .filter(|value| scope.contains(value) && !retain.contains(&value.activity_record_id))
            .map(|value| value.activity_record_id.clone())
            .collect();
        for record_id in &stale {
            guard.remove(record_id);
        }
        summary.removed = stale;

        Ok(summary)
    }
}
