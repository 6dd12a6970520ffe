//! Keeps the result table consistent with the records a sweep just evaluated.
//!
//! The expected rows are computed first and handed to the store together with the set of
//! records that stay; the store writes and prunes in a single commit so a reader never sees a
//! scope with rows removed but replacements not yet written.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::info;

use super::domain::{CalculationScope, RecordOutcome};
use super::store::{retry_on_conflict, CommitSummary, ResultStore, ResultStoreError, ScopeChangeSet};
use crate::activity::ActivityRecordId;

/// Build the change set for `scope` from every outcome evaluated in it.
pub fn plan<'a>(
    scope: CalculationScope,
    outcomes: impl IntoIterator<Item = &'a RecordOutcome>,
) -> ScopeChangeSet {
    let upserts: Vec<_> = outcomes
        .into_iter()
        .filter_map(RecordOutcome::calculated)
        .cloned()
        .collect();
    let retain = upserts
        .iter()
        .map(|value| value.activity_record_id.clone())
        .collect();

    ScopeChangeSet {
        scope,
        upserts,
        retain,
    }
}

/// Change set that only prunes: every row in `scope` not listed in `retain` goes.
pub fn prune_plan(scope: CalculationScope, retain: BTreeSet<ActivityRecordId>) -> ScopeChangeSet {
    ScopeChangeSet {
        scope,
        upserts: Vec::new(),
        retain,
    }
}

pub struct Reconciler<S> {
    store: Arc<S>,
}

impl<S> Reconciler<S>
where
    S: ResultStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn apply(&self, changes: ScopeChangeSet) -> Result<CommitSummary, ResultStoreError> {
        let scope = changes.scope.clone();
        let summary = retry_on_conflict(|| self.store.commit(changes.clone()))?;

        info!(
            ?scope,
            created = summary.created,
            updated = summary.updated,
            unchanged = summary.unchanged,
            removed = summary.removed.len(),
            "scope reconciled"
        );
        Ok(summary)
    }
}
