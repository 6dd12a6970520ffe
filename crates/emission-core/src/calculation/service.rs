use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{error, info, warn};

use super::domain::{BatchSummary, CalculatedEmissionValue, CalculationScope, RecordReport};
use super::engine::{CalculationEngine, EngineOptions};
use super::reconcile::{self, Reconciler};
use super::report::EmissionSummary;
use super::store::{retry_on_conflict, ResultFilter, ResultStore, ResultStoreError};
use crate::activity::{ActivityFeed, ActivityRecordId, AssignmentId, MetricCatalog, SourceError};
use crate::factors::{FactorMatch, FactorQuery, FactorRepository, FactorStoreError};

/// Service composing the engine, the result store, and the reconciler behind the
/// three calculation triggers.
pub struct EmissionCalculationService<A, F, S> {
    engine: CalculationEngine<A, F>,
    store: Arc<S>,
    reconciler: Reconciler<S>,
}

impl<A, F, S> EmissionCalculationService<A, F, S>
where
    A: ActivityFeed + MetricCatalog + 'static,
    F: FactorRepository + 'static,
    S: ResultStore + 'static,
{
    pub fn new(sources: Arc<A>, factors: Arc<F>, store: Arc<S>, options: EngineOptions) -> Self {
        Self {
            engine: CalculationEngine::new(sources, factors, options),
            reconciler: Reconciler::new(store.clone()),
            store,
        }
    }

    pub fn engine(&self) -> &CalculationEngine<A, F> {
        &self.engine
    }

    /// Recalculate one record and persist or clear its result.
    pub fn calculate_for_record(
        &self,
        record_id: &ActivityRecordId,
    ) -> Result<RecordReport, CalculationError> {
        let Some(record) = self.engine.sources().record(record_id)? else {
            if retry_on_conflict(|| self.store.remove(record_id))? {
                info!(%record_id, "removed result of deleted activity record");
            }
            return Err(CalculationError::RecordNotFound(record_id.clone()));
        };

        let outcome = self.engine.evaluate(&record)?;
        let removed_stale = match outcome.calculated() {
            Some(value) => {
                let written = retry_on_conflict(|| self.store.upsert(value.clone()))?;
                info!(%record_id, ?written, "emission result stored");
                false
            }
            None => retry_on_conflict(|| self.store.remove(record_id))?,
        };

        Ok(RecordReport {
            record_id: record_id.clone(),
            outcome,
            removed_stale,
        })
    }

    /// Recalculate every record of an assignment and reconcile that assignment's results.
    pub fn calculate_for_assignment(
        &self,
        assignment: &AssignmentId,
    ) -> Result<BatchSummary, CalculationError> {
        let (summary, _) = self
            .sweep_assignment(assignment)
            .map_err(|err| err.aborted(BatchSummary::default()))?;

        info!(
            %assignment,
            processed = summary.processed,
            calculated = summary.calculated,
            skipped_no_factor = summary.skipped_no_factor,
            skipped_ineligible = summary.skipped_ineligible,
            failed = summary.failed,
            removed = summary.removed,
            "assignment calculation finished"
        );
        Ok(summary)
    }

    /// Recalculate every assignment, then drop results no longer backed by any record.
    ///
    /// Each assignment commits on its own; a storage outage stops the sweep but leaves the
    /// assignments already committed in place.
    pub fn recalculate_all(&self) -> Result<BatchSummary, CalculationError> {
        let assignments = self
            .engine
            .sources()
            .assignments()
            .map_err(|err| CalculationError::from(err).aborted(BatchSummary::default()))?;

        let mut total = BatchSummary::default();
        let mut retained = BTreeSet::new();
        for assignment in &assignments {
            match self.sweep_assignment(assignment) {
                Ok((summary, kept)) => {
                    total.merge(summary);
                    retained.extend(kept);
                }
                Err(err) => {
                    error!(%assignment, error = %err, "global recalculation aborted");
                    return Err(err.aborted(total));
                }
            }
        }

        let prune = reconcile::prune_plan(CalculationScope::All, retained);
        match self.reconciler.apply(prune) {
            Ok(commit) => total.removed += commit.removed.len(),
            Err(err) => return Err(CalculationError::from(err).aborted(total)),
        }

        info!(
            assignments = assignments.len(),
            processed = total.processed,
            calculated = total.calculated,
            skipped_no_factor = total.skipped_no_factor,
            skipped_ineligible = total.skipped_ineligible,
            failed = total.failed,
            removed = total.removed,
            "global recalculation finished"
        );
        Ok(total)
    }

    pub fn results(
        &self,
        filter: &ResultFilter,
    ) -> Result<Vec<CalculatedEmissionValue>, CalculationError> {
        Ok(self.store.query(filter)?)
    }

    pub fn summary(&self, filter: &ResultFilter) -> Result<EmissionSummary, CalculationError> {
        let rows = self.store.query(filter)?;
        Ok(EmissionSummary::from_results(&rows))
    }

    pub fn lookup_factor(&self, query: &FactorQuery) -> Result<Option<FactorMatch>, CalculationError> {
        Ok(self.engine.lookup().find(query)?)
    }

    /// Evaluate and commit one assignment. Returns the scope's counts and the record ids whose
    /// rows remain after the commit.
    fn sweep_assignment(
        &self,
        assignment: &AssignmentId,
    ) -> Result<(BatchSummary, BTreeSet<ActivityRecordId>), CalculationError> {
        let records = self.engine.sources().records_for_assignment(assignment)?;
        let mut summary = BatchSummary::default();
        let mut outcomes = Vec::with_capacity(records.len());

        for record in &records {
            let outcome = self.engine.evaluate(record)?;
            summary.tally(&record.id, &outcome);
            outcomes.push(outcome);
        }

        let changes = reconcile::plan(CalculationScope::Assignment(assignment.clone()), &outcomes);
        let retained = changes.retain.clone();

        match self.reconciler.apply(changes) {
            Ok(commit) => {
                summary.removed += commit.removed.len();
                Ok((summary, retained))
            }
            Err(ResultStoreError::Conflict(record_id)) => {
                warn!(%assignment, %record_id, "assignment commit conflicted twice; previous results kept");
                summary.mark_conflicted(&retained, "result write conflicted twice; previous results kept");
                let untouched = self
                    .store
                    .query(&ResultFilter::for_assignment(assignment.clone()))?
                    .into_iter()
                    .map(|value| value.activity_record_id)
                    .collect();
                Ok((summary, untouched))
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Error raised by the calculation service.
#[derive(Debug, thiserror::Error)]
pub enum CalculationError {
    #[error("activity record {0} not found")]
    RecordNotFound(ActivityRecordId),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Factors(#[from] FactorStoreError),
    #[error(transparent)]
    Results(#[from] ResultStoreError),
    #[error("batch aborted after {} processed records: {source}", .partial.processed)]
    Aborted {
        partial: BatchSummary,
        source: Box<CalculationError>,
    },
}

impl CalculationError {
    fn aborted(self, partial: BatchSummary) -> Self {
        Self::Aborted {
            partial,
            source: Box::new(self),
        }
    }

    /// Innermost error, looking through batch aborts.
    pub fn root(&self) -> &CalculationError {
        match self {
            Self::Aborted { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self.root(), Self::Results(ResultStoreError::Conflict(_)))
    }
}
