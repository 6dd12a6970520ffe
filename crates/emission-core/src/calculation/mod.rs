//! Emission calculation: per-record evaluation, persistence of derived values, and the
//! reconciliation that keeps stored results in step with their activity records.

pub mod domain;
pub mod engine;
mod memory;
pub mod reconcile;
pub mod report;
pub mod router;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use domain::{
    BatchSummary, CalculatedEmissionValue, CalculationScope, IneligibleReason, IssueKind,
    RecordIssue, RecordOutcome, RecordReport,
};
pub use engine::{CalculationEngine, EngineOptions};
pub use memory::InMemoryResultStore;
pub use reconcile::Reconciler;
pub use report::{EmissionSummary, ScopeTotal};
pub use router::calculation_router;
pub use service::{CalculationError, EmissionCalculationService};
pub use store::{
    CommitSummary, ResultFilter, ResultStore, ResultStoreError, ScopeChangeSet, UpsertOutcome,
};
