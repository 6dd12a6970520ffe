use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::activity::{ActivityRecordId, AssignmentId, LayerId};
use crate::factors::{FactorId, FactorQuery, GhgScope, RegionMatch};

/// Derived emission for one activity record, with the trail back to its inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculatedEmissionValue {
    pub activity_record_id: ActivityRecordId,
    pub emission_factor_id: FactorId,
    pub emission_value: Decimal,
    pub converted_amount: Decimal,
    pub factor_unit: String,
    pub assignment_id: AssignmentId,
    pub layer_id: LayerId,
    pub reporting_period: NaiveDate,
    pub scope: Option<GhgScope>,
    pub region_match: RegionMatch,
    pub factor_year: i32,
    pub unit_relaxed: bool,
}

/// Portion of the result table a sweep is responsible for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum CalculationScope {
    Assignment(AssignmentId),
    All,
}

impl CalculationScope {
    pub fn contains(&self, value: &CalculatedEmissionValue) -> bool {
        match self {
            Self::Assignment(assignment) => &value.assignment_id == assignment,
            Self::All => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IneligibleReason {
    MetricNotFound,
    MissingEmissionCategory,
    MissingActivityUnit,
    MissingValue,
}

/// Per-record state, recomputed on every sweep and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecordOutcome {
    NotEligible {
        reason: IneligibleReason,
    },
    NoFactorFound {
        query: FactorQuery,
    },
    ConversionFailed {
        from_unit: String,
        to_unit: String,
        message: String,
    },
    /// Converted amount times factor value does not fit a decimal.
    ValueOverflow {
        factor_id: FactorId,
        message: String,
    },
    Calculated {
        value: CalculatedEmissionValue,
    },
}

impl RecordOutcome {
    pub fn calculated(&self) -> Option<&CalculatedEmissionValue> {
        match self {
            Self::Calculated { value } => Some(value),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::NotEligible { .. } => "not_eligible",
            Self::NoFactorFound { .. } => "no_factor_found",
            Self::ConversionFailed { .. } => "conversion_failed",
            Self::ValueOverflow { .. } => "value_overflow",
            Self::Calculated { .. } => "calculated",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    NoFactorFound,
    UnitConversionUnsupported,
    ValueOverflow,
    PersistenceConflict,
}

/// Record-level problem reported alongside batch counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordIssue {
    pub record_id: ActivityRecordId,
    pub kind: IssueKind,
    pub detail: String,
}

/// Aggregate counts returned by the batch triggers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub processed: usize,
    pub calculated: usize,
    pub skipped_no_factor: usize,
    pub skipped_ineligible: usize,
    pub failed: usize,
    pub removed: usize,
    pub issues: Vec<RecordIssue>,
}

impl BatchSummary {
    pub fn tally(&mut self, record_id: &ActivityRecordId, outcome: &RecordOutcome) {
        self.processed += 1;
        match outcome {
            RecordOutcome::Calculated { .. } => self.calculated += 1,
            RecordOutcome::NotEligible { .. } => self.skipped_ineligible += 1,
            RecordOutcome::NoFactorFound { query } => {
                self.skipped_no_factor += 1;
                self.issues.push(RecordIssue {
                    record_id: record_id.clone(),
                    kind: IssueKind::NoFactorFound,
                    detail: format!(
                        "no factor for {}/{} in {} ({}, {})",
                        query.category,
                        query.sub_category,
                        query.activity_unit,
                        query.region,
                        query.year
                    ),
                });
            }
            RecordOutcome::ConversionFailed { message, .. } => {
                self.failed += 1;
                self.issues.push(RecordIssue {
                    record_id: record_id.clone(),
                    kind: IssueKind::UnitConversionUnsupported,
                    detail: message.clone(),
                });
            }
            RecordOutcome::ValueOverflow { message, .. } => {
                self.failed += 1;
                self.issues.push(RecordIssue {
                    record_id: record_id.clone(),
                    kind: IssueKind::ValueOverflow,
                    detail: message.clone(),
                });
            }
        }
    }

    /// Reclassify every calculated record of a scope whose commit lost a write race.
    pub fn mark_conflicted<'a>(
        &mut self,
        record_ids: impl IntoIterator<Item = &'a ActivityRecordId>,
        detail: &str,
    ) {
        for record_id in record_ids {
            self.calculated = self.calculated.saturating_sub(1);
            self.failed += 1;
            self.issues.push(RecordIssue {
                record_id: record_id.clone(),
                kind: IssueKind::PersistenceConflict,
                detail: detail.to_string(),
            });
        }
    }

    pub fn merge(&mut self, other: BatchSummary) {
        self.processed += other.processed;
        self.calculated += other.calculated;
        self.skipped_no_factor += other.skipped_no_factor;
        self.skipped_ineligible += other.skipped_ineligible;
        self.failed += other.failed;
        self.removed += other.removed;
        self.issues.extend(other.issues);
    }
}

/// Result of a single-record trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordReport {
    pub record_id: ActivityRecordId,
    pub outcome: RecordOutcome,
    pub removed_stale: bool,
}
