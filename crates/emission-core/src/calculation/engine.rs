use std::sync::Arc;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::domain::{CalculatedEmissionValue, IneligibleReason, RecordOutcome};
use super::service::CalculationError;
use crate::activity::{ActivityFeed, ActivityRecord, MetricCatalog};
use crate::factors::{FactorLookup, FactorMatch, FactorQuery, FactorRepository, UnitPolicy};
use crate::units;

/// Knobs applied to every query the engine builds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Region used when a metric has no location configured.
    pub default_region: String,
    pub unit_policy: UnitPolicy,
    /// Decimal places kept on stored emission values.
    pub result_precision: u32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            default_region: crate::factors::UNIVERSAL_REGION.to_string(),
            unit_policy: UnitPolicy::ExactOnly,
            result_precision: 7,
        }
    }
}

/// Evaluates single activity records. Never writes; the caller persists outcomes.
pub struct CalculationEngine<A, F> {
    sources: Arc<A>,
    lookup: FactorLookup<F>,
    options: EngineOptions,
}

impl<A, F> CalculationEngine<A, F>
where
    A: ActivityFeed + MetricCatalog,
    F: FactorRepository,
{
    pub fn new(sources: Arc<A>, factors: Arc<F>, options: EngineOptions) -> Self {
        Self {
            sources,
            lookup: FactorLookup::new(factors),
            options,
        }
    }

    pub fn lookup(&self) -> &FactorLookup<F> {
        &self.lookup
    }

    pub fn sources(&self) -> &Arc<A> {
        &self.sources
    }

    pub fn evaluate(&self, record: &ActivityRecord) -> Result<RecordOutcome, CalculationError> {
        let Some(metric) = self.sources.metric(&record.metric_id)? else {
            return Ok(not_eligible(IneligibleReason::MetricNotFound));
        };

        let linkage = metric.linkage();
        let (Some(category), Some(sub_category)) =
            (linkage.emission_category, linkage.emission_sub_category)
        else {
            return Ok(not_eligible(IneligibleReason::MissingEmissionCategory));
        };
        let Some(metric_unit) = linkage.resolved_unit else {
            return Ok(not_eligible(IneligibleReason::MissingActivityUnit));
        };
        let Some(amount) = record.aggregated_numeric_value else {
            return Ok(not_eligible(IneligibleReason::MissingValue));
        };

        let query = FactorQuery {
            category: category.to_string(),
            sub_category: sub_category.to_string(),
            activity_unit: metric_unit.to_string(),
            region: linkage
                .location
                .unwrap_or(self.options.default_region.as_str())
                .to_string(),
            year: record.reporting_year(),
            scope: None,
            unit_policy: self.options.unit_policy,
        };

        let Some(matched) = self.lookup.find(&query)? else {
            return Ok(RecordOutcome::NoFactorFound { query });
        };

        let record_unit = match record.activity_unit.trim() {
            "" => metric_unit,
            unit => unit,
        };

        let factor = &matched.factor;
        let converted = match units::convert(amount, record_unit, &factor.activity_unit) {
            Ok(converted) => converted,
            Err(err) => {
                let (from_unit, to_unit) = err.units();
                warn!(
                    record_id = %record.id,
                    from_unit,
                    to_unit,
                    "activity amount could not be converted"
                );
                return Ok(RecordOutcome::ConversionFailed {
                    from_unit: from_unit.to_string(),
                    to_unit: to_unit.to_string(),
                    message: err.to_string(),
                });
            }
        };

        let Some(value) = self.compute(record, converted, &matched) else {
            warn!(
                record_id = %record.id,
                factor_id = %factor.id,
                converted_amount = %converted,
                "emission value exceeds the decimal range"
            );
            return Ok(RecordOutcome::ValueOverflow {
                factor_id: factor.id.clone(),
                message: format!(
                    "{converted} {} x {} {} exceeds the decimal range",
                    factor.activity_unit, factor.value, factor.factor_unit
                ),
            });
        };

        debug!(
            record_id = %record.id,
            factor_id = %value.emission_factor_id,
            emission_value = %value.emission_value,
            "activity record calculated"
        );
        Ok(RecordOutcome::Calculated { value })
    }

    /// `None` when the product does not fit a decimal.
    fn compute(
        &self,
        record: &ActivityRecord,
        converted: Decimal,
        matched: &FactorMatch,
    ) -> Option<CalculatedEmissionValue> {
        let factor = &matched.factor;
        let emission_value = converted.checked_mul(factor.value)?.round_dp_with_strategy(
            self.options.result_precision,
            RoundingStrategy::MidpointAwayFromZero,
        );

        Some(CalculatedEmissionValue {
            activity_record_id: record.id.clone(),
            emission_factor_id: factor.id.clone(),
            emission_value,
            converted_amount: converted,
            factor_unit: factor.factor_unit.clone(),
            assignment_id: record.assignment_id.clone(),
            layer_id: record.layer_id.clone(),
            reporting_period: record.reporting_period,
            scope: factor.scope,
            region_match: matched.region_match,
            factor_year: matched.matched_year,
            unit_relaxed: matched.unit_relaxed,
        })
    }
}

fn not_eligible(reason: IneligibleReason) -> RecordOutcome {
    RecordOutcome::NotEligible { reason }
}
