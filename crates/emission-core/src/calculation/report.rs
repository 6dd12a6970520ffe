use rust_decimal::Decimal;
use serde::Serialize;

use super::domain::CalculatedEmissionValue;
use crate::factors::GhgScope;

/// Total emissions of one GHG scope bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopeTotal {
    pub scope: Option<GhgScope>,
    pub label: &'static str,
    pub records: usize,
    pub emission_value: Decimal,
}

/// Aggregation of stored results for reporting views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmissionSummary {
    pub records: usize,
    pub total_emission_value: Decimal,
    pub by_scope: Vec<ScopeTotal>,
}

impl EmissionSummary {
    pub fn from_results(rows: &[CalculatedEmissionValue]) -> Self {
        let buckets = GhgScope::ordered()
            .into_iter()
            .map(Some)
            .chain(std::iter::once(None));

        let by_scope = buckets
            .map(|scope| {
                let matching = rows.iter().filter(|row| row.scope == scope);
                let (records, emission_value) = matching
                    .fold((0, Decimal::ZERO), |(count, sum), row| {
                        (count + 1, sum + row.emission_value)
                    });
                ScopeTotal {
                    scope,
                    label: scope.map_or("Unscoped", GhgScope::label),
                    records,
                    emission_value,
                }
            })
            .filter(|total| total.records > 0)
            .collect::<Vec<_>>();

        Self {
            records: rows.len(),
            total_emission_value: by_scope.iter().map(|total| total.emission_value).sum(),
            by_scope,
        }
    }
}
