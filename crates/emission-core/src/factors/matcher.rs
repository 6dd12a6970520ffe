//! Fallback-aware selection of the single best factor for a query.
//!
//! At each year (requested year first, then older years that have data) the search tries an
//! exact region, then a combined-region group containing the region, then the universal
//! `ALL` region. Only when no year yields a hit for the exact activity unit, and the query
//! opts in, is the whole search repeated without the unit constraint.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::domain::{EmissionFactor, GhgScope, RegionKind};

/// Whether a lookup may drop the activity-unit constraint as a last resort.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitPolicy {
    #[default]
    ExactOnly,
    AllowRelaxation,
}

/// Lookup request. Every input the search depends on is carried here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorQuery {
    pub category: String,
    pub sub_category: String,
    pub activity_unit: String,
    pub region: String,
    pub year: i32,
    #[serde(default)]
    pub scope: Option<GhgScope>,
    #[serde(default)]
    pub unit_policy: UnitPolicy,
}

/// How the region of the chosen factor relates to the query region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionMatch {
    Exact,
    CombinedRegion,
    Universal,
}

impl RegionMatch {
    pub const fn ordered() -> [Self; 3] {
        [Self::Exact, Self::CombinedRegion, Self::Universal]
    }

    fn accepts(self, factor: &EmissionFactor, region: &str) -> bool {
        let kind = factor.region_kind();
        match self {
            Self::Exact => kind.is_exactly(&factor.region, region),
            Self::CombinedRegion => kind.group_contains(region),
            Self::Universal => kind == RegionKind::Universal,
        }
    }
}

/// Selected factor plus the trail of how it was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorMatch {
    pub factor: EmissionFactor,
    pub region_match: RegionMatch,
    pub requested_year: i32,
    pub matched_year: i32,
    pub unit_relaxed: bool,
}

impl FactorMatch {
    pub fn is_year_fallback(&self) -> bool {
        self.matched_year != self.requested_year
    }
}

/// Choose the best factor among `candidates` for `query`, or `None`.
pub fn best_match(candidates: &[EmissionFactor], query: &FactorQuery) -> Option<FactorMatch> {
    let same_item: Vec<&EmissionFactor> = candidates
        .iter()
        .filter(|factor| {
            factor.category.trim() == query.category.trim()
                && factor.sub_category.trim() == query.sub_category.trim()
        })
        .collect();

    if let Some(found) = search(&same_item, query, true) {
        return Some(found);
    }

    match query.unit_policy {
        UnitPolicy::ExactOnly => None,
        UnitPolicy::AllowRelaxation => search(&same_item, query, false).map(|found| FactorMatch {
            unit_relaxed: true,
            ..found
        }),
    }
}

fn search(pool: &[&EmissionFactor], query: &FactorQuery, match_unit: bool) -> Option<FactorMatch> {
    let unit = query.activity_unit.trim();
    let pool: Vec<&EmissionFactor> = pool
        .iter()
        .copied()
        .filter(|factor| !match_unit || factor.activity_unit.trim() == unit)
        .collect();

    let mut years: Vec<i32> = pool
        .iter()
        .map(|factor| factor.year)
        .filter(|year| *year <= query.year)
        .collect();
    years.sort_unstable_by(|a, b| b.cmp(a));
    years.dedup();

    for year in years {
        for region_match in RegionMatch::ordered() {
            let hits = pool.iter().copied().filter(|factor| {
                factor.year == year && region_match.accepts(factor, &query.region)
            });

            if let Some(factor) = tie_break(hits, query.scope) {
                return Some(FactorMatch {
                    factor: factor.clone(),
                    region_match,
                    requested_year: query.year,
                    matched_year: year,
                    unit_relaxed: false,
                });
            }
        }
    }

    None
}

fn tie_break<'a>(
    hits: impl Iterator<Item = &'a EmissionFactor>,
    scope: Option<GhgScope>,
) -> Option<&'a EmissionFactor> {
    hits.min_by(|a, b| {
        scope_rank(a, scope)
            .cmp(&scope_rank(b, scope))
            .then_with(|| stable_order(a, b))
    })
}

fn scope_rank(factor: &EmissionFactor, scope: Option<GhgScope>) -> u8 {
    match scope {
        Some(wanted) if factor.scope == Some(wanted) => 0,
        _ => 1,
    }
}

fn stable_order(a: &EmissionFactor, b: &EmissionFactor) -> Ordering {
    (
        &a.sub_category,
        &a.activity_unit,
        &a.factor_unit,
        &a.region,
        a.scope,
        &a.id,
    )
        .cmp(&(
            &b.sub_category,
            &b.activity_unit,
            &b.factor_unit,
            &b.region,
            b.scope,
            &b.id,
        ))
}
