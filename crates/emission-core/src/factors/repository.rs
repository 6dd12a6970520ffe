use std::sync::Arc;

use tracing::{debug, warn};

use super::domain::{EmissionFactor, FactorId};
use super::matcher::{best_match, FactorMatch, FactorQuery};

/// Read access to reference factors so lookups can run against any backing store.
pub trait FactorRepository: Send + Sync {
    /// Every factor sharing the category and sub-category, across years, units and regions.
    fn candidates(
        &self,
        category: &str,
        sub_category: &str,
    ) -> Result<Vec<EmissionFactor>, FactorStoreError>;

    fn get(&self, id: &FactorId) -> Result<Option<EmissionFactor>, FactorStoreError>;
}

/// Error enumeration for factor store failures.
#[derive(Debug, thiserror::Error)]
pub enum FactorStoreError {
    #[error("factor store unavailable: {0}")]
    Unavailable(String),
}

/// Runs the fallback search against a repository.
pub struct FactorLookup<F> {
    repository: Arc<F>,
}

impl<F> Clone for FactorLookup<F> {
    fn clone(&self) -> Self {
        Self {
            repository: self.repository.clone(),
        }
    }
}

impl<F> FactorLookup<F>
where
    F: FactorRepository,
{
    pub fn new(repository: Arc<F>) -> Self {
        Self { repository }
    }

    pub fn find(&self, query: &FactorQuery) -> Result<Option<FactorMatch>, FactorStoreError> {
        let candidates = self
            .repository
            .candidates(&query.category, &query.sub_category)?;
        let found = best_match(&candidates, query);

        match &found {
            Some(matched) if matched.unit_relaxed => warn!(
                category = %query.category,
                sub_category = %query.sub_category,
                requested_unit = %query.activity_unit,
                factor_unit = %matched.factor.activity_unit,
                factor_id = %matched.factor.id,
                "factor matched only after relaxing the activity unit"
            ),
            Some(matched) => debug!(
                factor_id = %matched.factor.id,
                region_match = ?matched.region_match,
                matched_year = matched.matched_year,
                requested_year = query.year,
                "factor matched"
            ),
            None => debug!(
                category = %query.category,
                sub_category = %query.sub_category,
                unit = %query.activity_unit,
                region = %query.region,
                year = query.year,
                "no factor matched"
            ),
        }

        Ok(found)
    }
}
