use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use serde::Serialize;
use tracing::info;

use super::domain::{EmissionFactor, FactorId, FactorKey};
use super::loader::FactorRecord;
use super::repository::{FactorRepository, FactorStoreError};

/// In-memory factor store keyed on the catalog uniqueness key.
#[derive(Debug, Default)]
pub struct FactorCatalog {
    factors: RwLock<BTreeMap<FactorKey, EmissionFactor>>,
    sequence: AtomicU64,
}

/// Counts reported by an administrative bulk load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
}

impl FactorCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<FactorRecord>) -> Result<Self, FactorStoreError> {
        let catalog = Self::new();
        catalog.upsert_all(records)?;
        Ok(catalog)
    }

    fn next_id(&self) -> FactorId {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        FactorId(format!("ef-{id:06}"))
    }

    /// Create or update factors by uniqueness key. Existing rows keep their id.
    pub fn upsert_all(&self, records: Vec<FactorRecord>) -> Result<LoadSummary, FactorStoreError> {
        let mut guard = self
            .factors
            .write()
            .map_err(|_| FactorStoreError::Unavailable("factor catalog lock poisoned".into()))?;
        let mut summary = LoadSummary::default();

        for record in records {
            let key = record.key();
            match guard.get_mut(&key) {
                Some(existing) => {
                    let updated = record.into_factor(existing.id.clone());
                    if *existing == updated {
                        summary.unchanged += 1;
                    } else {
                        *existing = updated;
                        summary.updated += 1;
                    }
                }
                None => {
                    let factor = record.into_factor(self.next_id());
                    guard.insert(key, factor);
                    summary.created += 1;
                }
            }
        }

        info!(
            created = summary.created,
            updated = summary.updated,
            unchanged = summary.unchanged,
            total = guard.len(),
            "emission factors loaded"
        );
        Ok(summary)
    }

    pub fn len(&self) -> usize {
        self.factors.read().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FactorRepository for FactorCatalog {
    fn candidates(
        &self,
        category: &str,
        sub_category: &str,
    ) -> Result<Vec<EmissionFactor>, FactorStoreError> {
        let guard = self
            .factors
            .read()
            .map_err(|_| FactorStoreError::Unavailable("factor catalog lock poisoned".into()))?;
        Ok(guard
            .values()
            .filter(|factor| {
                factor.category.trim() == category.trim()
                    && factor.sub_category.trim() == sub_category.trim()
            })
            .cloned()
            .collect())
    }

    fn get(&self, id: &FactorId) -> Result<Option<EmissionFactor>, FactorStoreError> {
        let guard = self
            .factors
            .read()
            .map_err(|_| FactorStoreError::Unavailable("factor catalog lock poisoned".into()))?;
        Ok(guard.values().find(|factor| &factor.id == id).cloned())
    }
}
