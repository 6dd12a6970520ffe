//! Versioned emission factors: storage, bulk load, and the fallback lookup.

mod catalog;
pub mod domain;
pub mod loader;
pub mod matcher;
pub mod repository;

pub use catalog::{FactorCatalog, LoadSummary};
pub use domain::{
    EmissionFactor, FactorId, FactorKey, GhgScope, InvalidScope, RegionKind, UNIVERSAL_REGION,
};
pub use loader::{parse_factor_csv, read_factor_file, FactorLoadError, FactorRecord};
pub use matcher::{best_match, FactorMatch, FactorQuery, RegionMatch, UnitPolicy};
pub use repository::{FactorLookup, FactorRepository, FactorStoreError};
