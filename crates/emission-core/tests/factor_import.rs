//! Administrative factor loads: reading a CSV from disk, validating it, and upserting it into a
//! catalog that keeps ids stable across reloads.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use rust_decimal::Decimal;

use emission_core::factors::{
    read_factor_file, FactorCatalog, FactorLoadError, FactorLookup, FactorQuery, LoadSummary,
    UnitPolicy,
};

const HEADER: &str =
    "name,category,sub_category,activity_unit,value,factor_unit,year,region,scope,source,source_url";

fn write_fixture(name: &str, rows: &[&str]) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "emission-core-{}-{name}.csv",
        std::process::id()
    ));
    let mut body = String::from(HEADER);
    for row in rows {
        body.push('\n');
        body.push_str(row);
    }
    body.push('\n');
    fs::write(&path, body).expect("fixture written");
    path
}

fn electricity_query() -> FactorQuery {
    FactorQuery {
        category: "electricity".to_string(),
        sub_category: "hk_clp".to_string(),
        activity_unit: "kWh".to_string(),
        region: "HK".to_string(),
        year: 2025,
        scope: None,
        unit_policy: UnitPolicy::ExactOnly,
    }
}

#[test]
fn reload_updates_values_and_keeps_ids() {
    let first = write_fixture(
        "initial",
        &[
            "CLP grid,electricity,hk_clp,kWh,0.3900,kgCO2e/kWh,2025,HK,2,CLP,",
            "HEC grid,electricity,hk_hec,kWh,0.7100,kgCO2e/kWh,2025,HK,2,HEC,",
        ],
    );
    let catalog = Arc::new(FactorCatalog::new());
    let summary = catalog
        .upsert_all(read_factor_file(&first).expect("initial file parses"))
        .expect("catalog writable");
    assert_eq!(
        summary,
        LoadSummary {
            created: 2,
            updated: 0,
            unchanged: 0
        }
    );

    let lookup = FactorLookup::new(catalog.clone());
    let before = lookup
        .find(&electricity_query())
        .expect("readable")
        .expect("factor found");

    let revised = write_fixture(
        "revised",
        &[
            "CLP grid,electricity,hk_clp,kWh,0.3800,kgCO2e/kWh,2025,HK,2,CLP,",
            "HEC grid,electricity,hk_hec,kWh,0.7100,kgCO2e/kWh,2025,HK,2,HEC,",
            "CLP grid 2026,electricity,hk_clp,kWh,0.3700,kgCO2e/kWh,2026,HK,2,CLP,",
        ],
    );
    let summary = catalog
        .upsert_all(read_factor_file(&revised).expect("revised file parses"))
        .expect("catalog writable");
    assert_eq!(
        summary,
        LoadSummary {
            created: 1,
            updated: 1,
            unchanged: 1
        }
    );
    assert_eq!(catalog.len(), 3);

    let after = lookup
        .find(&electricity_query())
        .expect("readable")
        .expect("factor found");
    assert_eq!(after.factor.id, before.factor.id);
    assert_eq!(after.factor.value, Decimal::new(38, 2));

    let _ = fs::remove_file(first);
    let _ = fs::remove_file(revised);
}

#[test]
fn invalid_year_is_reported_with_its_line() {
    let path = write_fixture(
        "bad-year",
        &[
            "CLP grid,electricity,hk_clp,kWh,0.39,kgCO2e/kWh,2025,HK,2,CLP,",
            "Ancient,electricity,hk_clp,kWh,0.39,kgCO2e/kWh,1850,HK,2,CLP,",
        ],
    );

    match read_factor_file(&path) {
        Err(FactorLoadError::InvalidRow { line, reason }) => {
            assert_eq!(line, 3);
            assert!(reason.contains("1850"), "{reason}");
        }
        other => panic!("expected invalid row, got {other:?}"),
    }
    let _ = fs::remove_file(path);
}

#[test]
fn missing_file_surfaces_io_error() {
    let path = std::env::temp_dir().join("emission-core-does-not-exist.csv");
    assert!(matches!(
        read_factor_file(path),
        Err(FactorLoadError::Io(_))
    ));
}
