use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use tracing::warn;

use emission_core::activity::{ActivityRecordId, AssignmentId, InMemoryActivitySource};
use emission_core::calculation::{
    BatchSummary, CalculationError, EmissionCalculationService, EngineOptions,
    InMemoryResultStore, ResultFilter,
};
use emission_core::error::AppError;
use emission_core::factors::{
    read_factor_file, FactorCatalog, FactorLookup, FactorQuery, GhgScope, UnitPolicy,
    UNIVERSAL_REGION,
};

use crate::infra::{activity_record, demo_metrics, load_catalog, parse_scope};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Factor CSV to use instead of the built-in reference factors.
    #[arg(long)]
    pub(crate) factors_csv: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct LookupArgs {
    /// Factor CSV to search. Defaults to the built-in reference factors.
    #[arg(long)]
    pub(crate) csv: Option<PathBuf>,
    #[arg(long)]
    pub(crate) category: String,
    #[arg(long)]
    pub(crate) sub_category: String,
    /// Activity unit the factor must be expressed per
    #[arg(long)]
    pub(crate) unit: String,
    #[arg(long, default_value = UNIVERSAL_REGION)]
    pub(crate) region: String,
    #[arg(long)]
    pub(crate) year: i32,
    /// Preferred GHG scope (1-3) when several factors tie
    #[arg(long, value_parser = parse_scope)]
    pub(crate) scope: Option<GhgScope>,
    /// Retry without the activity-unit constraint when nothing matches
    #[arg(long)]
    pub(crate) allow_unit_relaxation: bool,
}

pub(crate) fn run_factor_import(csv: PathBuf) -> Result<(), AppError> {
    let records = read_factor_file(&csv)?;
    let mut by_year_scope: BTreeMap<(i32, Option<GhgScope>), usize> = BTreeMap::new();
    for record in &records {
        *by_year_scope.entry((record.year, record.scope)).or_default() += 1;
    }

    let catalog = FactorCatalog::new();
    let summary = catalog.upsert_all(records)?;

    println!("Factor file {} is valid", csv.display());
    println!(
        "- {} created | {} updated | {} unchanged",
        summary.created, summary.updated, summary.unchanged
    );
    for ((year, scope), count) in by_year_scope {
        let label = scope.map_or("Unscoped", GhgScope::label);
        println!("  - {year} {label}: {count} factors");
    }
    Ok(())
}

pub(crate) fn run_factor_lookup(args: LookupArgs) -> Result<(), AppError> {
    let LookupArgs {
        csv,
        category,
        sub_category,
        unit,
        region,
        year,
        scope,
        allow_unit_relaxation,
    } = args;

    let lookup = FactorLookup::new(Arc::new(load_catalog(csv.as_deref())?));
    let query = FactorQuery {
        category,
        sub_category,
        activity_unit: unit,
        region,
        year,
        scope,
        unit_policy: if allow_unit_relaxation {
            UnitPolicy::AllowRelaxation
        } else {
            UnitPolicy::ExactOnly
        },
    };

    match lookup.find(&query)? {
        Some(found) => {
            let factor = &found.factor;
            println!(
                "{} {} = {} {} ({} {}, region {})",
                factor.id,
                factor.name,
                factor.value,
                factor.factor_unit,
                factor.year,
                factor.scope.map_or("Unscoped", GhgScope::label),
                factor.region
            );
            println!(
                "  matched via {:?} region{}{}",
                found.region_match,
                if found.is_year_fallback() {
                    format!(", fell back from {}", found.requested_year)
                } else {
                    String::new()
                },
                if found.unit_relaxed {
                    ", activity unit relaxed"
                } else {
                    ""
                }
            );
        }
        None => println!(
            "No factor for {}/{} per {} in {} up to {}",
            query.category, query.sub_category, query.activity_unit, query.region, query.year
        ),
    }
    Ok(())
}

type DemoService =
    EmissionCalculationService<InMemoryActivitySource, FactorCatalog, InMemoryResultStore>;

fn seed_demo_activity(sources: &InMemoryActivitySource) -> Result<(), AppError> {
    for metric in demo_metrics() {
        sources.put_metric(metric).map_err(CalculationError::from)?;
    }

    let records = [
        ("elec-2025-q1", "electricity", "fy2025", Decimal::new(100, 0), "kWh", (2025, 3, 31)),
        ("elec-2025-q2", "electricity", "fy2025", Decimal::new(5, 1), "MWh", (2025, 6, 30)),
        ("diesel-2025-q1", "fleet_diesel", "fy2025", Decimal::new(50, 0), "liters", (2025, 3, 31)),
        ("gas-2025-03", "towngas", "fy2025", Decimal::new(120, 0), "Unit", (2025, 3, 31)),
        ("heads-2025", "headcount", "fy2025", Decimal::new(42, 0), "persons", (2025, 3, 31)),
        ("gas-2023-12", "towngas", "fy2023", Decimal::new(80, 0), "Unit", (2023, 12, 31)),
    ];
    for (id, metric, assignment, value, unit, (year, month, day)) in records {
        let Some(period) = NaiveDate::from_ymd_opt(year, month, day) else {
            warn!(record_id = id, year, month, day, "skipping demo record with an invalid period");
            continue;
        };
        sources
            .put_record(activity_record(id, metric, assignment, value, unit, period))
            .map_err(CalculationError::from)?;
    }
    Ok(())
}

fn print_counts(title: &str, summary: &BatchSummary) {
    println!(
        "{title}: {} processed | {} calculated | {} no factor | {} ineligible | {} failed | {} removed",
        summary.processed,
        summary.calculated,
        summary.skipped_no_factor,
        summary.skipped_ineligible,
        summary.failed,
        summary.removed
    );
    for issue in &summary.issues {
        println!("  - {} {:?}: {}", issue.record_id, issue.kind, issue.detail);
    }
}

fn print_results(service: &DemoService) -> Result<(), AppError> {
    let rows = service.results(&ResultFilter::default())?;
    println!("Stored results ({}):", rows.len());
    for row in &rows {
        println!(
            "  - {} -> {} kgCO2e via {} ({}, factor year {}, {:?} region)",
            row.activity_record_id,
            row.emission_value.normalize(),
            row.emission_factor_id,
            row.scope.map_or("Unscoped", GhgScope::label),
            row.factor_year,
            row.region_match
        );
    }
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let catalog = Arc::new(load_catalog(args.factors_csv.as_deref())?);
    let sources = Arc::new(InMemoryActivitySource::new());
    let store = Arc::new(InMemoryResultStore::new());
    seed_demo_activity(&sources)?;

    let service = EmissionCalculationService::new(
        sources.clone(),
        catalog.clone(),
        store,
        EngineOptions::default(),
    );

    println!("Emission calculation demo ({} factors loaded)", catalog.len());
    let first = service.recalculate_all()?;
    print_counts("\nGlobal recalculation", &first);
    print_results(&service)?;

    let again = service.recalculate_all()?;
    println!(
        "\nRe-run produced identical counts: {}",
        if again == first { "yes" } else { "no" }
    );

    sources
        .remove_record(&ActivityRecordId::from("diesel-2025-q1"))
        .map_err(CalculationError::from)?;
    let cleanup = service.calculate_for_assignment(&AssignmentId::from("fy2025"))?;
    print_counts("\nAfter deleting diesel-2025-q1, fy2025 sweep", &cleanup);

    let summary = service.summary(&ResultFilter::default())?;
    println!(
        "\nEmissions by scope ({} records, {} kgCO2e total):",
        summary.records,
        summary.total_emission_value.normalize()
    );
    for total in &summary.by_scope {
        println!(
            "  - {}: {} kgCO2e across {} records",
            total.label,
            total.emission_value.normalize(),
            total.records
        );
    }
    Ok(())
}
