use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use rust_decimal::Decimal;

use emission_core::activity::{
    ActivityRecord, ActivityRecordId, AssignmentId, BasicMetric, EmissionSettings,
    InMemoryActivitySource, LayerId, MetricDefinition, MetricId, PeriodFrequency,
    TabularMetric, TimeSeriesMetric, UnitSettings,
};
use emission_core::calculation::{EmissionCalculationService, InMemoryResultStore};
use emission_core::error::AppError;
use emission_core::factors::{read_factor_file, FactorCatalog, FactorRecord, GhgScope};

pub(crate) type MemoryService =
    EmissionCalculationService<InMemoryActivitySource, FactorCatalog, InMemoryResultStore>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Catalog seeded from `path`, or the built-in reference factors when no file is given.
pub(crate) fn load_catalog(path: Option<&Path>) -> Result<FactorCatalog, AppError> {
    let records = match path {
        Some(path) => read_factor_file(path)?,
        None => reference_factors(),
    };
    Ok(FactorCatalog::from_records(records)?)
}

#[allow(clippy::too_many_arguments)]
fn reference_factor(
    name: &str,
    category: &str,
    sub_category: &str,
    activity_unit: &str,
    value: Decimal,
    year: i32,
    region: &str,
    scope: GhgScope,
) -> FactorRecord {
    FactorRecord {
        name: name.to_string(),
        category: category.to_string(),
        sub_category: sub_category.to_string(),
        activity_unit: activity_unit.to_string(),
        value,
        factor_unit: format!("kgCO2e/{activity_unit}"),
        year,
        region: region.to_string(),
        scope: Some(scope),
        source: "Demo reference set".to_string(),
        source_url: None,
    }
}

pub(crate) fn reference_factors() -> Vec<FactorRecord> {
    vec![
        reference_factor(
            "CLP grid electricity",
            "electricity",
            "hk_clp",
            "kWh",
            Decimal::new(3900, 4),
            2025,
            "HK",
            GhgScope::Scope2,
        ),
        reference_factor(
            "Average grid electricity",
            "electricity",
            "hk_clp",
            "kWh",
            Decimal::new(4200, 4),
            2024,
            "ALL",
            GhgScope::Scope2,
        ),
        reference_factor(
            "Diesel oil (cars)",
            "transport",
            "transport_cars_diesel",
            "liters",
            Decimal::new(26460, 4),
            2025,
            "ALL",
            GhgScope::Scope1,
        ),
        reference_factor(
            "Towngas",
            "stationary",
            "towngas",
            "Unit",
            Decimal::new(25930, 4),
            2022,
            "HK / Macau",
            GhgScope::Scope1,
        ),
    ]
}

fn linked(category: &str, sub_category: &str, location: Option<&str>) -> EmissionSettings {
    EmissionSettings {
        emission_category: Some(category.to_string()),
        emission_sub_category: Some(sub_category.to_string()),
        location: location.map(str::to_string),
    }
}

fn unit(name: &str) -> UnitSettings {
    UnitSettings {
        unit_type: Some(name.to_string()),
        custom_unit: None,
    }
}

pub(crate) fn demo_metrics() -> Vec<MetricDefinition> {
    vec![
        MetricDefinition::Basic(BasicMetric {
            id: MetricId::from("electricity"),
            name: "Purchased electricity".to_string(),
            emission: linked("electricity", "hk_clp", Some("HK")),
            unit: unit("kWh"),
        }),
        MetricDefinition::Tabular(TabularMetric {
            id: MetricId::from("fleet_diesel"),
            name: "Fleet fuel log".to_string(),
            value_column: "litres_dispensed".to_string(),
            emission: linked("transport", "transport_cars_diesel", None),
            unit: unit("liters"),
        }),
        MetricDefinition::TimeSeries(TimeSeriesMetric {
            id: MetricId::from("towngas"),
            name: "Kitchen towngas".to_string(),
            frequency: PeriodFrequency::Monthly,
            emission: linked("stationary", "towngas", Some("HK")),
            unit: unit("Unit"),
        }),
        MetricDefinition::Basic(BasicMetric {
            id: MetricId::from("headcount"),
            name: "Headcount".to_string(),
            emission: EmissionSettings::default(),
            unit: unit("persons"),
        }),
    ]
}

pub(crate) fn activity_record(
    id: &str,
    metric: &str,
    assignment: &str,
    value: Decimal,
    activity_unit: &str,
    period: NaiveDate,
) -> ActivityRecord {
    ActivityRecord {
        id: ActivityRecordId::from(id),
        aggregated_numeric_value: Some(value),
        activity_unit: activity_unit.to_string(),
        reporting_period: period,
        metric_id: MetricId::from(metric),
        layer_id: LayerId::from("hk-office"),
        assignment_id: AssignmentId::from(assignment),
    }
}

pub(crate) fn parse_scope(raw: &str) -> Result<GhgScope, String> {
    raw.trim()
        .parse::<u8>()
        .map_err(|_| format!("scope '{raw}' is not a number"))
        .and_then(|number| GhgScope::try_from(number).map_err(|err| err.to_string()))
}
