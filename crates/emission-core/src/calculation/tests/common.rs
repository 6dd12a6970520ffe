use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::Response;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::activity::{
    ActivityRecord, ActivityRecordId, AssignmentId, BasicMetric, EmissionSettings,
    InMemoryActivitySource, LayerId, MetricDefinition, MetricId, PeriodFrequency,
    TimeSeriesMetric, UnitSettings,
};
use crate::calculation::domain::CalculatedEmissionValue;
use crate::calculation::engine::EngineOptions;
use crate::calculation::memory::InMemoryResultStore;
use crate::calculation::service::EmissionCalculationService;
use crate::calculation::store::{
    CommitSummary, ResultFilter, ResultStore, ResultStoreError, ScopeChangeSet, UpsertOutcome,
};
use crate::factors::{FactorCatalog, FactorRecord, GhgScope};

pub(super) type MemoryService =
    EmissionCalculationService<InMemoryActivitySource, FactorCatalog, InMemoryResultStore>;

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn factor(
    sub_category: &str,
    activity_unit: &str,
    value: Decimal,
    year: i32,
    region: &str,
    scope: Option<GhgScope>,
) -> FactorRecord {
    FactorRecord {
        name: format!("{sub_category} {year} {region}"),
        category: "energy".to_string(),
        sub_category: sub_category.to_string(),
        activity_unit: activity_unit.to_string(),
        value,
        factor_unit: format!("kgCO2e/{activity_unit}"),
        year,
        region: region.to_string(),
        scope,
        source: "Utility disclosure".to_string(),
        source_url: None,
    }
}

/// Grid electricity per kWh, diesel per litre, and a towngas factor that only exists for 2022.
pub(super) fn seed_factors() -> Vec<FactorRecord> {
    vec![
        factor(
            "grid_electricity",
            "kWh",
            Decimal::new(3900, 4),
            2025,
            "HK",
            Some(GhgScope::Scope2),
        ),
        factor(
            "grid_electricity",
            "kWh",
            Decimal::new(4500, 4),
            2025,
            "ALL",
            Some(GhgScope::Scope2),
        ),
        factor(
            "diesel",
            "liters",
            Decimal::new(26460, 4),
            2025,
            "ALL",
            Some(GhgScope::Scope1),
        ),
        factor(
            "towngas",
            "Unit",
            Decimal::new(25930, 4),
            2022,
            "HK / Macau",
            Some(GhgScope::Scope1),
        ),
    ]
}

pub(super) fn emission(sub_category: &str, location: Option<&str>) -> EmissionSettings {
    EmissionSettings {
        emission_category: Some("energy".to_string()),
        emission_sub_category: Some(sub_category.to_string()),
        location: location.map(str::to_string),
    }
}

pub(super) fn unit(unit_type: &str) -> UnitSettings {
    UnitSettings {
        unit_type: Some(unit_type.to_string()),
        custom_unit: None,
    }
}

pub(super) fn basic_metric(
    id: &str,
    emission: EmissionSettings,
    unit: UnitSettings,
) -> MetricDefinition {
    MetricDefinition::Basic(BasicMetric {
        id: MetricId::from(id),
        name: id.replace('_', " "),
        emission,
        unit,
    })
}

pub(super) fn record(
    id: &str,
    metric: &str,
    assignment: &str,
    value: Option<Decimal>,
    activity_unit: &str,
    period: NaiveDate,
) -> ActivityRecord {
    ActivityRecord {
        id: ActivityRecordId::from(id),
        aggregated_numeric_value: value,
        activity_unit: activity_unit.to_string(),
        reporting_period: period,
        metric_id: MetricId::from(metric),
        layer_id: LayerId::from("hq"),
        assignment_id: AssignmentId::from(assignment),
    }
}

/// Metrics used across the suites: electricity in HK, diesel with no location, towngas in HK,
/// and a water metric that was never linked to an emission category.
pub(super) fn seed_sources() -> InMemoryActivitySource {
    let sources = InMemoryActivitySource::new();
    let metrics = [
        basic_metric(
            "electricity",
            emission("grid_electricity", Some("HK")),
            unit("kWh"),
        ),
        basic_metric("diesel", emission("diesel", None), unit("liters")),
        MetricDefinition::TimeSeries(TimeSeriesMetric {
            id: MetricId::from("towngas"),
            name: "Towngas".to_string(),
            frequency: PeriodFrequency::Monthly,
            emission: emission("towngas", Some("HK")),
            unit: unit("Unit"),
        }),
        basic_metric("water", EmissionSettings::default(), unit("m3")),
    ];
    for metric in metrics {
        sources.put_metric(metric).expect("metric stored");
    }
    sources
}

pub(super) struct Harness {
    pub(super) sources: Arc<InMemoryActivitySource>,
    pub(super) store: Arc<InMemoryResultStore>,
    pub(super) service: Arc<MemoryService>,
}

impl Harness {
    pub(super) fn new() -> Self {
        Self::with_options(EngineOptions::default())
    }

    pub(super) fn with_options(options: EngineOptions) -> Self {
        let sources = Arc::new(seed_sources());
        let factors =
            Arc::new(FactorCatalog::from_records(seed_factors()).expect("factors load"));
        let store = Arc::new(InMemoryResultStore::new());
        let service = Arc::new(EmissionCalculationService::new(
            sources.clone(),
            factors,
            store.clone(),
            options,
        ));
        Self {
            sources,
            store,
            service,
        }
    }

    pub(super) fn add(&self, record: ActivityRecord) {
        self.sources.put_record(record).expect("record stored");
    }

    pub(super) fn stored(&self, id: &str) -> Option<CalculatedEmissionValue> {
        self.store
            .fetch(&ActivityRecordId::from(id))
            .expect("store readable")
    }
}

/// Store whose every write loses a race.
#[derive(Default)]
pub(super) struct ConflictStore;

impl ResultStore for ConflictStore {
    fn upsert(&self, value: CalculatedEmissionValue) -> Result<UpsertOutcome, ResultStoreError> {
        Err(ResultStoreError::Conflict(value.activity_record_id))
    }

    fn remove(&self, record_id: &ActivityRecordId) -> Result<bool, ResultStoreError> {
        Err(ResultStoreError::Conflict(record_id.clone()))
    }

    fn fetch(
        &self,
        _record_id: &ActivityRecordId,
    ) -> Result<Option<CalculatedEmissionValue>, ResultStoreError> {
        Ok(None)
    }

    fn query(&self, _filter: &ResultFilter) -> Result<Vec<CalculatedEmissionValue>, ResultStoreError> {
        Ok(Vec::new())
    }

    fn commit(&self, changes: ScopeChangeSet) -> Result<CommitSummary, ResultStoreError> {
        let record_id = changes
            .retain
            .iter()
            .next()
            .cloned()
            .unwrap_or_else(|| ActivityRecordId::from("unknown"));
        Err(ResultStoreError::Conflict(record_id))
    }
}

/// Store that is down.
#[derive(Default)]
pub(super) struct UnavailableStore;

fn outage() -> ResultStoreError {
    ResultStoreError::Unavailable("result database offline".into())
}

impl ResultStore for UnavailableStore {
    fn upsert(&self, _value: CalculatedEmissionValue) -> Result<UpsertOutcome, ResultStoreError> {
        Err(outage())
    }

    fn remove(&self, _record_id: &ActivityRecordId) -> Result<bool, ResultStoreError> {
        Err(outage())
    }

    fn fetch(
        &self,
        _record_id: &ActivityRecordId,
    ) -> Result<Option<CalculatedEmissionValue>, ResultStoreError> {
        Err(outage())
    }

    fn query(&self, _filter: &ResultFilter) -> Result<Vec<CalculatedEmissionValue>, ResultStoreError> {
        Err(outage())
    }

    fn commit(&self, _changes: ScopeChangeSet) -> Result<CommitSummary, ResultStoreError> {
        Err(outage())
    }
}

pub(super) type ServiceWith<S> = EmissionCalculationService<InMemoryActivitySource, FactorCatalog, S>;

pub(super) fn service_with_store<S>(store: S) -> (Arc<InMemoryActivitySource>, Arc<ServiceWith<S>>)
where
    S: ResultStore + 'static,
{
    let sources = Arc::new(seed_sources());
    let factors = Arc::new(FactorCatalog::from_records(seed_factors()).expect("factors load"));
    let service = Arc::new(EmissionCalculationService::new(
        sources.clone(),
        factors,
        Arc::new(store),
        EngineOptions::default(),
    ));
    (sources, service)
}

pub(super) async fn json_body(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    let value = serde_json::from_slice(&bytes).expect("json body");
    (status, value)
}
