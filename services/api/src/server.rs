use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use tracing::info;

use emission_core::activity::InMemoryActivitySource;
use emission_core::calculation::{EmissionCalculationService, InMemoryResultStore};
use emission_core::config::AppConfig;
use emission_core::error::AppError;
use emission_core::factors::{read_factor_file, FactorCatalog};
use emission_core::telemetry;

use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_service_routes;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let catalog = FactorCatalog::new();
    if let Some(path) = &config.calculation.factor_seed_csv {
        let summary = catalog.upsert_all(read_factor_file(path)?)?;
        info!(path = %path.display(), created = summary.created, "seed factors loaded");
    }

    let sources = Arc::new(InMemoryActivitySource::new());
    let service = Arc::new(EmissionCalculationService::new(
        sources.clone(),
        Arc::new(catalog),
        Arc::new(InMemoryResultStore::new()),
        config.calculation.to_engine_options(),
    ));

    let app = with_service_routes(service, sources)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        default_region = %config.calculation.default_region,
        unit_relaxation = config.calculation.allow_unit_relaxation,
        "emission calculation service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
