use crate::cli::ServeArgs;
use crate::infra::{
    seeded_directory, seeded_ledger, AppState, InMemoryAdmitCardStore, InMemorySettingsStore,
};
use crate::routes::with_admit_card_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;
use vidya::config::AppConfig;
use vidya::error::AppError;
use vidya::telemetry;
use vidya::workflows::admit_card::AdmitCardService;

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
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let policies = Arc::new(InMemorySettingsStore::default());
    let directory = Arc::new(seeded_directory());
    let ledger = Arc::new(seeded_ledger());
    let cards = Arc::new(InMemoryAdmitCardStore::default());
    let admit_card_service = Arc::new(AdmitCardService::new(
        policies,
        directory,
        ledger,
        cards,
        config.workflow.bulk_workers,
    ));

    let app = with_admit_card_routes(admit_card_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "admit card service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
