use crate::cli::ServeArgs;
use crate::infra::{build_client, seed_demo_tenant, AppState};
use crate::routes::with_operational_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Utc;
use staffdesk::config::AppConfig;
use staffdesk::data::Scope;
use staffdesk::error::AppError;
use staffdesk::http::ApiState;
use staffdesk::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

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

    let client = build_client(&config);
    if let Some(company) = args.seed_demo.take() {
        seed_demo_tenant(&client, &Scope::company(company), Utc::now().date_naive())?;
    }
    let api_state = ApiState::new(Arc::new(client), config.planning.weekly_capacity_hours);

    let app = with_operational_routes(api_state)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        stale_after = ?config.cache.stale_after,
        "staffdesk api ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
