use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use careflow::access::{AuthorizationGate, IdentityResolver, PermissionMatrix};
use careflow::config::AppConfig;
use careflow::error::AppError;
use careflow::telemetry;
use careflow::workflows::dispute::DisputeWorkflow;
use careflow::workflows::submission::SubmissionWorkflow;
use careflow::workflows::EntityLocks;
use tracing::info;

use crate::cli::ServeArgs;
use crate::infra::{
    AppState, MemoryAuditSink, MemoryDisputeStore, MemoryNotificationPublisher,
    MemorySubmissionStore, StaticIdentityDirectory,
};
use crate::routes::{app_router, GovernanceState};

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

    let audit = Arc::new(MemoryAuditSink::default());
    let gate = Arc::new(AuthorizationGate::new(
        PermissionMatrix::marketplace_defaults(),
        audit.clone(),
    ));
    let locks = Arc::new(EntityLocks::new(config.policy.lock_wait()));
    let notifications = Arc::new(MemoryNotificationPublisher::default());
    let submissions = Arc::new(SubmissionWorkflow::new(
        gate.clone(),
        Arc::new(MemorySubmissionStore::with_sink(audit.clone())),
        notifications.clone(),
        locks.clone(),
    ));
    let disputes = Arc::new(DisputeWorkflow::new(
        gate.clone(),
        Arc::new(MemoryDisputeStore::with_sink(audit.clone())),
        notifications,
        locks,
        config.policy,
    ));
    let resolver: Arc<dyn IdentityResolver> = Arc::new(StaticIdentityDirectory::seeded());

    let governance = GovernanceState {
        policy: config.policy,
        gate,
        audit,
        resolver: resolver.clone(),
    };

    let app = app_router(submissions, disputes, resolver, governance)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "careflow moderation engine ready");

    axum::serve(listener, app).await?;
    Ok(())
}
