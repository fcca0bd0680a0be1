//! HTTP API for anomaly checks, alerts, health and Prometheus metrics

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use monitor_lib::{
    advisory::{advisory_filename, render_advisory_pdf},
    anomaly::{AnomalyEvaluator, Evaluation},
    error::{ImportError, StoreError, ValidationError},
    health::{components, ComponentStatus, HealthRegistry},
    ingest::{parse_measurements_csv, RejectedRow},
    models::{Measurement, MeasurementRecord},
    notify::{DeliveryResult, DeliveryStatus, NotificationDispatcher},
    observability::{MonitorMetrics, StructuredLogger},
    store::{AlertSink, HistoryProvider, MeasurementStore, StoredAlert, Subscriber, SubscriberStore},
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// Default number of measurements returned by the recent listing
const DEFAULT_MEASUREMENT_LIMIT: usize = 200;

/// Default number of alerts returned by the alert listing
const DEFAULT_ALERT_LIMIT: usize = 50;

/// Shared application state
pub struct AppState {
    pub evaluator: AnomalyEvaluator,
    pub measurements: Arc<MeasurementStore>,
    pub alerts: Arc<dyn AlertSink>,
    pub subscribers: SubscriberStore,
    pub dispatcher: NotificationDispatcher,
    pub health_registry: HealthRegistry,
    pub metrics: MonitorMetrics,
    pub logger: StructuredLogger,
}

impl AppState {
    pub fn new(
        evaluator: AnomalyEvaluator,
        measurements: Arc<MeasurementStore>,
        alerts: Arc<dyn AlertSink>,
        dispatcher: NotificationDispatcher,
        health_registry: HealthRegistry,
        metrics: MonitorMetrics,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            evaluator,
            measurements,
            alerts,
            subscribers: SubscriberStore::new(),
            dispatcher,
            health_registry,
            metrics,
            logger,
        }
    }
}

/// Errors surfaced by API handlers
#[derive(Debug)]
pub enum ApiError {
    Validation(ValidationError),
    Import(ImportError),
    NotFound(String),
    Internal(anyhow::Error),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Validation(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            ApiError::Import(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Internal(e) => {
                error!(error = %e, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        match e.downcast_ref::<StoreError>() {
            Some(store_error) => ApiError::NotFound(store_error.to_string()),
            None => ApiError::Internal(e),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

/// Result of an anomaly check
#[derive(Debug, Serialize)]
pub struct CheckResponse {
    #[serde(flatten)]
    pub evaluation: Evaluation,
    /// Id assigned by the alert store when an alert was raised
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_id: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AlertList {
    pub alerts: Vec<StoredAlert>,
    pub total: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct NotifyRequest {
    pub channels: Vec<String>,
    #[serde(default)]
    pub targets: HashMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NotifyResponse {
    pub id: u64,
    pub results: BTreeMap<String, DeliveryResult>,
}

/// Summary of a CSV upload
#[derive(Debug, Serialize, Deserialize)]
pub struct ImportResponse {
    pub inserted: usize,
    pub rejected: usize,
    pub errors: Vec<RejectedRow>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubscribeRequest {
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Result<impl IntoResponse, ApiError> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&prometheus::gather(), &mut buffer)
        .map_err(|e| ApiError::Internal(e.into()))?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        buffer,
    ))
}

fn reject(state: &AppState, e: ValidationError) -> ApiError {
    state.metrics.inc_validation_failures();
    state.logger.log_validation_failure(&e.to_string());
    ApiError::Validation(e)
}

/// Record a measurement without evaluating it
async fn record_measurement(
    State(state): State<Arc<AppState>>,
    Json(measurement): Json<Measurement>,
) -> Result<(StatusCode, Json<MeasurementRecord>), ApiError> {
    measurement.validate().map_err(|e| reject(&state, e))?;

    let record = state.measurements.record(measurement).await;
    state.metrics.inc_measurements_recorded();

    Ok((StatusCode::CREATED, Json(record)))
}

/// Bulk-record measurements from a CSV body
///
/// Invalid rows are skipped and reported; the rest are recorded in file order.
async fn import_measurements(
    State(state): State<Arc<AppState>>,
    body: String,
) -> Result<(StatusCode, Json<ImportResponse>), ApiError> {
    let import = parse_measurements_csv(body.as_bytes()).map_err(ApiError::Import)?;

    for rejected in &import.rejected {
        state.metrics.inc_validation_failures();
        state
            .logger
            .log_validation_failure(&format!("line {}: {}", rejected.line, rejected.reason));
    }

    let inserted = import.measurements.len();
    for measurement in import.measurements {
        state.measurements.record(measurement).await;
        state.metrics.inc_measurements_recorded();
    }
    state.logger.log_import(inserted, import.rejected.len());

    Ok((
        StatusCode::CREATED,
        Json(ImportResponse {
            inserted,
            rejected: import.rejected.len(),
            errors: import.rejected,
        }),
    ))
}

async fn recent_measurements(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LimitQuery>,
) -> Json<Vec<MeasurementRecord>> {
    let limit = query.limit.unwrap_or(DEFAULT_MEASUREMENT_LIMIT);
    Json(state.measurements.recent_measurements(limit).await)
}

/// Evaluate a measurement against the stored history
///
/// The history snapshot is read before the new measurement is recorded, so
/// an observation is never part of its own baseline.
async fn check_measurement(
    State(state): State<Arc<AppState>>,
    Json(measurement): Json<Measurement>,
) -> Result<Json<CheckResponse>, ApiError> {
    let window = state.evaluator.config().window_size;
    let history = state.measurements.channel_history(window).await?;

    let started = Instant::now();
    let evaluation = state
        .evaluator
        .evaluate(&measurement, &history)
        .map_err(|e| reject(&state, e))?;
    state
        .metrics
        .observe_evaluation(started.elapsed().as_secs_f64(), evaluation.is_anomaly());
    state.logger.log_evaluation(&evaluation, history.sst.len());

    let alert_id = match evaluation.alert() {
        Some(alert) => {
            let stored = match state.alerts.append(alert.clone()).await {
                Ok(stored) => stored,
                Err(e) => {
                    state
                        .health_registry
                        .set_unhealthy(components::ALERT_STORE, e.to_string())
                        .await;
                    return Err(e.into());
                }
            };
            state.health_registry.set_healthy(components::ALERT_STORE).await;
            state.metrics.inc_alerts_stored();
            refresh_active_alerts(&state).await;
            state.logger.log_alert_stored(stored.id, &stored.alert.message);
            Some(stored.id)
        }
        None => None,
    };

    state.measurements.record(measurement).await;
    state.metrics.inc_measurements_recorded();

    Ok(Json(CheckResponse {
        evaluation,
        alert_id,
    }))
}

async fn list_alerts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<AlertList>, ApiError> {
    let alerts = state
        .alerts
        .list_recent(query.limit.unwrap_or(DEFAULT_ALERT_LIMIT))
        .await?;
    let total = alerts.len();
    Ok(Json(AlertList { alerts, total }))
}

async fn get_alert(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<StoredAlert>, ApiError> {
    Ok(Json(state.alerts.get(id).await?))
}

/// PDF advisory download
async fn export_advisory(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<impl IntoResponse, ApiError> {
    let stored = state.alerts.get(id).await?;
    let pdf = render_advisory_pdf(&stored).map_err(|e| ApiError::Internal(e.into()))?;
    let disposition = format!("attachment; filename={}", advisory_filename(id));

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        pdf,
    ))
}

async fn notify_alert(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(request): Json<NotifyRequest>,
) -> Result<Json<NotifyResponse>, ApiError> {
    let stored = state.alerts.get(id).await?;

    let results = state
        .dispatcher
        .dispatch(&stored.alert, &request.channels, &request.targets)
        .await;

    for (channel, result) in &results {
        state.metrics.inc_notification(channel, result.status);
        state.logger.log_notification(id, channel, result);
    }

    let failed: Vec<&str> = results
        .iter()
        .filter(|(_, r)| r.status == DeliveryStatus::Failed)
        .map(|(channel, _)| channel.as_str())
        .collect();
    if failed.is_empty() {
        state.health_registry.set_healthy(components::NOTIFIER).await;
    } else {
        state
            .health_registry
            .set_degraded(
                components::NOTIFIER,
                format!("delivery failed on {}", failed.join(", ")),
            )
            .await;
    }

    state.alerts.record_notifications(id, results.clone()).await?;

    Ok(Json(NotifyResponse { id, results }))
}

async fn resolve_alert(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<StoredAlert>, ApiError> {
    let resolution = state.alerts.resolve(id).await?;

    if resolution.changed {
        refresh_active_alerts(&state).await;
        state.logger.log_alert_resolved(id);
    }

    Ok(Json(resolution.alert))
}

async fn refresh_active_alerts(state: &AppState) {
    match state.alerts.active_count().await {
        Ok(count) => state.metrics.set_active_alerts(count),
        Err(e) => error!(error = %e, "Failed to count active alerts"),
    }
}

async fn register_subscriber(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SubscribeRequest>,
) -> Result<(StatusCode, Json<Subscriber>), ApiError> {
    let subscriber = state
        .subscribers
        .register(request.phone, request.email)
        .await
        .map_err(ApiError::Validation)?;
    state.logger.log_subscriber_registered(subscriber.id);

    Ok((StatusCode::CREATED, Json(subscriber)))
}

async fn list_subscribers(State(state): State<Arc<AppState>>) -> Json<Vec<Subscriber>> {
    Json(state.subscribers.list().await)
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/measurements", post(record_measurement))
        .route("/api/v1/measurements/csv", post(import_measurements))
        .route("/api/v1/measurements/recent", get(recent_measurements))
        .route("/api/v1/alerts", get(list_alerts))
        .route("/api/v1/alerts/check", post(check_measurement))
        .route("/api/v1/alerts/:id", get(get_alert))
        .route("/api/v1/alerts/:id/advisory", get(export_advisory))
        .route("/api/v1/alerts/:id/notify", post(notify_alert))
        .route("/api/v1/alerts/:id/resolve", post(resolve_alert))
        .route(
            "/api/v1/subscribers",
            get(list_subscribers).post(register_subscriber),
        )
        .with_state(state)
}

/// Register every component and mark the service ready
pub async fn mark_ready(health_registry: &HealthRegistry) {
    health_registry.register_all().await;
    health_registry.set_ready(true).await;
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
