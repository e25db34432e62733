//! Front door HTTP (axum).
//!
//! | Método | Ruta | Respuesta |
//! |---|---|---|
//! | POST | `/api/provision` | 202 + payload de gestión de la instancia |
//! | POST | `/api/provision/sync` | 200 / 409 / 502 con el resultado |
//! | GET | `/api/instances/:id/status` | `{ id, status }` |
//! | GET | `/api/instances/:id/result` | 200 resultado, 202 pendiente |
//! | GET | `/api/instances` | instancias conocidas |
//! | GET | `/health` | `{ status: "ok" }` |
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use prov_adapters::request::INVALID_USERNAME;
use prov_adapters::{ProvisioningRequest, ProvisioningSummary, RequestError};
use prov_core::{EngineError, InstanceStore, OrchestrationError, OrchestrationResult, ResultPoll, StatusLabel};
use serde::Serialize;
use serde_json::json;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::errors::AppError;
use crate::service::ProvisioningService;

pub fn router<S>(service: ProvisioningService<S>) -> Router
    where S: InstanceStore + 'static
{
    Router::new().route("/api/provision", post(provision::<S>))
                 .route("/api/provision/sync", post(provision_sync::<S>))
                 .route("/api/instances", get(list_instances::<S>))
                 .route("/api/instances/:id/status", get(instance_status::<S>))
                 .route("/api/instances/:id/result", get(instance_result::<S>))
                 .route("/health", get(health))
                 .layer(TraceLayer::new_for_http())
                 .with_state(service)
}

/// Payload de gestión devuelto al programar una instancia.
#[derive(Debug, Serialize)]
struct ManagementPayload {
    id: Uuid,
    #[serde(rename = "statusQueryGetUri")]
    status_query_get_uri: String,
    #[serde(rename = "resultQueryGetUri")]
    result_query_get_uri: String,
}

#[derive(Debug, Serialize)]
struct InstanceStatus {
    id: Uuid,
    status: StatusLabel,
}

fn plain(status: StatusCode, message: impl Into<String>) -> Response {
    (status, [(header::CONTENT_TYPE, "text/plain; charset=utf-8")], message.into()).into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Engine(EngineError::Rejected(e)) => plain(StatusCode::BAD_REQUEST, e.to_string()),
            AppError::Engine(EngineError::AlreadyScheduled(_)) => plain(StatusCode::CONFLICT, self.to_string()),
            AppError::Engine(EngineError::UnknownInstance(_)) => plain(StatusCode::NOT_FOUND, self.to_string()),
            // configuración del proceso incompleta: no es culpa del cliente
            AppError::Invalid(e) => plain(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            _ => {
                tracing::error!(error = %self, "request failed");
                plain(StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        }
    }
}

fn parse_request(body: &[u8]) -> Result<ProvisioningRequest, Response> {
    ProvisioningRequest::from_json(body).map_err(|e| match e {
                                            RequestError::InvalidTenant(_) => {
                                                plain(StatusCode::BAD_REQUEST, format!("{INVALID_USERNAME} ({e})"))
                                            }
                                            _ => plain(StatusCode::BAD_REQUEST, INVALID_USERNAME),
                                        })
}

async fn provision<S>(State(service): State<ProvisioningService<S>>, body: Bytes) -> Response
    where S: InstanceStore + 'static
{
    let request = match parse_request(&body) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let id = match service.schedule(&request).await {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };
    let base = service.config().public_url.clone().unwrap_or_default();
    let payload = ManagementPayload { id,
                                      status_query_get_uri: format!("{base}/api/instances/{id}/status"),
                                      result_query_get_uri: format!("{base}/api/instances/{id}/result") };
    tracing::info!(instance_id = %id, tenant = %request.user_name, "provisioning scheduled");
    (StatusCode::ACCEPTED, [(header::LOCATION, payload.status_query_get_uri.clone())], Json(payload)).into_response()
}

fn result_status(result: &OrchestrationResult) -> StatusCode {
    match result.error() {
        None => StatusCode::OK,
        Some(OrchestrationError::Precondition { .. }) => StatusCode::CONFLICT,
        Some(OrchestrationError::StepExecution { .. }) => StatusCode::BAD_GATEWAY,
        Some(OrchestrationError::Validation { .. }) => StatusCode::BAD_REQUEST,
        Some(OrchestrationError::ReplayInconsistency { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Resultado terminal más el resumen legible cuando hubo éxito.
fn result_body(id: Uuid, result: &OrchestrationResult) -> serde_json::Value {
    let summary = result.payload().and_then(ProvisioningSummary::from_payload);
    json!({ "id": id, "result": result, "summary": summary })
}

async fn provision_sync<S>(State(service): State<ProvisioningService<S>>, body: Bytes) -> Response
    where S: InstanceStore + 'static
{
    let request = match parse_request(&body) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    match service.run_sync(&request).await {
        Ok((id, result)) => (result_status(&result), Json(result_body(id, &result))).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn instance_status<S>(State(service): State<ProvisioningService<S>>, Path(id): Path<Uuid>) -> Response
    where S: InstanceStore + 'static
{
    match service.status(id).await {
        Ok(StatusLabel::Unknown) => plain(StatusCode::NOT_FOUND, format!("unknown orchestration instance {id}")),
        Ok(status) => Json(InstanceStatus { id, status }).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn instance_result<S>(State(service): State<ProvisioningService<S>>, Path(id): Path<Uuid>) -> Response
    where S: InstanceStore + 'static
{
    match service.result(id).await {
        Ok(ResultPoll::Unknown) => plain(StatusCode::NOT_FOUND, format!("unknown orchestration instance {id}")),
        Ok(ResultPoll::Pending(status)) => (StatusCode::ACCEPTED, Json(InstanceStatus { id, status })).into_response(),
        Ok(ResultPoll::Ready(result)) => Json(result_body(id, &result)).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn list_instances<S>(State(service): State<ProvisioningService<S>>) -> Response
    where S: InstanceStore + 'static
{
    match service.list().await {
        Ok(all) => {
            let body: Vec<InstanceStatus> = all.into_iter().map(|(id, status)| InstanceStatus { id, status }).collect();
            Json(body).into_response()
        }
        Err(e) => e.into_response(),
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
