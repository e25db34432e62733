use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use prov_adapters::{Operation, SimulatedControlPlane};
use prov_core::InMemoryInstanceStore;
use provflow::{http, AppConfig, ProvisioningService};
use serde_json::Value;
use tokio_test::assert_ok;
use tower::ServiceExt;

fn config(pairs: &'static [(&'static str, &'static str)]) -> AppConfig {
    AppConfig::from_lookup(|k| pairs.iter().find(|(key, _)| *key == k).map(|(_, v)| v.to_string())).unwrap()
}

const FULL: &[(&str, &str)] = &[("SUBSCRIPTION_ID", "sub-1"),
                                ("DB_PASSWORD", "pw"),
                                ("PROVFLOW_PUBLIC_URL", "http://prov.test")];

fn app_with(cfg: AppConfig, cp: Arc<SimulatedControlPlane>) -> Router {
    let service = ProvisioningService::new(cfg, cp, Arc::new(InMemoryInstanceStore::new())).unwrap();
    http::router(service)
}

fn post(uri: &str, body: &str) -> Request<Body> {
    Request::post(uri).header(header::CONTENT_TYPE, "application/json")
                      .body(Body::from(body.to_string()))
                      .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

async fn body_text(resp: axum::response::Response) -> String {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(resp: axum::response::Response) -> Value {
    serde_json::from_str(&body_text(resp).await).unwrap()
}

#[tokio::test]
async fn health_is_ok() {
    let app = app_with(config(FULL), Arc::new(SimulatedControlPlane::new()));
    let resp = assert_ok!(app.oneshot(get("/health")).await);
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["status"], "ok");
}

#[tokio::test]
async fn empty_user_name_is_a_plain_text_400_with_no_calls() {
    let cp = Arc::new(SimulatedControlPlane::new());
    let app = app_with(config(FULL), cp.clone());
    let resp = assert_ok!(app.oneshot(post("/api/provision", r#"{"UserName":""}"#)).await);
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(resp.headers()[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/plain"));
    assert_eq!(body_text(resp).await, "Please provide a valid username in the request body.");
    assert!(cp.calls().is_empty());
}

#[tokio::test]
async fn missing_configuration_is_a_500() {
    let app = app_with(config(&[]), Arc::new(SimulatedControlPlane::new()));
    let resp = assert_ok!(app.oneshot(post("/api/provision", r#"{"UserName":"acme"}"#)).await);
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_text(resp).await.contains("SUBSCRIPTION_ID"));
}

#[tokio::test]
async fn async_front_door_returns_management_payload_and_completes() {
    let app = app_with(config(FULL), Arc::new(SimulatedControlPlane::new()));
    let resp = app.clone()
                  .oneshot(post("/api/provision", r#"{"UserName":"acme","Location":"JapanEast"}"#))
                  .await
                  .unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    let location = resp.headers()[header::LOCATION].to_str().unwrap().to_string();
    let body = body_json(resp).await;
    let id = body["id"].as_str().unwrap().to_string();
    assert_eq!(location, format!("http://prov.test/api/instances/{id}/status"));
    assert_eq!(body["statusQueryGetUri"], location.as_str());
    assert_eq!(body["resultQueryGetUri"], format!("http://prov.test/api/instances/{id}/result").as_str());

    let mut result = None;
    for _ in 0..200 {
        let resp = app.clone()
                      .oneshot(get(&format!("/api/instances/{id}/result")))
                      .await
                      .unwrap();
        if resp.status() == StatusCode::OK {
            result = Some(body_json(resp).await);
            break;
        }
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let result = result.expect("instance should finish");
    assert_eq!(result["result"]["outcome"], "Succeeded");
    assert_eq!(result["summary"]["virtual_network"], "acme-VNet");
    assert_eq!(result["summary"]["managed_environment"], "acme-ContainerAppEnv");

    let status = app.clone()
                    .oneshot(get(&format!("/api/instances/{id}/status")))
                    .await
                    .unwrap();
    assert_eq!(body_json(status).await["status"], "Succeeded");

    let list = body_json(app.oneshot(get("/api/instances")).await.unwrap()).await;
    assert_eq!(list.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn sync_front_door_maps_outcomes_to_status_codes() {
    let cp = Arc::new(SimulatedControlPlane::new().with_existing_resource_group("taken", "JapanEast"));
    cp.fail_on(Operation::CreateApplication, Some("db"), &["remote said no"]);
    let app = app_with(config(FULL), cp);

    let taken = app.clone()
                   .oneshot(post("/api/provision/sync", r#"{"username":"taken"}"#))
                   .await
                   .unwrap();
    assert_eq!(taken.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(taken).await["result"]["error"]["kind"], "PreconditionError");

    let failing = app.oneshot(post("/api/provision/sync", r#"{"UserName":"acme"}"#))
                     .await
                     .unwrap();
    assert_eq!(failing.status(), StatusCode::BAD_GATEWAY);
    let body = body_json(failing).await;
    assert_eq!(body["result"]["error"]["kind"], "StepExecutionError");
    assert_eq!(body["result"]["error"]["step"], "DeployApplications");
    assert!(body["summary"].is_null());
}

#[tokio::test]
async fn unknown_instances_are_404() {
    let app = app_with(config(FULL), Arc::new(SimulatedControlPlane::new()));
    let id = uuid::Uuid::new_v4();
    let status = app.clone()
                    .oneshot(get(&format!("/api/instances/{id}/status")))
                    .await
                    .unwrap();
    assert_eq!(status.status(), StatusCode::NOT_FOUND);
    let result = app.oneshot(get(&format!("/api/instances/{id}/result"))).await.unwrap();
    assert_eq!(result.status(), StatusCode::NOT_FOUND);
}
