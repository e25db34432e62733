mod support;

use std::sync::Arc;

use prov_adapters::keys::{MANAGED_ENVIRONMENT, RESOURCE_GROUP, SUBNET, VIRTUAL_NETWORK, WEB_ENDPOINT};
use prov_adapters::{Operation, ProvisioningSummary, SimulatedControlPlane};
use prov_core::{EngineError, InMemoryInstanceStore, OrchestrationError, OrchestrationResult, Orchestrator,
                ParameterState, StatusLabel};
use support::{acme_request, plan_for, CrashingStore, SUBSCRIPTION};
use tokio_test::assert_ok;

#[tokio::test]
async fn acme_end_to_end_succeeds_with_expected_names() {
    let cp = Arc::new(SimulatedControlPlane::new());
    let plan = plan_for(&cp);
    let engine = Orchestrator::new(Arc::new(InMemoryInstanceStore::new()));

    let (id, result) = assert_ok!(engine.execute(&plan, acme_request()).await);
    let payload = result.payload().expect("success payload");
    let summary = ProvisioningSummary::from_payload(payload).unwrap();
    assert_eq!(summary.resource_group, "acme");
    assert_eq!(summary.virtual_network, "acme-VNet");
    assert_eq!(summary.subnet, "acme-Subnet");
    assert_eq!(summary.managed_environment, "acme-ContainerAppEnv");
    assert_eq!(summary.region, "JapanEast");
    assert!(!summary.web_endpoint.is_empty());
    assert!(summary.web_endpoint.starts_with("web."), "{}", summary.web_endpoint);
    assert!(payload.get("cache_endpoint").unwrap().ends_with(":6379"));
    assert!(payload.get("database_endpoint").unwrap().ends_with(":5432"));

    assert_eq!(engine.status_channel().status(id).await.unwrap(), StatusLabel::Succeeded);
    assert_eq!(cp.application_count("acme"), 3);
    let web = cp.deployed("acme", "web").unwrap();
    assert_eq!(web.env_value("TTNX_DB_PASSWORD"), Some("s3cret"));
}

#[tokio::test]
async fn database_failure_keeps_prior_checkpoints() {
    let cp = Arc::new(SimulatedControlPlane::new());
    cp.fail_on(Operation::CreateApplication,
               Some("db"),
               &["quota exceeded for container apps", "HTTP 409 Conflict"]);
    let plan = plan_for(&cp);
    let engine = Orchestrator::new(Arc::new(InMemoryInstanceStore::new()));

    let (id, result) = assert_ok!(engine.execute(&plan, acme_request()).await);
    match result.error() {
        Some(OrchestrationError::StepExecution { step, causes, .. }) => {
            assert_eq!(step, "DeployApplications");
            assert!(causes.iter().any(|c| c.contains("'db'")), "{causes:?}");
            assert_eq!(causes.last().map(String::as_str), Some("HTTP 409 Conflict"));
        }
        other => panic!("expected step failure, got {other:?}"),
    }

    let channel = engine.status_channel();
    let trail = channel.trail(id).await.unwrap();
    let n = trail.len();
    assert_eq!(trail[n - 1], StatusLabel::Failed);
    assert_eq!(trail[n - 2],
               StatusLabel::Begin { step_index: 3,
                                    step: "DeployApplications".into() });
    assert!(!trail.iter()
                  .any(|l| matches!(l, StatusLabel::End { step, .. } if step == "DeployApplications")));

    let snap = channel.snapshot(id).await.unwrap().unwrap();
    let checkpoint = snap.checkpoint();
    let state = &checkpoint.state;
    assert_eq!(state.get(RESOURCE_GROUP), Some("acme"));
    assert_eq!(state.get(VIRTUAL_NETWORK), Some("acme-VNet"));
    assert_eq!(state.get(SUBNET), Some("acme-Subnet"));
    assert_eq!(state.get(MANAGED_ENVIRONMENT), Some("acme-ContainerAppEnv"));
    assert_eq!(state.get(WEB_ENDPOINT), None);
    assert_eq!(state.get("cache_endpoint"), None, "no partial merge of the failed step");
}

#[tokio::test]
async fn existing_resource_group_is_a_precondition_failure() {
    let cp = Arc::new(SimulatedControlPlane::new().with_existing_resource_group("acme", "JapanEast"));
    let plan = plan_for(&cp);
    let engine = Orchestrator::new(Arc::new(InMemoryInstanceStore::new()));

    let (_, result) = assert_ok!(engine.execute(&plan, acme_request()).await);
    match result {
        OrchestrationResult::Failed { error: OrchestrationError::Precondition { message } } => {
            assert!(message.contains("'acme' has already been created"), "{message}");
        }
        other => panic!("expected precondition failure, got {other:?}"),
    }
    assert_eq!(cp.call_count(Operation::ResourceGroupExists), 1);
    assert_eq!(cp.call_count(Operation::CreateResourceGroup), 0);
    assert_eq!(cp.call_count(Operation::CreateNetwork), 0);
}

#[tokio::test]
async fn empty_tenant_is_rejected_without_calls() {
    let cp = Arc::new(SimulatedControlPlane::new());
    let plan = plan_for(&cp);
    let store = Arc::new(InMemoryInstanceStore::new());
    let engine = Orchestrator::new(store.clone());

    let err = engine.execute(&plan, ParameterState::new("", "JapanEast", SUBSCRIPTION))
                    .await
                    .unwrap_err();
    assert!(matches!(err, EngineError::Rejected(OrchestrationError::Validation { .. })));
    assert!(cp.calls().is_empty());
    assert!(engine.status_channel().list().await.unwrap().is_empty());
}

#[tokio::test]
async fn crash_then_resume_matches_uninterrupted_run() {
    let cp = Arc::new(SimulatedControlPlane::new());
    let plan = plan_for(&cp);
    let durable = Arc::new(InMemoryInstanceStore::new());
    // accepted + started/completed de los dos primeros pasos
    let crashing = Orchestrator::new(Arc::new(CrashingStore::new(durable.clone(), 5)));
    let id = crashing.accept(&plan, acme_request()).await.unwrap();
    assert!(crashing.drive(id, &plan).await.is_err());
    assert!(cp.has_network("acme"));
    assert!(!cp.has_environment("acme", "acme-ContainerAppEnv"));

    let restarted = Orchestrator::new(durable);
    assert_eq!(restarted.pending_instances().await.unwrap(), vec![id]);
    let resumed = assert_ok!(restarted.resume(id, &plan).await);
    assert!(resumed.is_success());
    assert_eq!(cp.call_count(Operation::CreateResourceGroup), 1);
    assert_eq!(cp.call_count(Operation::CreateNetwork), 1);

    let fresh = Arc::new(SimulatedControlPlane::new());
    let baseline = Orchestrator::new(Arc::new(InMemoryInstanceStore::new()));
    let (_, uninterrupted) = baseline.execute(&plan_for(&fresh), acme_request()).await.unwrap();
    assert_eq!(resumed, uninterrupted);
}

#[tokio::test]
async fn tenants_run_in_parallel_without_sharing_state() {
    let cp = Arc::new(SimulatedControlPlane::new().with_latency(std::time::Duration::from_millis(5)));
    let plan = Arc::new(plan_for(&cp));
    let engine = Orchestrator::new(Arc::new(InMemoryInstanceStore::new()));

    let mut handles = Vec::new();
    for tenant in ["alpha", "beta", "gamma"] {
        let (engine, plan) = (engine.clone(), plan.clone());
        handles.push(tokio::spawn(async move {
                         engine.execute(&plan, ParameterState::new(tenant, "JapanEast", SUBSCRIPTION))
                               .await
                     }));
    }
    for handle in handles {
        let (_, result) = handle.await.unwrap().unwrap();
        let payload = result.payload().unwrap();
        assert_eq!(payload.get(RESOURCE_GROUP), Some(payload.tenant.as_str()));
    }
    assert_eq!(cp.application_count("beta"), 3);
}
