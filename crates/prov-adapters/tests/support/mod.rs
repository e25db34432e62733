#![allow(dead_code)]

use std::sync::atomic::{AtomicIsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use prov_adapters::{provisioning_plan, DeploymentSettings, ProvisioningRequest, SimulatedControlPlane};
use prov_core::{InMemoryInstanceStore, InstanceEvent, InstanceEventKind, InstanceStore, ParameterState,
                PlanDefinition, StoreError};
use uuid::Uuid;

pub const SUBSCRIPTION: &str = "00000000-0000-0000-0000-000000000001";

pub fn plan_for(cp: &Arc<SimulatedControlPlane>) -> PlanDefinition {
    provisioning_plan(cp.clone(), DeploymentSettings::new("s3cret")).unwrap()
}

pub fn acme_request() -> ParameterState {
    ProvisioningRequest::from_json(br#"{"UserName":"acme","Location":"JapanEast"}"#).unwrap()
                                                                                  .initial_state(SUBSCRIPTION,
                                                                                                 "JapanEast")
}

/// Store que deja de aceptar escrituras tras `n` appends (simula un
/// reinicio del proceso a mitad del plan).
pub struct CrashingStore {
    pub inner: Arc<InMemoryInstanceStore>,
    remaining: AtomicIsize,
}

impl CrashingStore {
    pub fn new(inner: Arc<InMemoryInstanceStore>, appends_before_crash: isize) -> Self {
        Self { inner,
               remaining: AtomicIsize::new(appends_before_crash) }
    }
}

#[async_trait]
impl InstanceStore for CrashingStore {
    async fn append(&self, instance_id: Uuid, kind: InstanceEventKind) -> Result<InstanceEvent, StoreError> {
        if self.remaining.fetch_sub(1, Ordering::SeqCst) <= 0 {
            return Err(StoreError::Backend("process restarted".into()));
        }
        self.inner.append(instance_id, kind).await
    }

    async fn list(&self, instance_id: Uuid) -> Result<Vec<InstanceEvent>, StoreError> {
        self.inner.list(instance_id).await
    }

    async fn instances(&self) -> Result<Vec<Uuid>, StoreError> {
        self.inner.instances().await
    }
}
