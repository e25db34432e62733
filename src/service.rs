//! `ProvisioningService`: el engine con sus dos front doors.
//!
//! - `schedule`: acepta la petición, la registra y conduce la instancia en su
//!   propia tarea tokio; devuelve el id de inmediato.
//! - `run_sync`: acepta y espera el `OrchestrationResult` sobre el mismo
//!   engine y el mismo store, así que también queda checkpointeado.
use std::sync::Arc;

use log::{error, info, warn};
use prov_adapters::{provisioning_plan, ProvisioningClient, ProvisioningRequest};
use prov_core::{EngineError, InstanceStore, OrchestrationResult, Orchestrator, PlanDefinition, ResultPoll,
                StatusLabel};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::errors::AppError;

pub struct ProvisioningService<S>
    where S: InstanceStore
{
    engine: Orchestrator<S>,
    plan: Arc<PlanDefinition>,
    config: Arc<AppConfig>,
}

impl<S> Clone for ProvisioningService<S> where S: InstanceStore
{
    fn clone(&self) -> Self {
        Self { engine: self.engine.clone(),
               plan: self.plan.clone(),
               config: self.config.clone() }
    }
}

impl<S> ProvisioningService<S> where S: InstanceStore + 'static
{
    pub fn new(config: AppConfig, client: Arc<dyn ProvisioningClient>, store: Arc<S>) -> Result<Self, AppError> {
        let plan = provisioning_plan(client, config.deployment_settings()).map_err(EngineError::from)?;
        info!("provisioning plan ready definition_hash={}", plan.definition_hash());
        Ok(Self { engine: Orchestrator::new(store),
                  plan: Arc::new(plan),
                  config: Arc::new(config) })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn plan(&self) -> &PlanDefinition {
        &self.plan
    }

    pub fn engine(&self) -> &Orchestrator<S> {
        &self.engine
    }

    async fn accept(&self, request: &ProvisioningRequest) -> Result<Uuid, AppError> {
        let subscription = self.config.require_provisioning()?;
        let initial = request.initial_state(subscription, &self.config.default_region);
        Ok(self.engine.accept(&self.plan, initial).await?)
    }

    /// Front door asíncrona.
    pub async fn schedule(&self, request: &ProvisioningRequest) -> Result<Uuid, AppError> {
        let instance_id = self.accept(request).await?;
        info!("instance_id={instance_id} tenant={} scheduled", request.user_name);
        let _detached = self.spawn_drive(instance_id);
        Ok(instance_id)
    }

    /// Front door síncrona. La instancia se conduce en su propia tarea: si el
    /// llamador abandona la espera, el plan sigue hasta su resultado.
    pub async fn run_sync(&self, request: &ProvisioningRequest) -> Result<(Uuid, OrchestrationResult), AppError> {
        let instance_id = self.accept(request).await?;
        info!("instance_id={instance_id} tenant={} running synchronously", request.user_name);
        let result = self.spawn_drive(instance_id)
                         .await
                         .map_err(|e| AppError::Task(format!("driver for instance {instance_id} aborted: {e}")))??;
        Ok((instance_id, result))
    }

    /// Reanuda y espera una instancia concreta.
    pub async fn resume(&self, instance_id: Uuid) -> Result<OrchestrationResult, AppError> {
        self.config.require_provisioning()?;
        Ok(self.engine.resume(instance_id, &self.plan).await?)
    }

    /// Relanza en segundo plano todas las instancias sin resultado terminal.
    pub async fn resume_pending(&self) -> Result<Vec<Uuid>, AppError> {
        let pending = self.engine.pending_instances().await?;
        if pending.is_empty() {
            return Ok(pending);
        }
        if let Err(e) = self.config.require_provisioning() {
            warn!("{} pending instances left untouched: {e}", pending.len());
            return Ok(Vec::new());
        }
        for id in &pending {
            info!("instance_id={id} resuming after restart");
            let _detached = self.spawn_drive(*id);
        }
        Ok(pending)
    }

    /// Conduce la instancia en una tarea tokio independiente del llamador.
    fn spawn_drive(&self, instance_id: Uuid) -> JoinHandle<Result<OrchestrationResult, EngineError>> {
        let engine = self.engine.clone();
        let plan = self.plan.clone();
        tokio::spawn(async move {
            let outcome = engine.drive(instance_id, &plan).await;
            match &outcome {
                Ok(result) if result.is_success() => info!("instance_id={instance_id} succeeded"),
                Ok(result) => {
                    let kind = result.error().map(|e| e.kind_name()).unwrap_or("unknown");
                    warn!("instance_id={instance_id} failed kind={kind}");
                }
                Err(EngineError::AlreadyRunning(_)) => info!("instance_id={instance_id} already being driven"),
                Err(e) => error!("instance_id={instance_id} interrupted: {e}"),
            }
            outcome
        })
    }

    pub async fn status(&self, instance_id: Uuid) -> Result<StatusLabel, AppError> {
        Ok(self.engine.status_channel().status(instance_id).await?)
    }

    pub async fn result(&self, instance_id: Uuid) -> Result<ResultPoll, AppError> {
        Ok(self.engine.status_channel().result(instance_id).await?)
    }

    pub async fn list(&self) -> Result<Vec<(Uuid, StatusLabel)>, AppError> {
        Ok(self.engine.status_channel().list().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prov_adapters::SimulatedControlPlane;
    use prov_core::InMemoryInstanceStore;
    use std::time::Duration;
    use tokio_test::assert_ok;

    fn config() -> AppConfig {
        AppConfig::from_lookup(|k| match k {
                      "SUBSCRIPTION_ID" => Some("sub-1".into()),
                      "DB_PASSWORD" => Some("pw".into()),
                      _ => None,
                  }).unwrap()
    }

    fn service(cfg: AppConfig) -> ProvisioningService<InMemoryInstanceStore> {
        ProvisioningService::new(cfg,
                                 Arc::new(SimulatedControlPlane::new()),
                                 Arc::new(InMemoryInstanceStore::new())).unwrap()
    }

    #[tokio::test]
    async fn scheduled_instance_reaches_a_terminal_status() {
        let svc = service(config());
        let id = svc.schedule(&ProvisioningRequest::new("acme", None)).await.unwrap();
        let mut status = svc.status(id).await.unwrap();
        for _ in 0..200 {
            if status.is_terminal() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
            status = svc.status(id).await.unwrap();
        }
        assert_eq!(status, StatusLabel::Succeeded);
        assert!(matches!(svc.result(id).await.unwrap(), ResultPoll::Ready(r) if r.is_success()));
    }

    #[tokio::test]
    async fn sync_front_door_is_checkpointed_too() {
        let svc = service(config());
        let (id, result) = svc.run_sync(&ProvisioningRequest::new("acme", Some("WestEurope".into())))
                              .await
                              .unwrap();
        assert!(result.is_success());
        assert_eq!(result.payload().map(|p| p.region.as_str()), Some("WestEurope"));
        assert_eq!(svc.list().await.unwrap(), vec![(id, StatusLabel::Succeeded)]);
    }

    #[tokio::test]
    async fn abandoned_sync_caller_does_not_strand_the_instance() {
        let cp = SimulatedControlPlane::new().with_latency(Duration::from_millis(20));
        let svc = ProvisioningService::new(config(), Arc::new(cp), Arc::new(InMemoryInstanceStore::new())).unwrap();
        let waited = tokio::time::timeout(Duration::from_millis(50),
                                          svc.run_sync(&ProvisioningRequest::new("acme", None))).await;
        assert!(waited.is_err(), "the plan takes longer than the caller waits");

        let listed = assert_ok!(svc.list().await);
        assert_eq!(listed.len(), 1);
        let id = listed[0].0;
        let mut status = listed[0].1.clone();
        for _ in 0..400 {
            if status.is_terminal() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            status = assert_ok!(svc.status(id).await);
        }
        assert_eq!(status, StatusLabel::Succeeded);
        assert!(matches!(assert_ok!(svc.result(id).await), ResultPoll::Ready(r) if r.is_success()));
    }

    #[tokio::test]
    async fn missing_configuration_rejects_before_writing() {
        let svc = service(AppConfig::from_lookup(|_| None).unwrap());
        let err = svc.schedule(&ProvisioningRequest::new("acme", None)).await.unwrap_err();
        assert_eq!(err.validation().map(|e| e.kind_name()), Some("ValidationError"));
        assert!(svc.list().await.unwrap().is_empty());
    }
}
