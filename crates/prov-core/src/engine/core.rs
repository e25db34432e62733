//! Implementación del `Orchestrator`.
//!
//! Ciclo de `drive` para una instancia:
//! 1. replay del log y verificación contra el plan (checkpoint ajeno o
//!    corrupto => resultado terminal `ReplayInconsistency`);
//! 2. si ya hay resultado se devuelve tal cual (write-once);
//! 3. preflight, sólo si ningún paso empezó nunca;
//! 4. pasos en orden desde el siguiente al último completado: `StepStarted`,
//!    ejecución, `StepCompleted` (fusión) o `StepFailed` + resultado;
//! 5. `InstanceCompleted` con el payload de éxito.
//!
//! Un error del store corta el ciclo sin escribir resultado: la instancia
//! queda reanudable desde su último evento durable.
use std::sync::Arc;

use dashmap::DashSet;
use log::{error, info, warn};
use uuid::Uuid;

use super::guard::RunGuard;
use crate::errors::{EngineError, OrchestrationError, StoreError};
use crate::event::{InstanceEventKind, InstanceStore};
use crate::plan::PlanDefinition;
use crate::repo::InstanceSnapshot;
use crate::result::{OrchestrationResult, SuccessPayload};
use crate::state::ParameterState;
use crate::status::StatusChannel;
use crate::step::{StepExecutor, StepRunResult};

/// Motor de orquestación durable.
///
/// Es barato de clonar: todas las copias comparten store y registro de
/// instancias en curso, así que puede moverse a una tarea por instancia.
pub struct Orchestrator<S>
    where S: InstanceStore
{
    store: Arc<S>,
    running: Arc<DashSet<Uuid>>,
}

impl<S> Clone for Orchestrator<S> where S: InstanceStore
{
    fn clone(&self) -> Self {
        Self { store: self.store.clone(),
               running: self.running.clone() }
    }
}

impl<S> Orchestrator<S> where S: InstanceStore
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store,
               running: Arc::new(DashSet::new()) }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn status_channel(&self) -> StatusChannel<S> {
        StatusChannel::new(self.store.clone())
    }

    /// Acepta una petición con un id nuevo. Valida antes de escribir: una
    /// petición inválida no deja rastro en el store.
    pub async fn accept(&self, plan: &PlanDefinition, initial: ParameterState) -> Result<Uuid, EngineError> {
        let instance_id = Uuid::new_v4();
        self.accept_with_id(instance_id, plan, initial).await?;
        Ok(instance_id)
    }

    pub async fn accept_with_id(&self,
                                instance_id: Uuid,
                                plan: &PlanDefinition,
                                initial: ParameterState)
                                -> Result<(), EngineError> {
        initial.validate().map_err(EngineError::Rejected)?;
        if let Some(missing) = plan.initial_keys().iter().find(|k| !initial.contains(k)) {
            return Err(EngineError::Rejected(OrchestrationError::validation(format!("initial state lacks '{missing}'"))));
        }

        let kind = InstanceEventKind::InstanceAccepted { definition_hash: plan.definition_hash().to_string(),
                                                         step_names: plan.step_names(),
                                                         initial_state: initial };
        match self.store.append(instance_id, kind).await {
            Ok(_) => {
                info!("instance_id={instance_id} accepted plan={}", plan.definition_hash());
                Ok(())
            }
            Err(StoreError::DuplicateInstance(id)) => Err(EngineError::AlreadyScheduled(id)),
            Err(e) => Err(e.into()),
        }
    }

    /// `Execute(plan, initialState)`: acepta y conduce hasta el resultado.
    pub async fn execute(&self,
                         plan: &PlanDefinition,
                         initial: ParameterState)
                         -> Result<(Uuid, OrchestrationResult), EngineError> {
        let instance_id = self.accept(plan, initial).await?;
        let result = self.drive(instance_id, plan).await?;
        Ok((instance_id, result))
    }

    /// Reanuda una instancia existente desde su último evento durable.
    pub async fn resume(&self, instance_id: Uuid, plan: &PlanDefinition) -> Result<OrchestrationResult, EngineError> {
        info!("instance_id={instance_id} resume requested");
        self.drive(instance_id, plan).await
    }

    /// Instancias aceptadas que todavía no tienen resultado terminal.
    pub async fn pending_instances(&self) -> Result<Vec<Uuid>, EngineError> {
        let mut pending = Vec::new();
        for id in self.store.instances().await? {
            let events = self.store.list(id).await?;
            if !events.iter().any(|e| e.kind.is_terminal()) {
                pending.push(id);
            }
        }
        Ok(pending)
    }

    /// Conduce la instancia hasta su resultado terminal.
    pub async fn drive(&self, instance_id: Uuid, plan: &PlanDefinition) -> Result<OrchestrationResult, EngineError> {
        let _guard = RunGuard::acquire(&self.running, instance_id)?;

        let events = self.store.list(instance_id).await?;
        if events.is_empty() {
            return Err(EngineError::UnknownInstance(instance_id));
        }

        let snapshot = match InstanceSnapshot::replay(instance_id, &events) {
            Ok(s) => s,
            Err(e) => {
                error!("instance_id={instance_id} replay failed: {e}");
                return self.finish(instance_id, OrchestrationResult::Failed { error: e }).await;
            }
        };
        if let Some(result) = snapshot.result.clone() {
            info!("instance_id={instance_id} already terminal; returning stored result");
            return Ok(result);
        }
        if let Err(e) = snapshot.verify_against(plan) {
            error!("instance_id={instance_id} foreign checkpoint: {e}");
            return self.finish(instance_id, OrchestrationResult::Failed { error: e }).await;
        }
        if let Some(e) = snapshot.recorded_failure() {
            warn!("instance_id={instance_id} step failure recorded without result; completing");
            return self.finish(instance_id, OrchestrationResult::Failed { error: e.clone() }).await;
        }

        let mut state = snapshot.state.clone();
        if snapshot.any_step_started() {
            info!("instance_id={instance_id} resuming at step #{} (last completed: {:?})",
                  snapshot.next_step_index,
                  snapshot.last_completed_step);
            if let Some(i) = snapshot.in_flight() {
                warn!("instance_id={instance_id} step #{i} was in flight; re-executing (attempt {})",
                      snapshot.slots[i].attempts + 1);
            }
        } else {
            for check in plan.preflight() {
                if let Err(failure) = check.check(&state).await {
                    warn!("instance_id={instance_id} preflight '{}' failed: {failure}", check.name());
                    let error = OrchestrationError::precondition(failure.message);
                    return self.finish(instance_id, OrchestrationResult::Failed { error }).await;
                }
            }
        }

        for (index, step) in plan.steps().iter().enumerate().skip(snapshot.next_step_index) {
            let name = step.name().to_string();
            self.store
                .append(instance_id,
                        InstanceEventKind::StepStarted { step_index: index,
                                                         step: name.clone() })
                .await?;

            let outcome = StepExecutor::execute(step.as_ref(), &state).await;
            let (message, outputs) = match outcome {
                StepRunResult::Success { message, outputs } => (message, outputs),
                StepRunResult::Failure { failure } => {
                    let error = OrchestrationError::StepExecution { step: name.clone(),
                                                                    message: failure.message,
                                                                    causes: failure.causes };
                    return self.fail_step(instance_id, index, name, error).await;
                }
            };

            let mut merged = state.clone();
            if let Err(conflict) = merged.merge(&outputs) {
                let error = OrchestrationError::StepExecution { step: name.clone(),
                                                                message: conflict.to_string(),
                                                                causes: Vec::new() };
                return self.fail_step(instance_id, index, name, error).await;
            }

            self.store
                .append(instance_id,
                        InstanceEventKind::StepCompleted { step_index: index,
                                                           step: name.clone(),
                                                           message,
                                                           outputs })
                .await?;
            state = merged;
            info!("instance_id={instance_id} checkpoint after step={name} keys={}", state.len());
        }

        let payload = SuccessPayload::from_state(&state);
        self.finish(instance_id, OrchestrationResult::Succeeded { payload }).await
    }

    async fn fail_step(&self,
                       instance_id: Uuid,
                       step_index: usize,
                       step: String,
                       error: OrchestrationError)
                       -> Result<OrchestrationResult, EngineError> {
        error!("instance_id={instance_id} step={step} failed: {error}");
        self.store
            .append(instance_id,
                    InstanceEventKind::StepFailed { step_index,
                                                    step,
                                                    error: error.clone() })
            .await?;
        self.finish(instance_id, OrchestrationResult::Failed { error }).await
    }

    /// Escribe el resultado terminal. Si otro escritor llegó antes, devuelve
    /// el resultado ya almacenado.
    async fn finish(&self, instance_id: Uuid, result: OrchestrationResult) -> Result<OrchestrationResult, EngineError> {
        match self.store
                  .append(instance_id, InstanceEventKind::InstanceCompleted { result: result.clone() })
                  .await
        {
            Ok(_) => {
                info!("instance_id={instance_id} completed success={}", result.is_success());
                Ok(result)
            }
            Err(StoreError::TerminalInstance(_)) => {
                let events = self.store.list(instance_id).await?;
                events.into_iter()
                      .find_map(|e| match e.kind {
                          InstanceEventKind::InstanceCompleted { result } => Some(result),
                          _ => None,
                      })
                      .ok_or(EngineError::Store(StoreError::TerminalInstance(instance_id)))
            }
            Err(e) => Err(e.into()),
        }
    }
}
