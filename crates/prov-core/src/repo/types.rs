//! Estado reconstruido de una instancia (`InstanceSnapshot`) y su vista de
//! checkpoint.
//!
//! El replay es lineal: consume los eventos en orden y valida cada
//! transición. Cualquier secuencia que el engine no podría haber escrito
//! (paso fuera de orden, fusión conflictiva, evento tras el resultado) es una
//! `ReplayInconsistency`; nunca se saltan pasos en silencio.
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::errors::OrchestrationError;
use crate::event::{InstanceEvent, InstanceEventKind};
use crate::plan::PlanDefinition;
use crate::result::OrchestrationResult;
use crate::state::ParameterState;
use crate::status::StatusLabel;
use crate::step::StepStatus;

/// Estado de un paso dentro de la instancia.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepSlot {
    pub step: String,
    pub status: StepStatus,
    pub message: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub attempts: u32, // >1 sólo si se reanudó un paso en vuelo
}

/// Checkpoint de recuperación: último paso completado + estado + etiqueta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrchestrationCheckpoint {
    pub instance_id: Uuid,
    pub last_completed_step: Option<String>,
    pub next_step_index: usize,
    pub state: ParameterState,
    pub status: StatusLabel,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InstanceSnapshot {
    pub instance_id: Uuid,
    pub definition_hash: String,
    pub step_names: Vec<String>,
    pub state: ParameterState,
    pub slots: Vec<StepSlot>,
    pub next_step_index: usize,
    pub last_completed_step: Option<String>,
    pub status: StatusLabel,
    pub failure: Option<OrchestrationError>,
    pub result: Option<OrchestrationResult>,
    pub accepted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InstanceSnapshot {
    pub fn replay(instance_id: Uuid, events: &[InstanceEvent]) -> Result<Self, OrchestrationError> {
        let (first, rest) = events.split_first()
                                  .ok_or_else(|| OrchestrationError::replay(format!("instance {instance_id} has no events")))?;
        let mut snap = match &first.kind {
            InstanceEventKind::InstanceAccepted { definition_hash,
                                                  step_names,
                                                  initial_state, } => {
                Self { instance_id,
                       definition_hash: definition_hash.clone(),
                       step_names: step_names.clone(),
                       state: initial_state.clone(),
                       slots: step_names.iter()
                                        .map(|s| StepSlot { step: s.clone(),
                                                            status: StepStatus::Pending,
                                                            message: None,
                                                            started_at: None,
                                                            finished_at: None,
                                                            attempts: 0 })
                                        .collect(),
                       next_step_index: 0,
                       last_completed_step: None,
                       status: StatusLabel::Pending,
                       failure: None,
                       result: None,
                       accepted_at: first.ts,
                       updated_at: first.ts }
            }
            other => {
                return Err(OrchestrationError::replay(format!("first event of instance {instance_id} is {}, expected instanceaccepted",
                                                              other.type_name())))
            }
        };
        for ev in rest {
            snap.apply(ev)?;
        }
        Ok(snap)
    }

    fn apply(&mut self, ev: &InstanceEvent) -> Result<(), OrchestrationError> {
        if self.result.is_some() {
            return Err(OrchestrationError::replay(format!("event seq={} follows the terminal result", ev.seq)));
        }
        match &ev.kind {
            InstanceEventKind::InstanceAccepted { .. } => {
                return Err(OrchestrationError::replay(format!("duplicate acceptance at seq={}", ev.seq)));
            }
            InstanceEventKind::StepStarted { step_index, step } => {
                let slot = self.expect_slot(*step_index, step, ev.seq)?;
                if matches!(slot.status, StepStatus::Failed) {
                    return Err(OrchestrationError::replay(format!("step '{step}' restarted after failing")));
                }
                slot.status = StepStatus::Running;
                slot.started_at = Some(ev.ts);
                slot.attempts += 1;
            }
            InstanceEventKind::StepCompleted { step_index,
                                               step,
                                               message,
                                               outputs, } => {
                let slot = self.expect_running(*step_index, step, ev.seq)?;
                slot.status = StepStatus::Completed;
                slot.message = Some(message.clone());
                slot.finished_at = Some(ev.ts);
                self.state
                    .merge(outputs)
                    .map_err(|c| OrchestrationError::replay(format!("step '{step}' output conflicts: {c}")))?;
                self.next_step_index += 1;
                self.last_completed_step = Some(step.clone());
            }
            InstanceEventKind::StepFailed { step_index, step, error } => {
                let slot = self.expect_running(*step_index, step, ev.seq)?;
                slot.status = StepStatus::Failed;
                slot.message = Some(error.to_string());
                slot.finished_at = Some(ev.ts);
                self.failure = Some(error.clone());
            }
            InstanceEventKind::InstanceCompleted { result } => {
                self.result = Some(result.clone());
            }
        }
        self.status = StatusLabel::after(&ev.kind, &self.status);
        self.updated_at = ev.ts;
        Ok(())
    }

    fn expect_slot(&mut self, index: usize, step: &str, seq: u64) -> Result<&mut StepSlot, OrchestrationError> {
        if index != self.next_step_index {
            return Err(OrchestrationError::replay(format!("event seq={seq} touches step #{index} but the next step is #{}",
                                                          self.next_step_index)));
        }
        let slot = self.slots
                       .get_mut(index)
                       .ok_or_else(|| OrchestrationError::replay(format!("step #{index} is out of range")))?;
        if slot.step != step {
            return Err(OrchestrationError::replay(format!("step #{index} recorded as '{step}', expected '{}'",
                                                          slot.step)));
        }
        Ok(slot)
    }

    fn expect_running(&mut self, index: usize, step: &str, seq: u64) -> Result<&mut StepSlot, OrchestrationError> {
        let slot = self.expect_slot(index, step, seq)?;
        if !matches!(slot.status, StepStatus::Running) {
            return Err(OrchestrationError::replay(format!("step '{step}' finished at seq={seq} without starting")));
        }
        Ok(slot)
    }

    /// `true` si algún paso llegó a empezar (la preflight ya no aplica).
    pub fn any_step_started(&self) -> bool {
        self.slots.iter().any(|s| s.attempts > 0)
    }

    /// Paso en vuelo (empezado sin terminar), si lo hay.
    pub fn in_flight(&self) -> Option<usize> {
        self.slots.iter().position(|s| matches!(s.status, StepStatus::Running))
    }

    /// Fallo de paso registrado (puede no tener aún resultado terminal si el
    /// proceso cayó entre ambos appends).
    pub fn recorded_failure(&self) -> Option<&OrchestrationError> {
        self.failure.as_ref()
    }

    pub fn is_terminal(&self) -> bool {
        self.result.is_some()
    }

    pub fn checkpoint(&self) -> OrchestrationCheckpoint {
        OrchestrationCheckpoint { instance_id: self.instance_id,
                                  last_completed_step: self.last_completed_step.clone(),
                                  next_step_index: self.next_step_index,
                                  state: self.state.clone(),
                                  status: self.status.clone(),
                                  updated_at: self.updated_at }
    }

    /// Verifica que el checkpoint pertenece a `plan` y que el siguiente paso
    /// tiene todas sus entradas. Un checkpoint ajeno o corrupto es fatal.
    pub fn verify_against(&self, plan: &PlanDefinition) -> Result<(), OrchestrationError> {
        if self.definition_hash != plan.definition_hash() {
            return Err(OrchestrationError::replay(format!("checkpoint was written by plan {} but the current plan is {}",
                                                          self.definition_hash,
                                                          plan.definition_hash())));
        }
        if self.step_names != plan.step_names() {
            return Err(OrchestrationError::replay(format!("checkpoint steps {:?} do not match the plan",
                                                          self.step_names)));
        }
        if self.result.is_some() {
            return Ok(());
        }
        if let Some(next) = plan.step(self.next_step_index) {
            if let Some(missing) = next.reads().iter().find(|k| !self.state.contains(k)) {
                return Err(OrchestrationError::replay(format!("checkpoint lacks '{missing}' required by step '{}'",
                                                              next.name())));
            }
        }
        Ok(())
    }
}
