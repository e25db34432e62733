//! Tipos de evento de una instancia de orquestación.
//!
//! Rol en el flujo:
//! - El `Orchestrator` emite cada transición a un `InstanceStore`
//!   append-only; cada append es una escritura durable.
//! - El checkpoint de una instancia se reconstruye por replay de estos
//!   eventos (`InstanceSnapshot::replay`), sin estructuras mutables aparte.
//! - `InstanceEventKind` es el contrato observable y estable del motor: el
//!   store Postgres lo persiste como JSONB.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::OrchestrationError;
use crate::result::OrchestrationResult;
use crate::state::{ParameterState, StepOutputs};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstanceEventKind {
    /// Petición aceptada. Invariante: primer evento de toda instancia. Fija
    /// el hash del plan con el que se aceptó y el estado inicial.
    InstanceAccepted {
        definition_hash: String,
        step_names: Vec<String>,
        initial_state: ParameterState,
    },
    /// Un paso comenzó. No implica éxito.
    StepStarted { step_index: usize, step: String },
    /// Un paso terminó y sus salidas se fusionan en el estado.
    StepCompleted {
        step_index: usize,
        step: String,
        message: String,
        outputs: StepOutputs,
    },
    /// Un paso falló (stop-on-failure). Nada se fusiona.
    StepFailed {
        step_index: usize,
        step: String,
        error: OrchestrationError,
    },
    /// Resultado terminal. A lo sumo uno por instancia; tras él el store no
    /// acepta más eventos.
    InstanceCompleted { result: OrchestrationResult },
}

impl InstanceEventKind {
    /// Nombre estable en minúsculas (columna `event_type` del store durable).
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::InstanceAccepted { .. } => "instanceaccepted",
            Self::StepStarted { .. } => "stepstarted",
            Self::StepCompleted { .. } => "stepcompleted",
            Self::StepFailed { .. } => "stepfailed",
            Self::InstanceCompleted { .. } => "instancecompleted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::InstanceCompleted { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceEvent {
    pub seq: u64, // asignado por el store (orden de append)
    pub instance_id: Uuid,
    pub kind: InstanceEventKind,
    pub ts: DateTime<Utc>,
}
