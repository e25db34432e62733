//! Errores del core.
//!
//! - `OrchestrationError`: el tipo de fallo etiquetado que termina en el
//!   `OrchestrationResult` de una instancia. Se serializa con la etiqueta
//!   `kind` para que los clientes puedan hacer pattern matching sobre el JSON.
//! - `EngineError`: fallos de infraestructura que no pueden registrarse como
//!   resultado terminal (store caído, plan inválido, instancia desconocida).

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum OrchestrationError {
    /// Entrada del llamador o configuración del proceso inválida. Nunca se
    /// registra en el log: se rechaza antes de escribir nada.
    #[serde(rename = "ValidationError")]
    #[error("validation error: {message}")]
    Validation { message: String },
    /// Un recurso con el nombre del tenant ya existe.
    #[serde(rename = "PreconditionError")]
    #[error("precondition error: {message}")]
    Precondition { message: String },
    /// Un paso reportó fallo; `causes` es la cadena completa de causas, de la
    /// más externa a la más interna.
    #[serde(rename = "StepExecutionError")]
    #[error("step '{step}' failed: {message}")]
    StepExecution {
        step: String,
        message: String,
        causes: Vec<String>,
    },
    /// El checkpoint persistido no encaja con el plan (log corrupto o ajeno).
    #[serde(rename = "ReplayInconsistencyError")]
    #[error("replay inconsistency: {message}")]
    ReplayInconsistency { message: String },
}

impl OrchestrationError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into() }
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition { message: message.into() }
    }

    pub fn replay(message: impl Into<String>) -> Self {
        Self::ReplayInconsistency { message: message.into() }
    }

    /// Nombre estable del tipo de error (igual a la etiqueta `kind` del JSON).
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "ValidationError",
            Self::Precondition { .. } => "PreconditionError",
            Self::StepExecution { .. } => "StepExecutionError",
            Self::ReplayInconsistency { .. } => "ReplayInconsistencyError",
        }
    }

    /// Paso que falló, si el error es de ejecución de un paso.
    pub fn failed_step(&self) -> Option<&str> {
        match self {
            Self::StepExecution { step, .. } => Some(step),
            _ => None,
        }
    }
}

/// Errores del backend de almacenamiento de eventos.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum StoreError {
    #[error("instance {0} already exists")]
    DuplicateInstance(Uuid),
    #[error("instance {0} is terminal; no further events accepted")]
    TerminalInstance(Uuid),
    #[error("instance {0} has not been accepted")]
    NotAccepted(Uuid),
    #[error("corrupted event record: {0}")]
    Corrupted(String),
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Errores de construcción de un plan (violaciones de dependencias).
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum PlanError {
    #[error("plan has no steps")]
    Empty,
    #[error("duplicate step name '{0}'")]
    DuplicateStep(String),
    #[error("key '{key}' written by both '{first}' and '{second}'")]
    DuplicateWrite { key: String, first: String, second: String },
    #[error("step '{step}' reads '{key}', which no earlier step produces")]
    UnresolvedRead { step: String, key: String },
}

#[derive(Debug, Error)]
pub enum EngineError {
    /// Rechazo previo a cualquier escritura (validación).
    #[error("request rejected: {0}")]
    Rejected(OrchestrationError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error("unknown orchestration instance {0}")]
    UnknownInstance(Uuid),
    #[error("orchestration instance {0} already scheduled")]
    AlreadyScheduled(Uuid),
    #[error("orchestration instance {0} is already being driven in this process")]
    AlreadyRunning(Uuid),
}
