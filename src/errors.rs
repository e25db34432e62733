//! Errores de la aplicación (binarios y front doors HTTP).
use prov_core::{EngineError, OrchestrationError, StoreError};
use prov_persistence::PersistenceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),
    /// Petición o configuración de proceso inválida; nada se escribió.
    #[error(transparent)]
    Invalid(OrchestrationError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    /// La tarea que conducía la instancia terminó sin resultado (panic o
    /// runtime apagándose).
    #[error("orchestration task failed: {0}")]
    Task(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Engine(EngineError::Store(err))
    }
}

impl From<OrchestrationError> for AppError {
    fn from(err: OrchestrationError) -> Self {
        AppError::Invalid(err)
    }
}

impl AppError {
    /// Error de validación asociado, venga directo o como rechazo del engine.
    pub fn validation(&self) -> Option<&OrchestrationError> {
        match self {
            AppError::Invalid(e) | AppError::Engine(EngineError::Rejected(e)) => Some(e),
            _ => None,
        }
    }
}
