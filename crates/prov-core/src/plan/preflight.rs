use async_trait::async_trait;
use thiserror::Error;

use crate::state::ParameterState;

/// Violación de una precondición detectada antes del primer paso.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct PreconditionFailure {
    pub message: String,
}

impl PreconditionFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Chequeo de sólo lectura que el engine corre una única vez, antes de que
/// cualquier paso haya empezado. No debe producir efectos externos.
#[async_trait]
pub trait PreflightCheck: Send + Sync {
    fn name(&self) -> &str;

    async fn check(&self, state: &ParameterState) -> Result<(), PreconditionFailure>;
}
