use std::error::Error as StdError;

use serde::{Deserialize, Serialize};

use crate::state::StepOutputs;

/// Éxito de un paso: mensaje legible + salidas nombradas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepSuccess {
    pub message: String,
    pub outputs: StepOutputs,
}

impl StepSuccess {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(),
               outputs: StepOutputs::new() }
    }

    pub fn with_output(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.outputs.insert(key.into(), value.into());
        self
    }
}

/// Fallo de un paso: mensaje + cadena completa de causas (externa primero).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepFailure {
    pub message: String,
    pub causes: Vec<String>,
}

impl StepFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(),
               causes: Vec::new() }
    }

    /// Construye el fallo recorriendo `source()` hasta el final de la cadena.
    pub fn from_error(message: impl Into<String>, err: &(dyn StdError + 'static)) -> Self {
        let mut causes = vec![err.to_string()];
        let mut current = err.source();
        while let Some(cause) = current {
            causes.push(cause.to_string());
            current = cause.source();
        }
        Self { message: message.into(),
               causes }
    }

    pub fn missing_precondition(step: &str, key: &str) -> Self {
        Self::new(format!("missing precondition: step '{step}' requires '{key}', which is absent from the parameter state"))
    }
}

/// Resultado normalizado que el engine consume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepRunResult {
    Success { message: String, outputs: StepOutputs },
    Failure { failure: StepFailure },
}

impl StepRunResult {
    pub fn is_success(&self) -> bool {
        matches!(self, StepRunResult::Success { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            StepRunResult::Success { message, .. } => message,
            StepRunResult::Failure { failure } => &failure.message,
        }
    }
}

impl From<Result<StepSuccess, StepFailure>> for StepRunResult {
    fn from(res: Result<StepSuccess, StepFailure>) -> Self {
        match res {
            Ok(StepSuccess { message, outputs }) => StepRunResult::Success { message, outputs },
            Err(failure) => StepRunResult::Failure { failure },
        }
    }
}

/// Convierte errores de clientes externos en `StepFailure` conservando la
/// cadena de causas.
pub trait StepResultExt<T> {
    fn step_context(self, message: impl Into<String>) -> Result<T, StepFailure>;

    fn with_step_context<F, M>(self, f: F) -> Result<T, StepFailure>
        where F: FnOnce() -> M,
              M: Into<String>;
}

impl<T, E> StepResultExt<T> for Result<T, E> where E: StdError + 'static
{
    fn step_context(self, message: impl Into<String>) -> Result<T, StepFailure> {
        self.map_err(|e| StepFailure::from_error(message, &e))
    }

    fn with_step_context<F, M>(self, f: F) -> Result<T, StepFailure>
        where F: FnOnce() -> M,
              M: Into<String>
    {
        self.map_err(|e| StepFailure::from_error(f(), &e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thiserror::Error;

    #[derive(Debug, Error)]
    #[error("connection reset")]
    struct Inner;

    #[derive(Debug, Error)]
    #[error("remote call failed")]
    struct Outer(#[source] Inner);

    #[test]
    fn cause_chain_is_kept_in_order() {
        let res: Result<(), Outer> = Err(Outer(Inner));
        let failure = res.step_context("deploying db").unwrap_err();
        assert_eq!(failure.message, "deploying db");
        assert_eq!(failure.causes, vec!["remote call failed".to_string(), "connection reset".to_string()]);
    }

    #[test]
    fn success_converts_to_run_result() {
        let ok = StepSuccess::new("done").with_output("k", "v");
        let rr: StepRunResult = Ok(ok).into();
        assert!(rr.is_success());
        assert_eq!(rr.message(), "done");
    }
}
