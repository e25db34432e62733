//! `OrchestrationResult`: salida terminal de una instancia.
//!
//! Se escribe exactamente una vez (evento `InstanceCompleted`) y es inmutable.
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::errors::OrchestrationError;
use crate::state::ParameterState;

/// Payload de éxito: campos base más todos los handles acumulados.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessPayload {
    pub tenant: String,
    pub region: String,
    pub outputs: IndexMap<String, String>,
}

impl SuccessPayload {
    pub fn from_state(state: &ParameterState) -> Self {
        Self { tenant: state.tenant.clone(),
               region: state.region.clone(),
               outputs: state.handles().clone() }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.outputs.get(key).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome")]
pub enum OrchestrationResult {
    Succeeded { payload: SuccessPayload },
    Failed { error: OrchestrationError },
}

impl OrchestrationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    pub fn payload(&self) -> Option<&SuccessPayload> {
        match self {
            Self::Succeeded { payload } => Some(payload),
            Self::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&OrchestrationError> {
        match self {
            Self::Succeeded { .. } => None,
            Self::Failed { error } => Some(error),
        }
    }
}
