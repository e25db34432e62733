//! `ParameterState`: acumulador de parámetros de una instancia.
//!
//! Contiene los campos base resueltos al inicio (tenant, región,
//! suscripción) y un mapa `clave -> handle` que crece a medida que los pasos
//! terminan. El mapa sólo crece: una clave existente nunca se reescribe con
//! un valor distinto y nunca se elimina.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::errors::OrchestrationError;

/// Salidas nombradas de un paso, en el orden en que el paso las produjo.
pub type StepOutputs = IndexMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterState {
    pub tenant: String,
    pub region: String,
    pub subscription_id: String,
    #[serde(default)]
    handles: IndexMap<String, String>,
}

/// Intento de reescribir una clave existente con otro valor.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("key '{key}' already holds '{existing}', refusing '{proposed}'")]
pub struct MergeConflict {
    pub key: String,
    pub existing: String,
    pub proposed: String,
}

impl ParameterState {
    pub fn new(tenant: impl Into<String>, region: impl Into<String>, subscription_id: impl Into<String>) -> Self {
        Self { tenant: tenant.into(),
               region: region.into(),
               subscription_id: subscription_id.into(),
               handles: IndexMap::new() }
    }

    /// Siembra un handle inicial (antes de arrancar el plan).
    pub fn with_handle(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.handles.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.handles.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.handles.contains_key(key)
    }

    pub fn handles(&self) -> &IndexMap<String, String> {
        &self.handles
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Fusiona las salidas de un paso de forma atómica: si alguna clave
    /// entra en conflicto no se inserta ninguna. Re-fusionar el mismo valor
    /// es un no-op (replay idempotente).
    pub fn merge(&mut self, outputs: &StepOutputs) -> Result<(), MergeConflict> {
        for (key, proposed) in outputs {
            if let Some(existing) = self.handles.get(key) {
                if existing != proposed {
                    return Err(MergeConflict { key: key.clone(),
                                               existing: existing.clone(),
                                               proposed: proposed.clone() });
                }
            }
        }
        for (key, value) in outputs {
            self.handles.entry(key.clone()).or_insert_with(|| value.clone());
        }
        Ok(())
    }

    /// Campos base obligatorios antes de ejecutar cualquier paso.
    pub fn validate(&self) -> Result<(), OrchestrationError> {
        if self.tenant.trim().is_empty() {
            return Err(OrchestrationError::validation("tenant identifier cannot be empty"));
        }
        if self.subscription_id.trim().is_empty() {
            return Err(OrchestrationError::validation("subscription identifier is not set"));
        }
        if self.region.trim().is_empty() {
            return Err(OrchestrationError::validation("region cannot be empty"));
        }
        Ok(())
    }
}
