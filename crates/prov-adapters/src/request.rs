//! Cuerpo de la petición de aprovisionamiento.
//!
//! Las claves se comparan sin distinguir mayúsculas ni `_`: `UserName`,
//! `userName`, `username` y `user_name` son equivalentes.
use prov_core::{OrchestrationError, ParameterState};
use serde_json::Value;
use thiserror::Error;

use crate::naming::check_resource_group_name;

pub const INVALID_USERNAME: &str = "Please provide a valid username in the request body.";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("request body is not a JSON object: {0}")]
    Malformed(String),
    #[error("Please provide a valid username in the request body.")]
    MissingUserName,
    #[error("invalid tenant identifier: {0}")]
    InvalidTenant(String),
}

impl From<RequestError> for OrchestrationError {
    fn from(err: RequestError) -> Self {
        OrchestrationError::validation(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningRequest {
    pub user_name: String,
    pub location: Option<String>,
}

fn normalize(key: &str) -> String {
    key.chars().filter(|c| *c != '_').flat_map(char::to_lowercase).collect()
}

fn field<'a>(object: &'a serde_json::Map<String, Value>, name: &str) -> Option<&'a Value> {
    object.iter().find(|(k, _)| normalize(k) == name).map(|(_, v)| v)
}

impl ProvisioningRequest {
    pub fn new(user_name: impl Into<String>, location: Option<String>) -> Self {
        Self { user_name: user_name.into(),
               location }
    }

    pub fn from_json(body: &[u8]) -> Result<Self, RequestError> {
        let value: Value = serde_json::from_slice(body).map_err(|e| RequestError::Malformed(e.to_string()))?;
        let object = value.as_object()
                          .ok_or_else(|| RequestError::Malformed("expected an object".into()))?;
        let user_name = field(object, "username").and_then(Value::as_str)
                                                 .map(str::trim)
                                                 .filter(|s| !s.is_empty())
                                                 .ok_or(RequestError::MissingUserName)?;
        let location = field(object, "location").and_then(Value::as_str)
                                                .map(str::trim)
                                                .filter(|s| !s.is_empty())
                                                .map(str::to_string);
        let request = Self::new(user_name, location);
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<(), RequestError> {
        if self.user_name.trim().is_empty() {
            return Err(RequestError::MissingUserName);
        }
        check_resource_group_name(&self.user_name).map_err(RequestError::InvalidTenant)
    }

    /// Región solicitada o la región por defecto del proceso.
    pub fn region<'a>(&'a self, default_region: &'a str) -> &'a str {
        self.location.as_deref().unwrap_or(default_region)
    }

    /// Estado inicial de la instancia: tenant, región y suscripción.
    pub fn initial_state(&self, subscription_id: &str, default_region: &str) -> ParameterState {
        ParameterState::new(self.user_name.trim(), self.region(default_region), subscription_id)
    }
}
