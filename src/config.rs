//! Configuración central del proceso.
//!
//! Carga variables de entorno (.env una sola vez) y expone `AppConfig`, una
//! estructura inmutable que se inyecta en el servicio. Los pasos nunca leen
//! el entorno directamente.
use std::env;
use std::fmt;
use std::net::SocketAddr;

use once_cell::sync::Lazy;
use prov_adapters::naming::DEFAULT_REGION;
use prov_adapters::DeploymentSettings;
use prov_core::OrchestrationError;
use prov_persistence::DbConfig;

use crate::errors::AppError;

pub const DEFAULT_BIND: &str = "0.0.0.0:7071";

static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenvy::dotenv();
});

/// Configuración global de la aplicación, fija durante la vida del proceso.
#[derive(Clone)]
pub struct AppConfig {
    /// Identificador de la suscripción (obligatorio para aceptar peticiones).
    pub subscription_id: Option<String>,
    /// Credencial de la base de datos desplegada. Nunca aparece en `Debug`.
    db_password: Option<String>,
    pub default_region: String,
    pub bind_addr: SocketAddr,
    /// Store durable; `None` usa el store en memoria.
    pub database: Option<DbConfig>,
    /// Base para construir las URLs de polling.
    pub public_url: Option<String>,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
         .field("subscription_id", &self.subscription_id)
         .field("db_password", &self.db_password.as_ref().map(|_| "<redacted>"))
         .field("default_region", &self.default_region)
         .field("bind_addr", &self.bind_addr)
         .field("database", &self.database.as_ref().map(|d| (d.min_connections, d.max_connections)))
         .field("public_url", &self.public_url)
         .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Lazy::force(&DOTENV_LOADED);
        Self::from_lookup(|k| env::var(k).ok())
    }

    /// Igual que `from_env` pero con una fuente de variables arbitraria.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
        where F: Fn(&str) -> Option<String>
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind = get("PROVFLOW_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind_addr = bind.parse()
                            .map_err(|e| AppError::Config(format!("PROVFLOW_BIND '{bind}' is not a socket address: {e}")))?;
        let database = match get("DATABASE_URL") {
            Some(_) => Some(DbConfig::from_lookup(&lookup).map_err(|e| AppError::Config(e.to_string()))?),
            None => None,
        };

        Ok(Self { subscription_id: get("SUBSCRIPTION_ID"),
                  db_password: get("DB_PASSWORD"),
                  default_region: get("DEFAULT_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
                  bind_addr,
                  database,
                  public_url: get("PROVFLOW_PUBLIC_URL").map(|u| u.trim_end_matches('/').to_string()) })
    }

    /// Suscripción y credencial deben estar presentes antes de aceptar una
    /// petición o reanudar una instancia.
    pub fn require_provisioning(&self) -> Result<&str, OrchestrationError> {
        let subscription = self.subscription_id
                               .as_deref()
                               .ok_or_else(|| OrchestrationError::validation("SUBSCRIPTION_ID is not set"))?;
        if self.db_password.is_none() {
            return Err(OrchestrationError::validation("DB_PASSWORD is not set"));
        }
        Ok(subscription)
    }

    /// Ajustes de despliegue inyectados en el plan. Sin `DB_PASSWORD` el plan
    /// se arma igual (el hash no depende del secreto) pero ninguna petición
    /// pasa `require_provisioning`.
    pub fn deployment_settings(&self) -> DeploymentSettings {
        DeploymentSettings::new(self.db_password.clone().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.default_region, "JapanEast");
        assert_eq!(cfg.bind_addr.port(), 7071);
        assert!(cfg.database.is_none());
        assert!(cfg.require_provisioning().is_err());
    }

    #[test]
    fn required_keys_and_database_are_read() {
        let cfg = AppConfig::from_lookup(lookup(&[("SUBSCRIPTION_ID", "sub-1"),
                                                  ("DB_PASSWORD", "hunter2"),
                                                  ("DEFAULT_REGION", "WestEurope"),
                                                  ("DATABASE_URL", "postgres://localhost/prov"),
                                                  ("DATABASE_MAX_CONNECTIONS", "4"),
                                                  ("PROVFLOW_PUBLIC_URL", "https://prov.example.com/")])).unwrap();
        assert_eq!(cfg.require_provisioning().unwrap(), "sub-1");
        assert_eq!(cfg.default_region, "WestEurope");
        assert_eq!(cfg.database.as_ref().map(|d| d.max_connections), Some(4));
        assert_eq!(cfg.public_url.as_deref(), Some("https://prov.example.com"));
        assert!(!format!("{cfg:?}").contains("hunter2"));
    }

    #[test]
    fn missing_password_is_a_validation_error() {
        let cfg = AppConfig::from_lookup(lookup(&[("SUBSCRIPTION_ID", "sub-1")])).unwrap();
        let err = cfg.require_provisioning().unwrap_err();
        assert_eq!(err.kind_name(), "ValidationError");
    }

    #[test]
    fn invalid_bind_is_a_config_error() {
        assert!(matches!(AppConfig::from_lookup(lookup(&[("PROVFLOW_BIND", "nope")])),
                         Err(AppError::Config(_))));
    }
}
