//! Catálogo de aplicaciones desplegadas en el managed environment.
//!
//! Orden fijo: cache, base de datos, web. La configuración de la web depende
//! de las coordenadas de conexión de las otras dos.
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transport {
    Auto,
    Http,
    Tcp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingress {
    pub external: bool,
    pub transport: Transport,
    pub target_port: u16,
    pub exposed_port: Option<u16>,
}

impl Ingress {
    pub fn internal_tcp(port: u16) -> Self {
        Self { external: false,
               transport: Transport::Tcp,
               target_port: port,
               exposed_port: Some(port) }
    }

    pub fn external_auto(port: u16) -> Self {
        Self { external: true,
               transport: Transport::Auto,
               target_port: port,
               exposed_port: None }
    }

    /// Puerto con el que se publica el endpoint.
    pub fn port(&self) -> u16 {
        self.exposed_port.unwrap_or(self.target_port)
    }
}

/// Variable de entorno del contenedor. Los valores secretos no aparecen en
/// `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
    pub secret: bool,
}

impl EnvVar {
    pub fn plain(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(),
               value: value.into(),
               secret: false }
    }

    pub fn secret(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(),
               value: value.into(),
               secret: true }
    }
}

impl fmt::Debug for EnvVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = if self.secret { "<redacted>" } else { self.value.as_str() };
        f.debug_struct("EnvVar")
         .field("name", &self.name)
         .field("value", &value)
         .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationSpec {
    pub name: String,
    pub image: String,
    pub cpu: f64,
    pub memory: String,
    pub min_replicas: u32,
    pub max_replicas: u32,
    pub env: Vec<EnvVar>,
    pub ingress: Ingress,
}

impl ApplicationSpec {
    pub fn env_value(&self, name: &str) -> Option<&str> {
        self.env.iter().find(|e| e.name == name).map(|e| e.value.as_str())
    }
}

pub const CACHE_APP: &str = "redis";
pub const DATABASE_APP: &str = "db";
pub const WEB_APP: &str = "web";

const DATABASE_USER: &str = "postgres";

pub fn cache_app() -> ApplicationSpec {
    ApplicationSpec { name: CACHE_APP.into(),
                      image: "redis:latest".into(),
                      cpu: 0.5,
                      memory: "1Gi".into(),
                      min_replicas: 1,
                      max_replicas: 3,
                      env: Vec::new(),
                      ingress: Ingress::internal_tcp(6379) }
}

pub fn database_app(password: &str) -> ApplicationSpec {
    ApplicationSpec { name: DATABASE_APP.into(),
                      image: "postgres:16".into(),
                      cpu: 1.0,
                      memory: "2Gi".into(),
                      min_replicas: 1,
                      max_replicas: 3,
                      env: vec![EnvVar::plain("POSTGRES_USER", DATABASE_USER),
                                EnvVar::secret("POSTGRES_PASSWORD", password)],
                      ingress: Ingress::internal_tcp(5432) }
}

/// Web (TimeTracker) apuntando a la base de datos y a la cache ya
/// desplegadas. `database_endpoint` y `cache_endpoint` son `<host>:<port>`.
pub fn web_app(database_endpoint: &str, cache_endpoint: &str, password: &str) -> ApplicationSpec {
    let (db_host, db_port) = split_endpoint(database_endpoint, 5432);
    ApplicationSpec { name: WEB_APP.into(),
                      image: "densocreate/timetracker:7.0-linux-postgres".into(),
                      cpu: 0.75,
                      memory: "1.5Gi".into(),
                      min_replicas: 1,
                      max_replicas: 1,
                      env: vec![EnvVar::plain("TTNX_DB_TYPE", "postgresql"),
                                EnvVar::plain("TTNX_DB_SERVER", db_host),
                                EnvVar::plain("TTNX_DB_PORT", db_port.to_string()),
                                EnvVar::plain("TTNX_DB_USER", DATABASE_USER),
                                EnvVar::secret("TTNX_DB_PASSWORD", password),
                                EnvVar::plain("TTNX_REDIS_GLOBALCACHE", cache_endpoint),
                                EnvVar::plain("TTNX_REDIS_HANGFIRE", cache_endpoint),
                                EnvVar::plain("TTNX_REDIS_BACKGROUNDJOB", cache_endpoint)],
                      ingress: Ingress::external_auto(8080) }
}

/// `host:port` -> `(host, port)`; sin puerto válido usa `default_port`.
pub fn split_endpoint(endpoint: &str, default_port: u16) -> (&str, u16) {
    match endpoint.rsplit_once(':') {
        Some((host, port)) => match port.parse() {
            Ok(p) => (host, p),
            Err(_) => (endpoint, default_port),
        },
        None => (endpoint, default_port),
    }
}
