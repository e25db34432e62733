//! provflow
//!
//! Orquestador durable de aprovisionamiento por tenant:
//! - `config`: configuración del proceso (`AppConfig`), cargada una vez.
//! - `errors`: errores de aplicación para binarios y HTTP.
//! - `service`: el engine con las front doors asíncrona y síncrona.
//! - `http`: router axum sobre el servicio.
//!
//! El motor genérico vive en `prov-core`, el dominio en `prov-adapters` y el
//! store durable en `prov-persistence`.

pub mod config;
pub mod errors;
pub mod http;
pub mod service;

pub use config::AppConfig;
pub use errors::AppError;
pub use service::ProvisioningService;

use tracing_subscriber::EnvFilter;

/// Instala el subscriber de `tracing` (fmt + `RUST_LOG`, por defecto
/// `info`). Los registros del facade `log` de los crates de librería se
/// reenvían a través del puente `tracing-log`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
