//! prov-persistence
//!
//! Implementación Postgres (Diesel) del `InstanceStore` del core más
//! utilidades de conexión y migraciones.
//!
//! Módulos:
//! - `pg`: store append-only sobre la tabla `instance_events`.
//! - `migrations`: runner embebido de migraciones Diesel.
//! - `config`: carga de configuración desde .env.
//! - `schema`: tabla Diesel declarada para compilar queries.

pub mod config;
pub mod error;
pub mod migrations;
pub mod pg;
pub mod schema;

pub use config::DbConfig;
pub use error::PersistenceError;
pub use pg::{build_pool, ConnectionProvider, PgInstanceStore, PgPool, PoolProvider};
