//! Implementación Postgres (Diesel) del `InstanceStore` del core.
//!
//! - Log append-only con orden total por `seq` (BIGSERIAL), sin updates ni
//!   deletes (trigger en la migración).
//! - Lectura por `instance_id` ordenada por `seq`, equivalente al backend en
//!   memoria; el replay lo hace el core sobre los eventos leídos.
//! - Reglas de append (aceptación única, nada tras el resultado) verificadas
//!   dentro de la misma transacción del insert y respaldadas por índices
//!   únicos parciales.
//! - Diesel es bloqueante: cada operación corre en `spawn_blocking` con
//!   reintento y backoff ante errores transitorios.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager};
use log::{debug, warn};
use prov_core::{InstanceEvent, InstanceEventKind, InstanceStore, StoreError};
use serde_json::Value;
use uuid::Uuid;

use crate::error::PersistenceError;
use crate::migrations::run_pending_migrations;
use crate::schema::instance_events;

/// Pool r2d2 de conexiones Postgres. Al construirlo se corren las
/// migraciones pendientes una sola vez.
pub type PgPool = r2d2::Pool<ConnectionManager<PgConnection>>;

type PgPooled = r2d2::PooledConnection<ConnectionManager<PgConnection>>;

/// Proveedor abstracto de conexiones (pool real o doble de test).
pub trait ConnectionProvider: Send + Sync + 'static {
    fn connection(&self) -> Result<PgPooled, PersistenceError>;
}

pub struct PoolProvider {
    pub pool: PgPool,
}

impl ConnectionProvider for PoolProvider {
    fn connection(&self) -> Result<PgPooled, PersistenceError> {
        self.pool
            .get()
            .map_err(|e| PersistenceError::TransientIo(format!("pool error: {e}")))
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = instance_events)]
struct NewEventRow<'a> {
    instance_id: &'a Uuid,
    event_type: &'a str,
    payload: &'a Value,
}

/// Fila de `instance_events`. `payload` es el JSON completo de
/// `InstanceEventKind`; `event_type` es la pista en minúsculas.
#[derive(Queryable, Debug)]
pub struct EventRow {
    pub seq: i64,
    pub instance_id: Uuid,
    pub ts: DateTime<Utc>,
    pub event_type: String,
    pub payload: Value,
}

impl EventRow {
    fn into_event(self) -> Result<InstanceEvent, PersistenceError> {
        let kind: InstanceEventKind = serde_json::from_value(self.payload).map_err(|e| {
                                          PersistenceError::Payload(format!("seq={} type={}: {e}",
                                                                            self.seq, self.event_type))
                                      })?;
        Ok(InstanceEvent { seq: self.seq as u64,
                           instance_id: self.instance_id,
                           kind,
                           ts: self.ts })
    }
}

/// Reintento con backoff corto (3 intentos: 15ms, 30ms, 45ms).
fn with_retry<F, T>(mut f: F) -> Result<T, PersistenceError>
    where F: FnMut() -> Result<T, PersistenceError>
{
    let mut attempts = 0;
    loop {
        match f() {
            Err(e) if e.is_retryable() && attempts < 3 => {
                let delay_ms = 15 * ((attempts + 1) as u64);
                warn!("retryable error (attempt {}): {e} -> sleeping {delay_ms}ms", attempts + 1);
                std::thread::sleep(std::time::Duration::from_millis(delay_ms));
                attempts += 1;
            }
            r => return r,
        }
    }
}

/// Regla de append evaluada sobre los tipos ya persistidos de la instancia.
fn append_rule(instance_id: Uuid, existing: &[String], kind: &InstanceEventKind) -> Result<(), StoreError> {
    let accepting = matches!(kind, InstanceEventKind::InstanceAccepted { .. });
    if existing.is_empty() {
        return if accepting { Ok(()) } else { Err(StoreError::NotAccepted(instance_id)) };
    }
    if accepting {
        return Err(StoreError::DuplicateInstance(instance_id));
    }
    if existing.iter().any(|t| t == "instancecompleted") {
        return Err(StoreError::TerminalInstance(instance_id));
    }
    Ok(())
}

/// `InstanceStore` durable sobre Postgres.
pub struct PgInstanceStore<P: ConnectionProvider> {
    provider: Arc<P>,
}

impl<P: ConnectionProvider> PgInstanceStore<P> {
    pub fn new(provider: P) -> Self {
        Self { provider: Arc::new(provider) }
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, StoreError>
        where T: Send + 'static,
              F: FnOnce(&P) -> Result<T, StoreError> + Send + 'static
    {
        let provider = self.provider.clone();
        tokio::task::spawn_blocking(move || f(provider.as_ref())).await
                                                          .map_err(|e| StoreError::Backend(format!("blocking task: {e}")))?
    }
}

impl PgInstanceStore<PoolProvider> {
    pub fn from_pool(pool: PgPool) -> Self {
        Self::new(PoolProvider { pool })
    }
}

#[async_trait]
impl<P: ConnectionProvider> InstanceStore for PgInstanceStore<P> {
    async fn append(&self, instance_id: Uuid, kind: InstanceEventKind) -> Result<InstanceEvent, StoreError> {
        let event_type = kind.type_name();
        let payload = serde_json::to_value(&kind).map_err(|e| StoreError::Corrupted(format!("serialize {event_type}: {e}")))?;
        debug!("append:start instance_id={instance_id} type={event_type}");

        let checked = kind.clone();
        let inserted = self.blocking(move |provider| {
                               let outcome = with_retry(|| {
                                   let mut conn = provider.connection()?;
                                   conn.build_transaction()
                                       .read_write()
                                       .serializable()
                                       .run(|tx| {
                                           let existing: Vec<String> =
                                               instance_events::table.filter(instance_events::instance_id.eq(instance_id))
                                                                     .select(instance_events::event_type)
                                                                     .load(tx)?;
                                           if let Err(rule) = append_rule(instance_id, &existing, &checked) {
                                               return Ok(Err(rule));
                                           }
                                           let row: (i64, DateTime<Utc>) =
                                               diesel::insert_into(instance_events::table)
                                                   .values(NewEventRow { instance_id: &instance_id,
                                                                         event_type,
                                                                         payload: &payload })
                                                   .returning((instance_events::seq, instance_events::ts))
                                                   .get_result(tx)?;
                                           Ok::<_, diesel::result::Error>(Ok(row))
                                       })
                                       .map_err(PersistenceError::from)
                               });
                               match outcome {
                                   Ok(inner) => inner,
                                   // carrera entre dos escritores: la resuelven los índices parciales
                                   Err(PersistenceError::UniqueViolation(_)) if event_type == "instanceaccepted" => {
                                       Err(StoreError::DuplicateInstance(instance_id))
                                   }
                                   Err(PersistenceError::UniqueViolation(_)) => Err(StoreError::TerminalInstance(instance_id)),
                                   Err(e) => Err(e.into()),
                               }
                           })
                           .await?;

        let ev = InstanceEvent { seq: inserted.0 as u64,
                                 instance_id,
                                 kind,
                                 ts: inserted.1 };
        debug!("append:done instance_id={instance_id} seq={} type={event_type}", ev.seq);
        Ok(ev)
    }

    async fn list(&self, instance_id: Uuid) -> Result<Vec<InstanceEvent>, StoreError> {
        debug!("list:start instance_id={instance_id}");
        let events = self.blocking(move |provider| {
                             let rows: Vec<EventRow> = with_retry(|| {
                                 let mut conn = provider.connection()?;
                                 instance_events::table.filter(instance_events::instance_id.eq(instance_id))
                                                       .order(instance_events::seq.asc())
                                                       .load(&mut conn)
                                                       .map_err(PersistenceError::from)
                             })?;
                             rows.into_iter()
                                 .map(|r| r.into_event().map_err(StoreError::from))
                                 .collect::<Result<Vec<_>, _>>()
                         })
                         .await?;
        debug!("list:done instance_id={instance_id} count={}", events.len());
        Ok(events)
    }

    async fn instances(&self) -> Result<Vec<Uuid>, StoreError> {
        self.blocking(|provider| {
                let ids: Vec<Uuid> = with_retry(|| {
                    let mut conn = provider.connection()?;
                    instance_events::table.filter(instance_events::event_type.eq("instanceaccepted"))
                                          .order(instance_events::seq.asc())
                                          .select(instance_events::instance_id)
                                          .load(&mut conn)
                                          .map_err(PersistenceError::from)
                })?;
                Ok(ids)
            })
            .await
    }
}

/// Construye un pool Postgres r2d2 y corre las migraciones pendientes.
///
/// Si `min_size > max_size` se usa `min_size = max_size`; tamaños 0 se
/// elevan a 1.
pub fn build_pool(database_url: &str, min_size: u32, max_size: u32) -> Result<PgPool, PersistenceError> {
    let validated_min = min_size.max(1);
    let validated_max = max_size.max(1);
    if validated_min > validated_max {
        warn!("min_size > max_size ({validated_min} > {validated_max}), ajustando min=max");
    }
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = r2d2::Pool::builder().min_idle(Some(validated_min.min(validated_max)))
                                    .max_size(validated_max)
                                    .build(manager)
                                    .map_err(|e| PersistenceError::TransientIo(format!("pool build: {e}")))?;
    {
        let mut conn = pool.get()
                           .map_err(|e| PersistenceError::TransientIo(format!("pool get for migrations: {e}")))?;
        run_pending_migrations(&mut conn)?;
    }
    Ok(pool)
}
