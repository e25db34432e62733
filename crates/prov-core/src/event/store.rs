use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use log::debug;
use uuid::Uuid;

use super::{InstanceEvent, InstanceEventKind};
use crate::errors::StoreError;

/// Almacenamiento de eventos append-only, uno por instancia.
///
/// Reglas que toda implementación debe imponer:
/// - el primer evento de una instancia es `InstanceAccepted` y sólo hay uno;
/// - tras `InstanceCompleted` no se acepta ningún evento más;
/// - `append` es durable cuando retorna `Ok`.
#[async_trait]
pub trait InstanceStore: Send + Sync {
    /// Agrega un evento y devuelve el evento completo (con seq y ts).
    async fn append(&self, instance_id: Uuid, kind: InstanceEventKind) -> Result<InstanceEvent, StoreError>;

    /// Eventos de una instancia en orden ascendente de seq. Vacío si no existe.
    async fn list(&self, instance_id: Uuid) -> Result<Vec<InstanceEvent>, StoreError>;

    /// Ids de todas las instancias conocidas, en orden de aceptación.
    async fn instances(&self) -> Result<Vec<Uuid>, StoreError>;
}

/// Reglas de append compartidas por los stores.
pub fn check_append(instance_id: Uuid, existing: &[InstanceEvent], kind: &InstanceEventKind) -> Result<(), StoreError> {
    match (existing.is_empty(), kind) {
        (true, InstanceEventKind::InstanceAccepted { .. }) => Ok(()),
        (true, _) => Err(StoreError::NotAccepted(instance_id)),
        (false, InstanceEventKind::InstanceAccepted { .. }) => Err(StoreError::DuplicateInstance(instance_id)),
        (false, _) if existing.iter().any(|e| e.kind.is_terminal()) => Err(StoreError::TerminalInstance(instance_id)),
        (false, _) => Ok(()),
    }
}

#[derive(Default)]
pub struct InMemoryInstanceStore {
    inner: DashMap<Uuid, Vec<InstanceEvent>>,
    order: DashMap<Uuid, u64>,
}

impl InMemoryInstanceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InstanceStore for InMemoryInstanceStore {
    async fn append(&self, instance_id: Uuid, kind: InstanceEventKind) -> Result<InstanceEvent, StoreError> {
        let accepted = matches!(kind, InstanceEventKind::InstanceAccepted { .. });
        let ev = {
            let mut log = self.inner.entry(instance_id).or_default();
            check_append(instance_id, &log, &kind)?;
            let ev = InstanceEvent { seq: log.len() as u64,
                                     instance_id,
                                     kind,
                                     ts: Utc::now() };
            log.push(ev.clone());
            ev
        };
        if accepted {
            let position = self.order.len() as u64;
            self.order.insert(instance_id, position);
        }
        debug!("instance_id={instance_id} appended seq={} type={}", ev.seq, ev.kind.type_name());
        Ok(ev)
    }

    async fn list(&self, instance_id: Uuid) -> Result<Vec<InstanceEvent>, StoreError> {
        Ok(self.inner.get(&instance_id).map(|log| log.clone()).unwrap_or_default())
    }

    async fn instances(&self) -> Result<Vec<Uuid>, StoreError> {
        let mut ids: Vec<(u64, Uuid)> = self.order.iter().map(|e| (*e.value(), *e.key())).collect();
        ids.sort();
        Ok(ids.into_iter().map(|(_, id)| id).collect())
    }
}
