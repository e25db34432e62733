//! Status/Result Channel.
//!
//! Lecturas puras sobre el log de eventos: nunca escriben, nunca bloquean al
//! engine y se pueden consultar en paralelo a la ejecución. La etiqueta de
//! estado se deriva del último evento de la instancia.
use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::errors::StoreError;
use crate::event::{InstanceEvent, InstanceEventKind, InstanceStore};
use crate::repo::InstanceSnapshot;
use crate::result::OrchestrationResult;

/// Etiqueta observable del FSM de una instancia.
///
/// Orden de transición: `Pending < Begin.s0 < End.s0 < Begin.s1 < ... <
/// Succeeded | Failed`. No implementa `Ord` porque `Succeeded` y `Failed`
/// son incomparables entre sí; usar `rank`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StatusLabel {
    Unknown,
    Pending,
    Begin { step_index: usize, step: String },
    End { step_index: usize, step: String },
    Succeeded,
    Failed,
}

impl StatusLabel {
    /// Etiqueta vigente inmediatamente después de `kind`.
    pub fn after(kind: &InstanceEventKind, previous: &StatusLabel) -> StatusLabel {
        match kind {
            InstanceEventKind::InstanceAccepted { .. } => StatusLabel::Pending,
            InstanceEventKind::StepStarted { step_index, step } => StatusLabel::Begin { step_index: *step_index,
                                                                                        step: step.clone() },
            InstanceEventKind::StepCompleted { step_index, step, .. } => StatusLabel::End { step_index: *step_index,
                                                                                           step: step.clone() },
            // el fallo se hace visible con el resultado terminal
            InstanceEventKind::StepFailed { .. } => previous.clone(),
            InstanceEventKind::InstanceCompleted { result } if result.is_success() => StatusLabel::Succeeded,
            InstanceEventKind::InstanceCompleted { .. } => StatusLabel::Failed,
        }
    }

    pub fn from_events(events: &[InstanceEvent]) -> StatusLabel {
        events.iter()
              .fold(StatusLabel::Unknown, |label, ev| StatusLabel::after(&ev.kind, &label))
    }

    /// `(fase, índice de paso, sub-fase)`; mayor = más avanzado.
    pub fn rank(&self) -> (u8, usize, u8) {
        match self {
            StatusLabel::Unknown => (0, 0, 0),
            StatusLabel::Pending => (1, 0, 0),
            StatusLabel::Begin { step_index, .. } => (2, *step_index, 0),
            StatusLabel::End { step_index, .. } => (2, *step_index, 1),
            StatusLabel::Succeeded | StatusLabel::Failed => (3, 0, 0),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StatusLabel::Succeeded | StatusLabel::Failed)
    }

    /// `true` si `self` no es anterior a `other` en el orden de transición.
    pub fn is_no_earlier_than(&self, other: &StatusLabel) -> bool {
        self.rank() >= other.rank()
    }
}

impl fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusLabel::Unknown => write!(f, "Unknown"),
            StatusLabel::Pending => write!(f, "Pending"),
            StatusLabel::Begin { step, .. } => write!(f, "Begin.{step}"),
            StatusLabel::End { step, .. } => write!(f, "End.{step}"),
            StatusLabel::Succeeded => write!(f, "Succeeded"),
            StatusLabel::Failed => write!(f, "Failed"),
        }
    }
}

impl Serialize for StatusLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Respuesta de `GetResult`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultPoll {
    Unknown,
    Pending(StatusLabel),
    Ready(OrchestrationResult),
}

/// Canal de consulta de estado y resultado sobre un `InstanceStore`.
pub struct StatusChannel<S: InstanceStore> {
    store: Arc<S>,
}

impl<S: InstanceStore> Clone for StatusChannel<S> {
    fn clone(&self) -> Self {
        Self { store: self.store.clone() }
    }
}

impl<S: InstanceStore> StatusChannel<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// `GetStatus`: etiqueta actual o `Unknown` si la instancia no existe.
    pub async fn status(&self, instance_id: Uuid) -> Result<StatusLabel, StoreError> {
        let events = self.store.list(instance_id).await?;
        Ok(StatusLabel::from_events(&events))
    }

    /// `GetResult`: resultado terminal, o la etiqueta actual si aún corre.
    pub async fn result(&self, instance_id: Uuid) -> Result<ResultPoll, StoreError> {
        let events = self.store.list(instance_id).await?;
        if events.is_empty() {
            return Ok(ResultPoll::Unknown);
        }
        let stored = events.iter().rev().find_map(|e| match &e.kind {
                                            InstanceEventKind::InstanceCompleted { result } => Some(result.clone()),
                                            _ => None,
                                        });
        Ok(match stored {
               Some(result) => ResultPoll::Ready(result),
               None => ResultPoll::Pending(StatusLabel::from_events(&events)),
           })
    }

    /// Checkpoint reconstruido por replay. `None` si la instancia no existe.
    pub async fn snapshot(&self, instance_id: Uuid) -> Result<Option<InstanceSnapshot>, StoreError> {
        let events = self.store.list(instance_id).await?;
        if events.is_empty() {
            return Ok(None);
        }
        InstanceSnapshot::replay(instance_id, &events).map(Some)
                                                      .map_err(|e| StoreError::Corrupted(e.to_string()))
    }

    /// Secuencia de etiquetas observadas (sin repeticiones consecutivas).
    pub async fn trail(&self, instance_id: Uuid) -> Result<Vec<StatusLabel>, StoreError> {
        let events = self.store.list(instance_id).await?;
        let mut trail: Vec<StatusLabel> = Vec::with_capacity(events.len());
        let mut current = StatusLabel::Unknown;
        for ev in &events {
            current = StatusLabel::after(&ev.kind, &current);
            if trail.last() != Some(&current) {
                trail.push(current.clone());
            }
        }
        Ok(trail)
    }

    /// Todas las instancias conocidas con su etiqueta actual.
    pub async fn list(&self) -> Result<Vec<(Uuid, StatusLabel)>, StoreError> {
        let mut out = Vec::new();
        for id in self.store.instances().await? {
            out.push((id, self.status(id).await?));
        }
        Ok(out)
    }
}
