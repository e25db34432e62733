//! Pasos sintéticos y stores instrumentados para los tests del engine.
#![allow(dead_code)]

use std::sync::atomic::{AtomicIsize, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use prov_core::{InMemoryInstanceStore, InstanceEvent, InstanceEventKind, InstanceStore, ParameterState,
                PreconditionFailure, PreflightCheck, StepDefinition, StepFailure, StepInputs, StepSuccess, StoreError};
use uuid::Uuid;

/// Paso que escribe `<clave>=<tenant>-<clave>` para cada clave declarada y
/// cuenta sus ejecuciones.
pub struct Produce {
    pub name: &'static str,
    pub reads: &'static [&'static str],
    pub writes: &'static [&'static str],
    pub calls: Arc<AtomicUsize>,
    pub fail_with: Option<&'static str>,
    pub extra_output: Option<&'static str>,
}

impl Produce {
    pub fn new(name: &'static str, reads: &'static [&'static str], writes: &'static [&'static str]) -> Self {
        Self { name,
               reads,
               writes,
               calls: Arc::new(AtomicUsize::new(0)),
               fail_with: None,
               extra_output: None }
    }

    pub fn failing(mut self, message: &'static str) -> Self {
        self.fail_with = Some(message);
        self
    }

    pub fn leaking(mut self, key: &'static str) -> Self {
        self.extra_output = Some(key);
        self
    }

    pub fn counter(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl StepDefinition for Produce {
    fn name(&self) -> &str {
        self.name
    }

    fn reads(&self) -> &[&'static str] {
        self.reads
    }

    fn writes(&self) -> &[&'static str] {
        self.writes
    }

    async fn run(&self, inputs: &StepInputs<'_>) -> Result<StepSuccess, StepFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        for key in self.reads {
            inputs.require(key)?;
        }
        tokio::task::yield_now().await;
        if let Some(message) = self.fail_with {
            return Err(StepFailure { message: message.to_string(),
                                     causes: vec!["remote said no".into(), "socket closed".into()] });
        }
        let mut ok = StepSuccess::new(format!("{} done", self.name));
        for key in self.writes {
            ok = ok.with_output(*key, format!("{}-{key}", inputs.tenant()));
        }
        if let Some(extra) = self.extra_output {
            ok = ok.with_output(extra, "leak");
        }
        Ok(ok)
    }
}

/// Preflight que falla si el estado contiene `flag`.
pub struct RejectIf {
    pub flag: &'static str,
    pub calls: Arc<AtomicUsize>,
}

impl RejectIf {
    pub fn new(flag: &'static str) -> Self {
        Self { flag,
               calls: Arc::new(AtomicUsize::new(0)) }
    }
}

#[async_trait]
impl PreflightCheck for RejectIf {
    fn name(&self) -> &str {
        "RejectIf"
    }

    async fn check(&self, state: &ParameterState) -> Result<(), PreconditionFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if state.contains(self.flag) {
            return Err(PreconditionFailure::new(format!("'{}' is already present", self.flag)));
        }
        Ok(())
    }
}

/// Store que "cae" tras un número fijo de appends exitosos.
pub struct CrashingStore {
    pub inner: Arc<InMemoryInstanceStore>,
    remaining: AtomicIsize,
}

impl CrashingStore {
    pub fn new(inner: Arc<InMemoryInstanceStore>, appends_before_crash: isize) -> Self {
        Self { inner,
               remaining: AtomicIsize::new(appends_before_crash) }
    }
}

#[async_trait]
impl InstanceStore for CrashingStore {
    async fn append(&self, instance_id: Uuid, kind: InstanceEventKind) -> Result<InstanceEvent, StoreError> {
        if self.remaining.fetch_sub(1, Ordering::SeqCst) <= 0 {
            return Err(StoreError::Backend("simulated process crash".into()));
        }
        self.inner.append(instance_id, kind).await
    }

    async fn list(&self, instance_id: Uuid) -> Result<Vec<InstanceEvent>, StoreError> {
        self.inner.list(instance_id).await
    }

    async fn instances(&self) -> Result<Vec<Uuid>, StoreError> {
        self.inner.instances().await
    }
}

pub fn acme() -> ParameterState {
    ParameterState::new("acme", "JapanEast", "sub-123")
}

pub fn kinds(events: &[InstanceEvent]) -> Vec<&'static str> {
    events.iter().map(|e| e.kind.type_name()).collect()
}
