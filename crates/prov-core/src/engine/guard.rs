use std::sync::Arc;

use dashmap::DashSet;
use uuid::Uuid;

use crate::errors::EngineError;

/// Marca una instancia como conducida por este proceso mientras vive.
pub(crate) struct RunGuard {
    running: Arc<DashSet<Uuid>>,
    instance_id: Uuid,
}

impl RunGuard {
    pub(crate) fn acquire(running: &Arc<DashSet<Uuid>>, instance_id: Uuid) -> Result<Self, EngineError> {
        if !running.insert(instance_id) {
            return Err(EngineError::AlreadyRunning(instance_id));
        }
        Ok(Self { running: running.clone(),
                  instance_id })
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.running.remove(&self.instance_id);
    }
}
