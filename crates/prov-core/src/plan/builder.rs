//! Builder fluido para `PlanDefinition`.
//!
//! ```ignore
//! let plan = PlanDefinition::builder()
//!     .preflight(ResourceGroupAbsent::new(client.clone()))
//!     .step(CreateResourceGroup::new(client.clone()))
//!     .step(CreateVirtualNetwork::new(client))
//!     .build()?;
//! ```
use std::sync::Arc;

use super::definition::PlanDefinition;
use super::preflight::PreflightCheck;
use crate::errors::PlanError;
use crate::step::StepDefinition;

#[derive(Default)]
pub struct PlanBuilder {
    steps: Vec<Arc<dyn StepDefinition>>,
    preflight: Vec<Arc<dyn PreflightCheck>>,
    initial_keys: Vec<String>,
}

impl PlanBuilder {
    /// Declara una clave presente en el estado antes del primer paso.
    pub fn initial_key(mut self, key: impl Into<String>) -> Self {
        self.initial_keys.push(key.into());
        self
    }

    pub fn step<S>(mut self, step: S) -> Self
        where S: StepDefinition + 'static
    {
        self.steps.push(Arc::new(step));
        self
    }

    pub fn preflight<P>(mut self, check: P) -> Self
        where P: PreflightCheck + 'static
    {
        self.preflight.push(Arc::new(check));
        self
    }

    /// Valida dependencias y calcula el hash de la definición.
    #[inline]
    pub fn build(self) -> Result<PlanDefinition, PlanError> {
        PlanDefinition::new(self.steps, self.preflight, self.initial_keys)
    }
}
