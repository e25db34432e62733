use std::sync::Arc;

use async_trait::async_trait;
use prov_core::{StepDefinition, StepFailure, StepInputs, StepResultExt, StepSuccess};

use crate::client::ProvisioningClient;
use crate::keys::{MANAGED_ENVIRONMENT, RESOURCE_GROUP, SUBNET};

/// Crea el managed environment enlazado a la subred del tenant.
pub struct CreateManagedEnvironment {
    client: Arc<dyn ProvisioningClient>,
}

impl CreateManagedEnvironment {
    pub fn new(client: Arc<dyn ProvisioningClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StepDefinition for CreateManagedEnvironment {
    fn name(&self) -> &str {
        "CreateManagedEnvironment"
    }

    fn reads(&self) -> &[&'static str] {
        &[RESOURCE_GROUP, SUBNET]
    }

    fn writes(&self) -> &[&'static str] {
        &[MANAGED_ENVIRONMENT]
    }

    async fn run(&self, inputs: &StepInputs<'_>) -> Result<StepSuccess, StepFailure> {
        let rg = inputs.require(RESOURCE_GROUP)?;
        let subnet = inputs.require(SUBNET)?;
        let env = self.client
                      .create_or_get_managed_environment(rg, inputs.region(), subnet)
                      .await
                      .with_step_context(|| format!("failed to create managed environment in '{rg}'"))?;
        Ok(StepSuccess::new(format!("Managed environment '{env}' created successfully."))
            .with_output(MANAGED_ENVIRONMENT, env))
    }
}
