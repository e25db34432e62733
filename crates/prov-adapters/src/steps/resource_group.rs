use std::sync::Arc;

use async_trait::async_trait;
use prov_core::{StepDefinition, StepFailure, StepInputs, StepResultExt, StepSuccess};

use crate::client::ProvisioningClient;
use crate::keys::RESOURCE_GROUP;

/// Crea el resource group con el nombre del tenant.
pub struct CreateResourceGroup {
    client: Arc<dyn ProvisioningClient>,
}

impl CreateResourceGroup {
    pub fn new(client: Arc<dyn ProvisioningClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StepDefinition for CreateResourceGroup {
    fn name(&self) -> &str {
        "CreateResourceGroup"
    }

    fn writes(&self) -> &[&'static str] {
        &[RESOURCE_GROUP]
    }

    async fn run(&self, inputs: &StepInputs<'_>) -> Result<StepSuccess, StepFailure> {
        let (tenant, region) = (inputs.tenant(), inputs.region());
        let rg = self.client
                     .create_or_get_resource_group(tenant, region)
                     .await
                     .with_step_context(|| format!("failed to create resource group '{tenant}'"))?;
        Ok(StepSuccess::new(format!("Resource group '{rg}' created successfully in '{region}'."))
            .with_output(RESOURCE_GROUP, rg))
    }
}
