use std::sync::Arc;

use async_trait::async_trait;
use prov_core::{StepDefinition, StepFailure, StepInputs, StepResultExt, StepSuccess};

use crate::client::ProvisioningClient;
use crate::keys::{RESOURCE_GROUP, SUBNET, VIRTUAL_NETWORK};

/// Crea la red virtual del tenant y su subred.
pub struct CreateVirtualNetwork {
    client: Arc<dyn ProvisioningClient>,
}

impl CreateVirtualNetwork {
    pub fn new(client: Arc<dyn ProvisioningClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StepDefinition for CreateVirtualNetwork {
    fn name(&self) -> &str {
        "CreateVirtualNetwork"
    }

    fn reads(&self) -> &[&'static str] {
        &[RESOURCE_GROUP]
    }

    fn writes(&self) -> &[&'static str] {
        &[VIRTUAL_NETWORK, SUBNET]
    }

    async fn run(&self, inputs: &StepInputs<'_>) -> Result<StepSuccess, StepFailure> {
        let rg = inputs.require(RESOURCE_GROUP)?;
        let handles = self.client
                          .create_or_get_network(rg, inputs.region())
                          .await
                          .with_step_context(|| format!("failed to create virtual network in '{rg}'"))?;
        let message = format!("Virtual network '{}' created successfully (subnet '{}').",
                              handles.network, handles.subnet);
        Ok(StepSuccess::new(message).with_output(VIRTUAL_NETWORK, handles.network)
                                    .with_output(SUBNET, handles.subnet))
    }
}
