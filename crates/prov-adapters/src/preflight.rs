use std::sync::Arc;

use async_trait::async_trait;
use log::warn;
use prov_core::{ParameterState, PreconditionFailure, PreflightCheck};

use crate::client::ProvisioningClient;

/// El resource group del tenant no debe existir todavía: proceder
/// sobrescribiría el entorno de otro tenant.
pub struct ResourceGroupAbsent {
    client: Arc<dyn ProvisioningClient>,
}

impl ResourceGroupAbsent {
    pub fn new(client: Arc<dyn ProvisioningClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PreflightCheck for ResourceGroupAbsent {
    fn name(&self) -> &str {
        "ResourceGroupAbsent"
    }

    async fn check(&self, state: &ParameterState) -> Result<(), PreconditionFailure> {
        let tenant = &state.tenant;
        match self.client.resource_group_exists(tenant).await {
            Ok(false) => Ok(()),
            Ok(true) => Err(PreconditionFailure::new(format!("The resource group '{tenant}' has already been created. Please specify a different resource group name."))),
            Err(e) => {
                warn!("resource group lookup failed for '{tenant}': {e}");
                Err(PreconditionFailure::new(format!("could not verify that resource group '{tenant}' is free: {e}")))
            }
        }
    }
}
