//! DeployApplications: único paso compuesto.
//!
//! Despliega cache, base de datos y web en ese orden. Las salidas se
//! acumulan localmente y sólo se devuelven si las tres llamadas tuvieron
//! éxito, así un fallo intermedio nunca fusiona un conjunto parcial de
//! endpoints.
use std::sync::Arc;

use async_trait::async_trait;
use log::info;
use prov_core::{StepDefinition, StepFailure, StepInputs, StepResultExt, StepSuccess};

use crate::apps::{cache_app, database_app, web_app, ApplicationSpec};
use crate::client::ProvisioningClient;
use crate::keys::{CACHE_ENDPOINT, DATABASE_ENDPOINT, MANAGED_ENVIRONMENT, RESOURCE_GROUP, WEB_ENDPOINT};
use crate::plan::DeploymentSettings;

pub struct DeployApplications {
    client: Arc<dyn ProvisioningClient>,
    settings: DeploymentSettings,
}

impl DeployApplications {
    pub fn new(client: Arc<dyn ProvisioningClient>, settings: DeploymentSettings) -> Self {
        Self { client, settings }
    }

    async fn deploy(&self, rg: &str, env: &str, spec: &ApplicationSpec) -> Result<String, StepFailure> {
        let deployed = self.client
                           .create_or_get_application(rg, env, spec)
                           .await
                           .with_step_context(|| format!("failed to deploy container app '{}'", spec.name))?;
        let endpoint = deployed.endpoint().ok_or_else(|| {
                                              StepFailure::new(format!("container app '{}' reported no FQDN", spec.name))
                                          })?;
        info!("container app '{}' deployed endpoint={endpoint}", spec.name);
        Ok(endpoint)
    }
}

#[async_trait]
impl StepDefinition for DeployApplications {
    fn name(&self) -> &str {
        "DeployApplications"
    }

    fn reads(&self) -> &[&'static str] {
        &[RESOURCE_GROUP, MANAGED_ENVIRONMENT]
    }

    fn writes(&self) -> &[&'static str] {
        &[CACHE_ENDPOINT, DATABASE_ENDPOINT, WEB_ENDPOINT]
    }

    async fn run(&self, inputs: &StepInputs<'_>) -> Result<StepSuccess, StepFailure> {
        let rg = inputs.require(RESOURCE_GROUP)?;
        let env = inputs.require(MANAGED_ENVIRONMENT)?;
        let password = self.settings.db_password();

        let cache = self.deploy(rg, env, &cache_app()).await?;
        let database = self.deploy(rg, env, &database_app(password)).await?;
        let web = self.deploy(rg, env, &web_app(&database, &cache, password)).await?;

        Ok(StepSuccess::new("Container apps deployed successfully.").with_output(CACHE_ENDPOINT, cache)
                                                                     .with_output(DATABASE_ENDPOINT, database)
                                                                     .with_output(WEB_ENDPOINT, web))
    }
}
