//! Ensamblado del plan de aprovisionamiento.
use std::fmt;
use std::sync::Arc;

use prov_core::{PlanDefinition, PlanError};

use crate::client::ProvisioningClient;
use crate::preflight::ResourceGroupAbsent;
use crate::steps::{CreateManagedEnvironment, CreateResourceGroup, CreateVirtualNetwork, DeployApplications};

/// Configuración de despliegue inyectada en los pasos (nunca en el estado
/// persistido).
#[derive(Clone)]
pub struct DeploymentSettings {
    db_password: String,
}

impl DeploymentSettings {
    pub fn new(db_password: impl Into<String>) -> Self {
        Self { db_password: db_password.into() }
    }

    pub fn db_password(&self) -> &str {
        &self.db_password
    }
}

impl fmt::Debug for DeploymentSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeploymentSettings")
         .field("db_password", &"<redacted>")
         .finish()
    }
}

/// `CreateResourceGroup -> CreateVirtualNetwork -> CreateManagedEnvironment
/// -> DeployApplications`, con la preflight de resource group.
pub fn provisioning_plan(client: Arc<dyn ProvisioningClient>,
                         settings: DeploymentSettings)
                         -> Result<PlanDefinition, PlanError> {
    PlanDefinition::builder().preflight(ResourceGroupAbsent::new(client.clone()))
                             .step(CreateResourceGroup::new(client.clone()))
                             .step(CreateVirtualNetwork::new(client.clone()))
                             .step(CreateManagedEnvironment::new(client.clone()))
                             .step(DeployApplications::new(client, settings))
                             .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::SimulatedControlPlane;

    #[test]
    fn plan_has_the_four_steps_in_order() {
        let plan = provisioning_plan(Arc::new(SimulatedControlPlane::new()), DeploymentSettings::new("pw")).unwrap();
        assert_eq!(plan.step_names(),
                   vec!["CreateResourceGroup",
                        "CreateVirtualNetwork",
                        "CreateManagedEnvironment",
                        "DeployApplications"]);
        assert_eq!(plan.preflight().len(), 1);
    }

    #[test]
    fn plan_hash_does_not_depend_on_the_secret() {
        let cp: Arc<dyn ProvisioningClient> = Arc::new(SimulatedControlPlane::new());
        let a = provisioning_plan(cp.clone(), DeploymentSettings::new("one")).unwrap();
        let b = provisioning_plan(cp, DeploymentSettings::new("two")).unwrap();
        assert_eq!(a.definition_hash(), b.definition_hash());
        assert!(!format!("{:?}", DeploymentSettings::new("one")).contains("one"));
    }
}
