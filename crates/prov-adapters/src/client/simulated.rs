//! Plano de control simulado en memoria.
//!
//! - Semántica create-or-update por nombre: repetir una llamada devuelve el
//!   mismo handle y no duplica recursos.
//! - FQDN deterministas derivados del entorno y la región.
//! - Inyección de fallos por operación (y opcionalmente por objetivo) con
//!   causas anidadas.
//! - Registro de llamadas para que los tests verifiquen efectos.
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use log::{debug, info, warn};
use prov_core::hashing::hash_str;

use super::error::{Operation, ProvisioningError, RemoteCause};
use super::{DeployedApplication, NetworkHandles, ProvisioningClient};
use crate::apps::ApplicationSpec;
use crate::naming::{environment_name, subnet_name, vnet_name, SUBNET_PREFIX, VNET_ADDRESS_SPACE};

#[derive(Debug, Clone)]
struct NetworkRecord {
    name: String,
    address_space: String,
    subnet: String,
    subnet_prefix: String,
}

#[derive(Debug, Clone)]
struct EnvironmentRecord {
    region: String,
    subnet: String,
}

#[derive(Debug, Clone)]
struct FailureRule {
    target: Option<String>,
    causes: Vec<String>,
}

#[derive(Default)]
pub struct SimulatedControlPlane {
    resource_groups: DashMap<String, String>,
    networks: DashMap<String, NetworkRecord>,
    environments: DashMap<(String, String), EnvironmentRecord>,
    applications: DashMap<(String, String), (ApplicationSpec, DeployedApplication)>,
    failures: DashMap<Operation, Vec<FailureRule>>,
    calls: Mutex<Vec<String>>,
    latency: Option<Duration>,
}

impl SimulatedControlPlane {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latencia artificial por llamada (simula operaciones remotas lentas).
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Registra un resource group creado fuera de este sistema.
    pub fn with_existing_resource_group(self, name: &str, region: &str) -> Self {
        self.resource_groups.insert(name.to_string(), region.to_string());
        self
    }

    /// Hace fallar `operation` (para cualquier objetivo si `target` es
    /// `None`) con la cadena de causas dada, de externa a interna.
    pub fn fail_on(&self, operation: Operation, target: Option<&str>, causes: &[&str]) {
        self.failures.entry(operation).or_default().push(FailureRule { target: target.map(str::to_string),
                                                                        causes: causes.iter()
                                                                                      .map(|c| c.to_string())
                                                                                      .collect() });
    }

    pub fn clear_failures(&self) {
        self.failures.clear();
    }

    /// Llamadas registradas como `operation:target`, en orden.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn call_count(&self, operation: Operation) -> usize {
        let prefix = format!("{operation}:");
        self.calls().iter().filter(|c| c.starts_with(&prefix)).count()
    }

    pub fn has_resource_group(&self, name: &str) -> bool {
        self.resource_groups.contains_key(name)
    }

    pub fn has_network(&self, resource_group: &str) -> bool {
        self.networks.contains_key(resource_group)
    }

    pub fn has_environment(&self, resource_group: &str, name: &str) -> bool {
        self.environments.contains_key(&(resource_group.to_string(), name.to_string()))
    }

    pub fn deployed(&self, resource_group: &str, app: &str) -> Option<ApplicationSpec> {
        self.applications
            .get(&(resource_group.to_string(), app.to_string()))
            .map(|e| e.value().0.clone())
    }

    /// Cantidad de aplicaciones desplegadas en un resource group.
    pub fn application_count(&self, resource_group: &str) -> usize {
        self.applications.iter().filter(|e| e.key().0 == resource_group).count()
    }

    async fn enter(&self, operation: Operation, target: &str) -> Result<(), ProvisioningError> {
        self.calls
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(format!("{operation}:{target}"));
        debug!("simulated control plane: {operation} target={target}");
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let injected = self.failures.get(&operation).and_then(|rules| {
                                                        rules.iter()
                                                             .find(|r| r.target.as_deref().map_or(true, |t| t == target))
                                                             .cloned()
                                                    });
        if let Some(rule) = injected {
            warn!("simulated control plane: injected failure {operation} target={target}");
            let cause = RemoteCause::chain(rule.causes.clone()).unwrap_or_else(|| RemoteCause { message:
                                                                                                "injected failure".into(),
                                                                                            inner: None });
            return Err(ProvisioningError::Remote { operation,
                                                   target: target.to_string(),
                                                   cause });
        }
        Ok(())
    }

    fn require_resource_group(&self, name: &str) -> Result<(), ProvisioningError> {
        if self.resource_groups.contains_key(name) {
            Ok(())
        } else {
            Err(ProvisioningError::ResourceGroupMissing(name.to_string()))
        }
    }

    fn fqdn(app: &str, environment: &str, region: &str, external: bool) -> String {
        let hash = hash_str(environment);
        let slug = &hash[..8];
        let region = region.to_lowercase();
        if external {
            format!("{app}.{slug}.{region}.azurecontainerapps.io")
        } else {
            format!("{app}.internal.{slug}.{region}.azurecontainerapps.io")
        }
    }
}

#[async_trait]
impl ProvisioningClient for SimulatedControlPlane {
    async fn resource_group_exists(&self, name: &str) -> Result<bool, ProvisioningError> {
        self.enter(Operation::ResourceGroupExists, name).await?;
        Ok(self.resource_groups.contains_key(name))
    }

    async fn create_or_get_resource_group(&self, name: &str, region: &str) -> Result<String, ProvisioningError> {
        self.enter(Operation::CreateResourceGroup, name).await?;
        self.resource_groups
            .entry(name.to_string())
            .or_insert_with(|| region.to_string());
        info!("resource group '{name}' ready in '{region}'");
        Ok(name.to_string())
    }

    async fn create_or_get_network(&self, resource_group: &str, _region: &str) -> Result<NetworkHandles, ProvisioningError> {
        self.enter(Operation::CreateNetwork, resource_group).await?;
        self.require_resource_group(resource_group)?;
        let record = self.networks
                         .entry(resource_group.to_string())
                         .or_insert_with(|| NetworkRecord { name: vnet_name(resource_group),
                                                            address_space: VNET_ADDRESS_SPACE.into(),
                                                            subnet: subnet_name(resource_group),
                                                            subnet_prefix: SUBNET_PREFIX.into() })
                         .clone();
        info!("virtual network '{}' ({}) with subnet '{}' ({}) ready",
              record.name, record.address_space, record.subnet, record.subnet_prefix);
        Ok(NetworkHandles { network: record.name,
                            subnet: record.subnet })
    }

    async fn create_or_get_managed_environment(&self,
                                               resource_group: &str,
                                               region: &str,
                                               subnet: &str)
                                               -> Result<String, ProvisioningError> {
        self.enter(Operation::CreateManagedEnvironment, resource_group).await?;
        self.require_resource_group(resource_group)?;
        let bound = self.networks
                        .get(resource_group)
                        .map(|n| n.subnet == subnet)
                        .unwrap_or(false);
        if !bound {
            return Err(ProvisioningError::NotFound { kind: "subnet",
                                                     name: subnet.to_string(),
                                                     resource_group: resource_group.to_string() });
        }
        let name = environment_name(resource_group);
        self.environments
            .entry((resource_group.to_string(), name.clone()))
            .or_insert_with(|| EnvironmentRecord { region: region.to_string(),
                                                   subnet: subnet.to_string() });
        info!("managed environment '{name}' ready");
        Ok(name)
    }

    async fn create_or_get_application(&self,
                                       resource_group: &str,
                                       environment: &str,
                                       spec: &ApplicationSpec)
                                       -> Result<DeployedApplication, ProvisioningError> {
        self.enter(Operation::CreateApplication, &spec.name).await?;
        self.require_resource_group(resource_group)?;
        let env = self.environments
                      .get(&(resource_group.to_string(), environment.to_string()))
                      .map(|e| e.value().clone())
                      .ok_or_else(|| ProvisioningError::NotFound { kind: "managed environment",
                                                                   name: environment.to_string(),
                                                                   resource_group: resource_group.to_string() })?;
        debug!("app '{}' bound to subnet '{}'", spec.name, env.subnet);
        let deployed = DeployedApplication { name: spec.name.clone(),
                                             fqdn: Some(Self::fqdn(&spec.name, environment, &env.region,
                                                                   spec.ingress.external)),
                                             transport: spec.ingress.transport,
                                             port: spec.ingress.port() };
        // create-or-update: la última especificación gana, el endpoint no cambia
        self.applications
            .insert((resource_group.to_string(), spec.name.clone()), (spec.clone(), deployed.clone()));
        info!("container app '{}' ready fqdn={:?}", spec.name, deployed.fqdn);
        Ok(deployed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apps::cache_app;

    #[tokio::test]
    async fn create_calls_are_idempotent_by_name() {
        let cp = SimulatedControlPlane::new();
        cp.create_or_get_resource_group("acme", "JapanEast").await.unwrap();
        cp.create_or_get_resource_group("acme", "JapanEast").await.unwrap();
        let n1 = cp.create_or_get_network("acme", "JapanEast").await.unwrap();
        let n2 = cp.create_or_get_network("acme", "JapanEast").await.unwrap();
        assert_eq!(n1, n2);
        let env = cp.create_or_get_managed_environment("acme", "JapanEast", &n1.subnet).await.unwrap();
        let a1 = cp.create_or_get_application("acme", &env, &cache_app()).await.unwrap();
        let a2 = cp.create_or_get_application("acme", &env, &cache_app()).await.unwrap();
        assert_eq!(a1, a2);
        assert_eq!(cp.application_count("acme"), 1);
        assert!(a1.endpoint().unwrap().ends_with(":6379"));
    }

    #[tokio::test]
    async fn dependent_resources_require_their_parents() {
        let cp = SimulatedControlPlane::new();
        let err = cp.create_or_get_network("ghost", "JapanEast").await.unwrap_err();
        assert!(matches!(err, ProvisioningError::ResourceGroupMissing(_)));
        cp.create_or_get_resource_group("acme", "JapanEast").await.unwrap();
        let err = cp.create_or_get_managed_environment("acme", "JapanEast", "acme-Subnet").await.unwrap_err();
        assert!(matches!(err, ProvisioningError::NotFound { kind: "subnet", .. }));
    }

    #[tokio::test]
    async fn injected_failures_target_specific_calls() {
        let cp = SimulatedControlPlane::new();
        cp.fail_on(Operation::CreateResourceGroup, Some("blocked"), &["403 Forbidden", "policy denies"]);
        assert!(cp.create_or_get_resource_group("acme", "JapanEast").await.is_ok());
        let err = cp.create_or_get_resource_group("blocked", "JapanEast").await.unwrap_err();
        assert!(matches!(err, ProvisioningError::Remote { operation: Operation::CreateResourceGroup, .. }));
        cp.clear_failures();
        assert!(cp.create_or_get_resource_group("blocked", "JapanEast").await.is_ok());
        assert_eq!(cp.call_count(Operation::CreateResourceGroup), 3);
    }
}
