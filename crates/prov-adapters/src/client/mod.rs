//! Provisioning API Client: interfaz consumida por los pasos.
//!
//! Precondición documentada para toda implementación: cada operación
//! `create_or_get_*` es create-or-update por nombre. Invocarla otra vez con
//! el mismo nombre converge al mismo recurso y devuelve el mismo handle. El
//! engine depende de esto para reintentar un paso que quedó en vuelo tras un
//! reinicio.

mod error;
mod simulated;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::apps::{ApplicationSpec, Transport};

pub use error::{Operation, ProvisioningError, RemoteCause};
pub use simulated::SimulatedControlPlane;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkHandles {
    pub network: String,
    pub subnet: String,
}

/// Aplicación desplegada tal como la reporta el plano de control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployedApplication {
    pub name: String,
    pub fqdn: Option<String>,
    pub transport: Transport,
    pub port: u16,
}

impl DeployedApplication {
    /// Endpoint normalizado: `<fqdn>:<port>` para TCP, FQDN a secas para el
    /// resto. `None` si la aplicación no expone FQDN.
    pub fn endpoint(&self) -> Option<String> {
        let fqdn = self.fqdn.as_deref().filter(|f| !f.is_empty())?;
        Some(match self.transport {
                 Transport::Tcp => format!("{fqdn}:{}", self.port),
                 Transport::Auto | Transport::Http => fqdn.to_string(),
             })
    }
}

#[async_trait]
pub trait ProvisioningClient: Send + Sync {
    async fn resource_group_exists(&self, name: &str) -> Result<bool, ProvisioningError>;

    async fn create_or_get_resource_group(&self, name: &str, region: &str) -> Result<String, ProvisioningError>;

    /// Red `<rg>-VNet` con una subred `<rg>-Subnet`.
    async fn create_or_get_network(&self, resource_group: &str, region: &str) -> Result<NetworkHandles, ProvisioningError>;

    async fn create_or_get_managed_environment(&self,
                                               resource_group: &str,
                                               region: &str,
                                               subnet: &str)
                                               -> Result<String, ProvisioningError>;

    async fn create_or_get_application(&self,
                                       resource_group: &str,
                                       environment: &str,
                                       spec: &ApplicationSpec)
                                       -> Result<DeployedApplication, ProvisioningError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(transport: Transport, fqdn: Option<&str>) -> DeployedApplication {
        DeployedApplication { name: "x".into(),
                              fqdn: fqdn.map(str::to_string),
                              transport,
                              port: 6379 }
    }

    #[test]
    fn tcp_endpoints_carry_the_port() {
        assert_eq!(app(Transport::Tcp, Some("redis.internal")).endpoint().as_deref(),
                   Some("redis.internal:6379"));
        assert_eq!(app(Transport::Auto, Some("web.example")).endpoint().as_deref(), Some("web.example"));
        assert_eq!(app(Transport::Auto, None).endpoint(), None);
        assert_eq!(app(Transport::Tcp, Some("")).endpoint(), None);
    }
}
