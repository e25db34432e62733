use prov_core::SuccessPayload;
use serde::{Deserialize, Serialize};

use crate::keys::{MANAGED_ENVIRONMENT, RESOURCE_GROUP, SUBNET, VIRTUAL_NETWORK, WEB_ENDPOINT};

/// Resumen devuelto al cliente cuando el plan termina con éxito.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningSummary {
    pub web_endpoint: String,
    pub resource_group: String,
    pub virtual_network: String,
    pub subnet: String,
    pub managed_environment: String,
    pub region: String,
    pub tenant: String,
}

impl ProvisioningSummary {
    /// `None` si al payload le falta alguna de las claves del plan.
    pub fn from_payload(payload: &SuccessPayload) -> Option<Self> {
        let get = |key: &str| payload.get(key).map(str::to_string);
        Some(Self { web_endpoint: get(WEB_ENDPOINT)?,
                    resource_group: get(RESOURCE_GROUP)?,
                    virtual_network: get(VIRTUAL_NETWORK)?,
                    subnet: get(SUBNET)?,
                    managed_environment: get(MANAGED_ENVIRONMENT)?,
                    region: payload.region.clone(),
                    tenant: payload.tenant.clone() })
    }
}
