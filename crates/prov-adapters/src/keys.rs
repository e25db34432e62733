//! Claves de `ParameterState` que produce el plan de aprovisionamiento.

pub const RESOURCE_GROUP: &str = "resource_group";
pub const VIRTUAL_NETWORK: &str = "virtual_network";
pub const SUBNET: &str = "subnet";
pub const MANAGED_ENVIRONMENT: &str = "managed_environment";
pub const CACHE_ENDPOINT: &str = "cache_endpoint";
pub const DATABASE_ENDPOINT: &str = "database_endpoint";
pub const WEB_ENDPOINT: &str = "web_endpoint";
