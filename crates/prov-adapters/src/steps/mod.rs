//! Pasos del plan de aprovisionamiento. Cada uno envuelve una sola clase de
//! efecto externo y declara las claves que lee y escribe.

mod applications;
mod environment;
mod network;
mod resource_group;

pub use applications::DeployApplications;
pub use environment::CreateManagedEnvironment;
pub use network::CreateVirtualNetwork;
pub use resource_group::CreateResourceGroup;
