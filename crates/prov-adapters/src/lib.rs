//! prov-adapters: dominio de aprovisionamiento por tenant sobre el core.
//!
//! Este crate provee:
//! - `ProvisioningClient`: interfaz estrecha del plano de control remoto
//!   (create-or-get idempotente por nombre) y `SimulatedControlPlane`, una
//!   implementación en memoria con inyección de fallos.
//! - El catálogo de aplicaciones (cache, base de datos, web).
//! - Los cuatro pasos del plan y la preflight de resource group.
//! - `provisioning_plan`: ensamblado del plan validado.
//! - Modelo de petición y resumen de éxito.
//!
//! El core no conoce nada de esto: sólo ve `StepDefinition`s que leen y
//! escriben claves de `ParameterState`.

pub mod apps;
pub mod client;
pub mod keys;
pub mod naming;
pub mod plan;
pub mod preflight;
pub mod request;
pub mod steps;
pub mod summary;

pub use apps::{ApplicationSpec, EnvVar, Ingress, Transport};
pub use client::{DeployedApplication, NetworkHandles, Operation, ProvisioningClient, ProvisioningError, RemoteCause,
                 SimulatedControlPlane};
pub use plan::{provisioning_plan, DeploymentSettings};
pub use preflight::ResourceGroupAbsent;
pub use request::{ProvisioningRequest, RequestError};
pub use summary::ProvisioningSummary;
