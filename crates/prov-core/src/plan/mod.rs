//! Plan Definition: secuencia ordenada de pasos con dependencias declaradas.
//!
//! El plan no tiene comportamiento propio más allá del orden y de la
//! validación de dependencias; eso permite que el engine sea genérico sobre
//! cualquier plan (el de aprovisionamiento o planes sintéticos de test).

mod builder;
mod definition;
mod preflight;

pub use builder::PlanBuilder;
pub use definition::PlanDefinition;
pub use preflight::{PreconditionFailure, PreflightCheck};
