//! Orchestrator Engine.
//!
//! Conduce un `PlanDefinition` hasta producir exactamente un
//! `OrchestrationResult` por instancia, registrando cada transición en el
//! `InstanceStore`. Ver `core.rs` para el ciclo completo.

pub mod core;
mod guard;

pub use self::core::Orchestrator;
