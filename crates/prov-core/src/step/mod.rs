//! Definiciones relacionadas a Steps.
//!
//! Un Step es una unidad con nombre que envuelve exactamente una clase de
//! efecto externo. Declara las claves de `ParameterState` que lee y las que
//! escribe; el engine usa esas declaraciones para validar el plan y para
//! verificar la salida de cada ejecución. Este módulo define:
//! - `StepDefinition`: interfaz usada por el engine.
//! - `StepSuccess` / `StepFailure` / `StepRunResult`: forma común del resultado.
//! - `StepExecutor` y `StepInputs`: extracción de entradas y normalización.

pub mod definition;
pub mod executor;
mod run_result;
mod status;

pub use crate::state::StepOutputs;
pub use definition::StepDefinition;
pub use executor::{StepExecutor, StepInputs};
pub use run_result::{StepFailure, StepResultExt, StepRunResult, StepSuccess};
pub use status::StepStatus;
