use async_trait::async_trait;

use super::executor::StepInputs;
use super::run_result::{StepFailure, StepSuccess};

/// Trait que define un Step.
///
/// `run` es el único lugar donde ocurren efectos externos. Debe ser seguro
/// invocarlo de nuevo si una ejecución anterior quedó a medias (crash antes de
/// registrar el fin del paso): las llamadas externas deben ser
/// create-or-update por nombre.
#[async_trait]
pub trait StepDefinition: Send + Sync {
    /// Identificador estable y único dentro del plan.
    fn name(&self) -> &str;

    /// Claves de `ParameterState` que el paso consume.
    fn reads(&self) -> &[&'static str] {
        &[]
    }

    /// Claves que el paso produce. Una ejecución exitosa debe producir todas
    /// y sólo éstas.
    fn writes(&self) -> &[&'static str];

    async fn run(&self, inputs: &StepInputs<'_>) -> Result<StepSuccess, StepFailure>;
}
