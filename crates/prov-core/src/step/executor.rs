//! Step Executor: adaptador uniforme entre el contrato declarado por un paso
//! y su ejecución.
//!
//! - Antes de invocar el paso verifica que todas las claves declaradas en
//!   `reads` existan (chequeo defensivo; el plan ya lo garantiza).
//! - Expone al paso sólo lo que declaró (`StepInputs::require`).
//! - Tras la ejecución exige que las salidas coincidan exactamente con
//!   `writes`; cualquier desvío convierte el éxito en fallo para que nunca se
//!   fusione un resultado parcial.

use log::{debug, info, warn};

use super::definition::StepDefinition;
use super::run_result::{StepFailure, StepRunResult};
use crate::state::ParameterState;

/// Vista de sólo lectura de `ParameterState` restringida a las claves que el
/// paso declaró.
pub struct StepInputs<'a> {
    step: &'a str,
    declared: &'a [&'static str],
    state: &'a ParameterState,
}

impl<'a> StepInputs<'a> {
    pub fn new(step: &'a str, declared: &'a [&'static str], state: &'a ParameterState) -> Self {
        Self { step,
               declared,
               state }
    }

    pub fn step(&self) -> &str {
        self.step
    }

    pub fn tenant(&self) -> &'a str {
        &self.state.tenant
    }

    pub fn region(&self) -> &'a str {
        &self.state.region
    }

    pub fn subscription_id(&self) -> &'a str {
        &self.state.subscription_id
    }

    /// Valor de una clave declarada en `reads`.
    pub fn require(&self, key: &str) -> Result<&'a str, StepFailure> {
        if !self.declared.iter().any(|d| *d == key) {
            return Err(StepFailure::new(format!("step '{}' read undeclared key '{key}'", self.step)));
        }
        self.state
            .get(key)
            .ok_or_else(|| StepFailure::missing_precondition(self.step, key))
    }
}

pub struct StepExecutor;

impl StepExecutor {
    /// Ejecuta un paso contra el estado actual y normaliza su resultado.
    pub async fn execute(step: &dyn StepDefinition, state: &ParameterState) -> StepRunResult {
        let name = step.name();
        if let Some(missing) = step.reads().iter().find(|k| !state.contains(k)) {
            warn!("step={name} missing precondition key={missing}");
            return StepRunResult::Failure { failure: StepFailure::missing_precondition(name, missing) };
        }

        info!("step={name} tenant={} begin", state.tenant);
        let inputs = StepInputs::new(name, step.reads(), state);
        let result = match step.run(&inputs).await {
            Ok(success) => match Self::check_outputs(step, &success.outputs) {
                Ok(()) => Ok(success),
                Err(failure) => Err(failure),
            },
            Err(failure) => Err(failure),
        };

        match &result {
            Ok(success) => {
                debug!("step={name} outputs={:?}", success.outputs);
                info!("step={name} tenant={} end: {}", state.tenant, success.message);
            }
            Err(failure) => {
                warn!("step={name} tenant={} failed: {} causes={:?}",
                      state.tenant, failure.message, failure.causes);
            }
        }
        result.into()
    }

    fn check_outputs(step: &dyn StepDefinition, outputs: &crate::state::StepOutputs) -> Result<(), StepFailure> {
        let writes = step.writes();
        if let Some(extra) = outputs.keys().find(|k| !writes.iter().any(|w| *w == k.as_str())) {
            return Err(StepFailure::new(format!("step '{}' produced undeclared output '{extra}'", step.name())));
        }
        if let Some(missing) = writes.iter().find(|k| !outputs.contains_key(**k)) {
            return Err(StepFailure::new(format!("step '{}' did not produce declared output '{missing}'",
                                                step.name())));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::StepSuccess;
    use async_trait::async_trait;

    struct Echo {
        out: &'static [(&'static str, &'static str)],
    }

    #[async_trait]
    impl StepDefinition for Echo {
        fn name(&self) -> &str {
            "echo"
        }
        fn reads(&self) -> &[&'static str] {
            &["in"]
        }
        fn writes(&self) -> &[&'static str] {
            &["out"]
        }
        async fn run(&self, inputs: &StepInputs<'_>) -> Result<StepSuccess, StepFailure> {
            let _ = inputs.require("in")?;
            let mut ok = StepSuccess::new("echoed");
            for (k, v) in self.out {
                ok = ok.with_output(*k, *v);
            }
            Ok(ok)
        }
    }

    fn state() -> ParameterState {
        ParameterState::new("acme", "JapanEast", "sub").with_handle("in", "x")
    }

    #[tokio::test]
    async fn missing_read_fails_before_running() {
        let st = ParameterState::new("acme", "JapanEast", "sub");
        let res = StepExecutor::execute(&Echo { out: &[("out", "1")] }, &st).await;
        match res {
            StepRunResult::Failure { failure } => assert!(failure.message.contains("missing precondition")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn undeclared_or_missing_outputs_fail_the_step() {
        let extra = StepExecutor::execute(&Echo { out: &[("out", "1"), ("rogue", "2")] }, &state()).await;
        assert!(!extra.is_success());
        let missing = StepExecutor::execute(&Echo { out: &[] }, &state()).await;
        assert!(!missing.is_success());
        let ok = StepExecutor::execute(&Echo { out: &[("out", "1")] }, &state()).await;
        assert!(ok.is_success());
    }

    #[test]
    fn inputs_refuse_undeclared_keys() {
        let st = state().with_handle("secret", "s");
        let inputs = StepInputs::new("echo", &["in"], &st);
        assert_eq!(inputs.require("in").unwrap(), "x");
        assert!(inputs.require("secret").is_err());
        assert_eq!(inputs.tenant(), "acme");
    }
}
