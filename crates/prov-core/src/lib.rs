//! prov-core: motor de orquestación durable y genérico.
//!
//! El core no sabe nada de nubes ni de tenants: ejecuta un `PlanDefinition`
//! (pasos ordenados con dependencias declaradas) sobre un `ParameterState`,
//! registrando cada transición en un log de eventos append-only
//! (`InstanceStore`). El checkpoint de una instancia es el replay de ese log,
//! lo que permite reanudar tras un reinicio sin re-ejecutar pasos completados.
pub mod constants;
pub mod engine;
pub mod errors;
pub mod event;
pub mod hashing;
pub mod plan;
pub mod repo;
pub mod result;
pub mod state;
pub mod status;
pub mod step;

pub use engine::Orchestrator;
pub use errors::{EngineError, OrchestrationError, PlanError, StoreError};
pub use event::{InMemoryInstanceStore, InstanceEvent, InstanceEventKind, InstanceStore};
pub use plan::{PlanBuilder, PlanDefinition, PreconditionFailure, PreflightCheck};
pub use repo::{InstanceSnapshot, OrchestrationCheckpoint, StepSlot};
pub use result::{OrchestrationResult, SuccessPayload};
pub use state::{MergeConflict, ParameterState};
pub use status::{ResultPoll, StatusChannel, StatusLabel};
pub use step::{StepDefinition, StepExecutor, StepFailure, StepInputs, StepOutputs, StepResultExt, StepRunResult,
               StepSuccess, StepStatus};
