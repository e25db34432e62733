use serde::Serialize;

/// Estado de un Step reconstruido por replay.
///
/// Las transiciones válidas son:
/// - `Pending` -> `Running`
/// - `Running` -> `Completed`
/// - `Running` -> `Failed`
/// - `Running` -> `Running` (reintento en vuelo tras un reinicio)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
}
