//! Constantes del motor core.
//!
//! `ENGINE_VERSION` participa en el hash de la definición del plan: un cambio
//! incompatible del motor hace que los checkpoints escritos por una versión
//! anterior se detecten como ajenos al reanudar.

/// Versión lógica del motor. Mantener estable mientras el formato del log de
/// eventos y la semántica de replay no cambien.
pub const ENGINE_VERSION: &str = "P1.0";
