//! Definición inmutable de un plan y su validación de dependencias.
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde_json::json;

use super::builder::PlanBuilder;
use super::preflight::PreflightCheck;
use crate::constants::ENGINE_VERSION;
use crate::errors::PlanError;
use crate::hashing::{hash_str, to_canonical_json};
use crate::step::StepDefinition;

/// Plan validado. Sólo existe si respeta el orden de dependencias:
/// - al menos un paso y nombres únicos,
/// - cada clave la escribe exactamente un paso,
/// - cada clave leída es inicial o la escribe un paso estrictamente anterior.
#[derive(Clone)]
pub struct PlanDefinition {
    steps: Vec<Arc<dyn StepDefinition>>,
    preflight: Vec<Arc<dyn PreflightCheck>>,
    initial_keys: Vec<String>,
    definition_hash: String,
}

impl PlanDefinition {
    pub fn builder() -> PlanBuilder {
        PlanBuilder::default()
    }

    pub fn new(steps: Vec<Arc<dyn StepDefinition>>,
               preflight: Vec<Arc<dyn PreflightCheck>>,
               initial_keys: Vec<String>)
               -> Result<Self, PlanError> {
        Self::check_dependencies(&steps, &initial_keys)?;
        let definition_hash = Self::compute_hash(&steps);
        Ok(Self { steps,
                  preflight,
                  initial_keys,
                  definition_hash })
    }

    fn check_dependencies(steps: &[Arc<dyn StepDefinition>], initial_keys: &[String]) -> Result<(), PlanError> {
        if steps.is_empty() {
            return Err(PlanError::Empty);
        }

        let mut names: HashSet<&str> = HashSet::new();
        let mut writers: HashMap<&str, &str> = HashMap::new();
        let mut available: HashSet<&str> = initial_keys.iter().map(String::as_str).collect();

        for step in steps {
            let name = step.name();
            if !names.insert(name) {
                return Err(PlanError::DuplicateStep(name.to_string()));
            }
            for key in step.reads() {
                if !available.contains(*key) {
                    return Err(PlanError::UnresolvedRead { step: name.to_string(),
                                                           key: key.to_string() });
                }
            }
            for key in step.writes() {
                let first = if initial_keys.iter().any(|k| k.as_str() == *key) {
                    Some("<initial>")
                } else {
                    writers.insert(*key, name)
                };
                if let Some(first) = first {
                    return Err(PlanError::DuplicateWrite { key: key.to_string(),
                                                           first: first.to_string(),
                                                           second: name.to_string() });
                }
                available.insert(*key);
            }
        }
        Ok(())
    }

    fn compute_hash(steps: &[Arc<dyn StepDefinition>]) -> String {
        let shape: Vec<_> = steps.iter()
                                 .map(|s| {
                                     json!({
                                         "name": s.name(),
                                         "reads": s.reads(),
                                         "writes": s.writes(),
                                     })
                                 })
                                 .collect();
        let canonical = to_canonical_json(&json!({
                                              "engine_version": ENGINE_VERSION,
                                              "steps": shape,
                                          }));
        hash_str(&canonical)
    }

    pub fn steps(&self) -> &[Arc<dyn StepDefinition>] {
        &self.steps
    }

    pub fn step(&self, index: usize) -> Option<&dyn StepDefinition> {
        self.steps.get(index).map(|s| s.as_ref())
    }

    pub fn step_names(&self) -> Vec<String> {
        self.steps.iter().map(|s| s.name().to_string()).collect()
    }

    pub fn preflight(&self) -> &[Arc<dyn PreflightCheck>] {
        &self.preflight
    }

    pub fn initial_keys(&self) -> &[String] {
        &self.initial_keys
    }

    pub fn definition_hash(&self) -> &str {
        &self.definition_hash
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl fmt::Debug for PlanDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlanDefinition")
         .field("steps", &self.step_names())
         .field("preflight", &self.preflight.iter().map(|p| p.name()).collect::<Vec<_>>())
         .field("definition_hash", &self.definition_hash)
         .finish()
    }
}
