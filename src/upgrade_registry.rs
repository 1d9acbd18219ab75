use std::collections::HashMap;
use std::sync::OnceLock;
use regex::Regex;
use thiserror::Error;
use crate::{
    schema_version::SchemaVersion,
    upgrade_step::UpgradeStep,
};

/// Registry of upgrade steps keyed by (type, from-version)
#[derive(Debug, Default)]
pub struct UpgradeRegistry {
    steps: HashMap<(String, SchemaVersion), UpgradeStep>,
    current_versions: HashMap<String, SchemaVersion>,
}

#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("Duplicate upgrade step for {type_name} from version {from_version}")]
    DuplicateStep {
        type_name: String,
        from_version: SchemaVersion,
    },

    #[error("Invalid upgrade step: {0}")]
    InvalidStep(String),
}

fn type_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("type name pattern is valid"))
}

impl UpgradeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a step to the registry
    pub fn register(&mut self, step: UpgradeStep) -> Result<(), RegistryError> {
        self.validate_step(&step)?;

        let key = (step.type_name.clone(), step.from_version);
        if self.steps.contains_key(&key) {
            return Err(RegistryError::DuplicateStep {
                type_name: step.type_name,
                from_version: step.from_version,
            });
        }

        tracing::debug!(
            type_name = %step.type_name,
            from = %step.from_version,
            to = %step.to_version,
            "registered upgrade step"
        );
        self.steps.insert(key, step);
        Ok(())
    }

    /// Declare the version records of `type_name` are expected to end at
    pub fn declare_current_version(&mut self, type_name: &str, version: SchemaVersion) {
        self.current_versions.insert(type_name.to_string(), version);
    }

    /// Step leaving `from_version` for the given type, if any
    pub fn get_step(&self, type_name: &str, from_version: SchemaVersion) -> Option<&UpgradeStep> {
        self.steps.get(&(type_name.to_string(), from_version))
    }

    /// Declared current version, or the highest version any step reaches
    pub fn current_version(&self, type_name: &str) -> Option<SchemaVersion> {
        self.current_versions.get(type_name).copied().or_else(|| {
            self.steps_for(type_name).iter().map(|step| step.to_version).max()
        })
    }

    /// All steps of a type, ordered by source version
    pub fn steps_for(&self, type_name: &str) -> Vec<&UpgradeStep> {
        let mut steps: Vec<_> = self
            .steps
            .values()
            .filter(|step| step.type_name == type_name)
            .collect();
        steps.sort_by_key(|step| step.from_version);
        steps
    }

    pub fn types(&self) -> Vec<String> {
        let mut types: Vec<String> = self
            .steps
            .keys()
            .map(|(type_name, _)| type_name.clone())
            .chain(self.current_versions.keys().cloned())
            .collect();
        types.sort();
        types.dedup();
        types
    }

    pub fn has_type(&self, type_name: &str) -> bool {
        self.current_versions.contains_key(type_name)
            || self.steps.keys().any(|(name, _)| name == type_name)
    }

    fn validate_step(&self, step: &UpgradeStep) -> Result<(), RegistryError> {
        if !type_name_pattern().is_match(&step.type_name) {
            return Err(RegistryError::InvalidStep(format!(
                "type name '{}' is not a snake_case identifier",
                step.type_name
            )));
        }

        if step.to_version <= step.from_version {
            return Err(RegistryError::InvalidStep(format!(
                "{} step must move forward, got {} -> {}",
                step.type_name, step.from_version, step.to_version
            )));
        }

        Ok(())
    }
}
