use std::fmt;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::{
    record::{Record, RecordError},
    reference::ResolveError,
    schema_version::SchemaVersion,
    system::SystemContext,
};

/// Signature of a hand-written upgrade step
pub type TransformFn = fn(&mut Record, &SystemContext<'_>) -> Result<(), StepError>;

/// One edge of a type's version chain
#[derive(Debug, Clone)]
pub struct UpgradeStep {
    pub type_name: String,
    pub from_version: SchemaVersion,
    pub to_version: SchemaVersion,
    pub transform: StepTransform,
    pub description: String,
}

/// How a step changes the record
#[derive(Clone)]
pub enum StepTransform {
    /// Move each present `old` field to `new`
    Rename(Vec<FieldRename>),
    /// Arbitrary transform with access to the system context
    Custom(TransformFn),
}

impl fmt::Debug for StepTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepTransform::Rename(renames) => f.debug_tuple("Rename").field(renames).finish(),
            StepTransform::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRename {
    pub old_name: String,
    pub new_name: String,
}

impl FieldRename {
    pub fn new(old_name: &str, new_name: &str) -> Self {
        Self {
            old_name: old_name.to_string(),
            new_name: new_name.to_string(),
        }
    }
}

/// Errors raised from inside a step
#[derive(Debug, Error, PartialEq)]
pub enum StepError {
    #[error(transparent)]
    Record(#[from] RecordError),

    #[error(transparent)]
    Reference(#[from] ResolveError),
}

/// Record of a committed step, for reporting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedStep {
    pub from_version: SchemaVersion,
    pub to_version: SchemaVersion,
    pub description: String,
    pub added_fields: Vec<String>,
    pub removed_fields: Vec<String>,
}

impl UpgradeStep {
    pub fn new(
        type_name: &str,
        from_version: SchemaVersion,
        to_version: SchemaVersion,
        transform: StepTransform,
    ) -> Self {
        Self {
            type_name: type_name.to_string(),
            from_version,
            to_version,
            transform,
            description: format!("{} {} -> {}", type_name, from_version, to_version),
        }
    }

    pub fn renaming(
        type_name: &str,
        from_version: SchemaVersion,
        to_version: SchemaVersion,
        pairs: &[(&str, &str)],
    ) -> Self {
        let renames = pairs.iter().map(|(old, new)| FieldRename::new(old, new)).collect();
        Self::new(type_name, from_version, to_version, StepTransform::Rename(renames))
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Run the transform against `record`. The version marker is left to the caller.
    pub fn apply(&self, record: &mut Record, system: &SystemContext<'_>) -> Result<(), StepError> {
        match &self.transform {
            StepTransform::Rename(renames) => {
                for rename in renames {
                    record.rename(&rename.old_name, &rename.new_name);
                }
                Ok(())
            }
            StepTransform::Custom(transform) => transform(record, system),
        }
    }
}

impl AppliedStep {
    /// Diff the field names of a record before and after a step
    pub fn between(step: &UpgradeStep, before: &Record, after: &Record) -> Self {
        let added_fields = after
            .field_names()
            .into_iter()
            .filter(|name| !before.contains(name))
            .collect();
        let removed_fields = before
            .field_names()
            .into_iter()
            .filter(|name| !after.contains(name))
            .collect();

        Self {
            from_version: step.from_version,
            to_version: step.to_version,
            description: step.description.clone(),
            added_fields,
            removed_fields,
        }
    }
}
