use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::{
    record::Record,
    schema_version::SchemaVersion,
    system::SystemContext,
    upgrade_registry::UpgradeRegistry,
    upgrade_step::{AppliedStep, StepError},
};

/// Walks records along the registered version chain of their type
pub struct Upgrader<'r> {
    registry: &'r UpgradeRegistry,
}

/// Result of upgrading one record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpgradeOutcome {
    pub type_name: String,
    pub source_version: SchemaVersion,
    pub final_version: SchemaVersion,
    pub applied_steps: Vec<AppliedStep>,
    pub warnings: Vec<UpgradeWarning>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UpgradeWarning {
    /// No step leaves `stopped_at`; the rest needs a manual data migration
    VersionGap {
        stopped_at: SchemaVersion,
        current: SchemaVersion,
    },
    /// No steps are registered for the type
    UnknownType(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum UpgradeError {
    #[error("Upgrade of {type_name} from {from} to {to} failed: {source}")]
    StepFailed {
        type_name: String,
        from: SchemaVersion,
        to: SchemaVersion,
        #[source]
        source: StepError,
    },
}

impl UpgradeOutcome {
    pub fn is_upgraded(&self) -> bool {
        !self.applied_steps.is_empty()
    }

    pub fn stopped_at_gap(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, UpgradeWarning::VersionGap { .. }))
    }
}

impl<'r> Upgrader<'r> {
    pub fn new(registry: &'r UpgradeRegistry) -> Self {
        Self { registry }
    }

    /// Bring `record` as far along its version chain as registered steps allow
    pub fn upgrade(
        &self,
        type_name: &str,
        record: &mut Record,
        system: &SystemContext<'_>,
    ) -> Result<UpgradeOutcome, UpgradeError> {
        self.upgrade_to(type_name, record, system, None)
    }

    /// Like `upgrade`, but never past `target` when one is given.
    ///
    /// Each step runs on a scratch copy that replaces `record` only once the
    /// step succeeds, so a failed step leaves the record at the last
    /// committed version with none of the failed step's edits.
    pub fn upgrade_to(
        &self,
        type_name: &str,
        record: &mut Record,
        system: &SystemContext<'_>,
        target: Option<SchemaVersion>,
    ) -> Result<UpgradeOutcome, UpgradeError> {
        let source_version = record.version().unwrap_or(SchemaVersion::INITIAL);
        let mut current = source_version;
        let mut applied_steps = Vec::new();
        let mut warnings = Vec::new();

        if !self.registry.has_type(type_name) {
            tracing::warn!(%type_name, "no upgrade steps registered for type");
            warnings.push(UpgradeWarning::UnknownType(type_name.to_string()));
        }

        while let Some(step) = self.registry.get_step(type_name, current) {
            if target.map_or(false, |target| step.to_version > target) {
                break;
            }

            let mut scratch = record.clone();
            step.apply(&mut scratch, system)
                .map_err(|source| UpgradeError::StepFailed {
                    type_name: type_name.to_string(),
                    from: step.from_version,
                    to: step.to_version,
                    source,
                })?;
            scratch.set_version(step.to_version);

            tracing::debug!(
                %type_name,
                from = %step.from_version,
                to = %step.to_version,
                "applied upgrade step"
            );
            applied_steps.push(AppliedStep::between(step, record, &scratch));
            *record = scratch;
            current = step.to_version;
        }

        let wanted = target.or_else(|| self.registry.current_version(type_name));
        if let Some(wanted) = wanted {
            if current < wanted {
                tracing::warn!(
                    %type_name,
                    stopped_at = %current,
                    current = %wanted,
                    "upgrade stopped before current version"
                );
                warnings.push(UpgradeWarning::VersionGap {
                    stopped_at: current,
                    current: wanted,
                });
            }
        }

        if !applied_steps.is_empty() {
            tracing::info!(%type_name, from = %source_version, to = %current, "upgraded record");
        }

        Ok(UpgradeOutcome {
            type_name: type_name.to_string(),
            source_version,
            final_version: current,
            applied_steps,
            warnings,
        })
    }
}
