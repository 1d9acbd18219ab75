//! Upgrade steps for `genetic_modification` records.
//!
//! There is no 3 -> 4 or 4 -> 5 step: records stored at those versions were
//! moved by an administrative data migration, so the chain stops at 3 for them.

pub mod reagent;
pub mod steps;
pub mod technique;

use crate::{
    schema_version::SchemaVersion,
    upgrade_registry::{RegistryError, UpgradeRegistry},
    upgrade_step::{StepTransform, UpgradeStep},
};

pub use reagent::{ReagentAvailability, PLEASE_CONTACT_LAB};
pub use technique::{classify, Technique, TechniqueKind};

pub const TYPE_NAME: &str = "genetic_modification";
pub const CURRENT_VERSION: SchemaVersion = SchemaVersion::new(6);

/// Install the genetic_modification steps and declare version 6 current
pub fn register(registry: &mut UpgradeRegistry) -> Result<(), RegistryError> {
    registry.register(
        UpgradeStep::renaming(TYPE_NAME, SchemaVersion::new(1), SchemaVersion::new(2), steps::RENAMES_1_2)
            .with_description("fix modifiction_description typo"),
    )?;
    registry.register(
        UpgradeStep::renaming(TYPE_NAME, SchemaVersion::new(2), SchemaVersion::new(3), steps::RENAMES_2_3)
            .with_description("drop modification_ prefixes"),
    )?;
    registry.register(
        UpgradeStep::new(
            TYPE_NAME,
            SchemaVersion::new(5),
            SchemaVersion::new(6),
            StepTransform::Custom(steps::upgrade_5_6),
        )
        .with_description("inline modification techniques and reagent availability"),
    )?;
    registry.declare_current_version(TYPE_NAME, CURRENT_VERSION);
    Ok(())
}
