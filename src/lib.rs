// Versioned upgrade steps for stored metadata records
pub mod schema_version;
pub mod record;
pub mod reference;
pub mod system;
pub mod upgrade_step;
pub mod upgrade_registry;
pub mod upgrader;
pub mod reporter;
pub mod genetic_modification;

// Re-export core types for convenience
pub use schema_version::{SchemaVersion, SchemaVersionError};
pub use record::{Record, RecordError};
pub use reference::{InMemoryResolver, ReferenceResolver, ResolveError};
pub use system::SystemContext;
pub use upgrade_step::{AppliedStep, FieldRename, StepError, StepTransform, UpgradeStep};
pub use upgrade_registry::{RegistryError, UpgradeRegistry};
pub use upgrader::{UpgradeError, UpgradeOutcome, UpgradeWarning, Upgrader};
pub use reporter::{ReportFormat, RecordReport, UpgradeReport, UpgradeReporter};

/// Registry with every record type's steps installed, built once at startup
pub fn default_registry() -> Result<UpgradeRegistry, RegistryError> {
    let mut registry = UpgradeRegistry::new();
    genetic_modification::register(&mut registry)?;
    Ok(registry)
}
