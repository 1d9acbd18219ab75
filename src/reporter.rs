use serde::{Deserialize, Serialize};
use crate::{
    schema_version::SchemaVersion,
    upgrade_step::AppliedStep,
    upgrader::{UpgradeOutcome, UpgradeWarning},
};

/// Reporter for summarising a batch of record upgrades in various formats
pub struct UpgradeReporter {
    output_format: ReportFormat,
}

/// Available output formats for upgrade reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum ReportFormat {
    Console,
    Json,
    Yaml,
}

/// Report over every record of one batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpgradeReport {
    pub type_name: String,
    pub current_version: Option<SchemaVersion>,
    pub records: Vec<RecordReport>,
    pub summary: UpgradeSummary,
    pub recommendations: Vec<String>,
}

/// What happened to a single record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordReport {
    pub index: usize,
    pub source_version: Option<SchemaVersion>,
    pub final_version: Option<SchemaVersion>,
    pub applied_steps: Vec<AppliedStep>,
    pub warnings: Vec<UpgradeWarning>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeSummary {
    pub total_records: usize,
    pub upgraded: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub stopped_at_gap: usize,
    pub steps_applied: usize,
}

impl RecordReport {
    pub fn from_outcome(index: usize, outcome: &UpgradeOutcome) -> Self {
        Self {
            index,
            source_version: Some(outcome.source_version),
            final_version: Some(outcome.final_version),
            applied_steps: outcome.applied_steps.clone(),
            warnings: outcome.warnings.clone(),
            error: None,
        }
    }

    pub fn failed(index: usize, source_version: Option<SchemaVersion>, error: String) -> Self {
        Self {
            index,
            source_version,
            final_version: None,
            applied_steps: Vec::new(),
            warnings: Vec::new(),
            error: Some(error),
        }
    }

    fn stopped_at_gap(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, UpgradeWarning::VersionGap { .. }))
    }
}

impl UpgradeReporter {
    pub fn new() -> Self {
        Self {
            output_format: ReportFormat::Console,
        }
    }

    pub fn with_format(mut self, format: ReportFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Build the batch report from per-record results
    pub fn generate_report(
        &self,
        type_name: &str,
        current_version: Option<SchemaVersion>,
        records: Vec<RecordReport>,
    ) -> UpgradeReport {
        let summary = self.create_summary(&records);
        let recommendations = self.generate_recommendations(&summary);

        UpgradeReport {
            type_name: type_name.to_string(),
            current_version,
            records,
            summary,
            recommendations,
        }
    }

    /// Format the report according to the configured output format
    pub fn format_report(&self, report: &UpgradeReport) -> Result<String, ReportError> {
        match self.output_format {
            ReportFormat::Console => Ok(self.format_console_report(report)),
            ReportFormat::Json => self.format_json_report(report),
            ReportFormat::Yaml => self.format_yaml_report(report),
        }
    }

    fn create_summary(&self, records: &[RecordReport]) -> UpgradeSummary {
        let mut summary = UpgradeSummary {
            total_records: records.len(),
            ..UpgradeSummary::default()
        };

        for record in records {
            if record.error.is_some() {
                summary.failed += 1;
                continue;
            }
            if record.applied_steps.is_empty() {
                summary.unchanged += 1;
            } else {
                summary.upgraded += 1;
            }
            if record.stopped_at_gap() {
                summary.stopped_at_gap += 1;
            }
            summary.steps_applied += record.applied_steps.len();
        }

        summary
    }

    fn generate_recommendations(&self, summary: &UpgradeSummary) -> Vec<String> {
        let mut recommendations = Vec::new();

        if summary.failed > 0 {
            recommendations.push(
                "Fix the failed records (dangling references or malformed fields) and rerun against the original data".to_string()
            );
        }

        if summary.stopped_at_gap > 0 {
            recommendations.push(
                "Records stopped below the current version need a manual data migration".to_string()
            );
        }

        if recommendations.is_empty() {
            recommendations.push("All records upgraded successfully".to_string());
        }

        recommendations
    }

    fn format_console_report(&self, report: &UpgradeReport) -> String {
        let mut output = String::new();

        output.push_str("=== Record Upgrade Report ===\n\n");
        output.push_str(&format!("Type: {}\n", report.type_name));
        match report.current_version {
            Some(version) => output.push_str(&format!("Current Version: {}\n\n", version)),
            None => output.push_str("Current Version: Unknown\n\n"),
        }

        let summary = &report.summary;
        output.push_str(&format!("Records: {}\n", summary.total_records));
        output.push_str(&format!("Upgraded: {}\n", summary.upgraded));
        output.push_str(&format!("Unchanged: {}\n", summary.unchanged));
        output.push_str(&format!("Stopped At Gap: {}\n", summary.stopped_at_gap));
        output.push_str(&format!("Failed: {}\n", summary.failed));

        let failures: Vec<_> = report.records.iter().filter(|r| r.error.is_some()).collect();
        if !failures.is_empty() {
            output.push_str("\nFailures:\n");
            for record in failures {
                output.push_str(&format!(
                    "  ✗ record {}: {}\n",
                    record.index,
                    record.error.as_deref().unwrap_or_default()
                ));
            }
        }

        if !report.recommendations.is_empty() {
            output.push_str("\nRecommendations:\n");
            for rec in &report.recommendations {
                output.push_str(&format!("  • {}\n", rec));
            }
        }

        output
    }

    fn format_json_report(&self, report: &UpgradeReport) -> Result<String, ReportError> {
        serde_json::to_string_pretty(report)
            .map_err(|e| ReportError::SerializationError(e.to_string()))
    }

    fn format_yaml_report(&self, report: &UpgradeReport) -> Result<String, ReportError> {
        serde_yaml::to_string(report)
            .map_err(|e| ReportError::SerializationError(e.to_string()))
    }
}

impl Default for UpgradeReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Serialization error: {0}")]
    SerializationError(String),
}
