use serde_json::{json, Value};
use crate::{
    record::{Record, RecordError},
    system::SystemContext,
    upgrade_step::StepError,
};
use super::{
    reagent::ReagentAvailability,
    technique::{gather_techniques, Technique, TechniqueKind, TECHNIQUES_FIELD},
};

/// 1 -> 2: fix the misspelled description field
pub const RENAMES_1_2: &[(&str, &str)] = &[("modifiction_description", "modification_description")];

/// 2 -> 3: drop the `modification_` prefix
pub const RENAMES_2_3: &[(&str, &str)] = &[
    ("modification_description", "description"),
    ("modification_zygocity", "zygosity"),
    ("modification_purpose", "purpose"),
    ("modification_genome_coordinates", "modified_site"),
    ("modification_treatments", "treatments"),
];

/// Technique used when none can be derived; flags the record for manual review
pub const MUTAGEN_TREATMENT: &str = "mutagen treatment";
/// Purpose used when the record never had one
pub const DEFAULT_PURPOSE: &str = "analysis";
pub const TALE_DEFAULT_PURPOSE: &str = "repression";

/// 5 -> 6: technique links become scalar technique fields on the modification
pub fn upgrade_5_6(record: &mut Record, system: &SystemContext<'_>) -> Result<(), StepError> {
    let techniques = gather_techniques(record, system)?;
    apply_techniques(record, &techniques)?;
    Ok(())
}

/// Pure half of the 5 -> 6 step, given the already resolved techniques
pub fn apply_techniques(record: &mut Record, techniques: &[Technique]) -> Result<(), RecordError> {
    record.rename("target", "modified_site_by_target_id");
    record.rename("modified_site", "modified_site_by_coordinates");

    let source = record.take_str("source")?;
    let product_id = record.take_str("product_id")?;
    if let Some(entry) = ReagentAvailability::from_source(source, product_id) {
        record.push_to_list("reagent_availability", entry.to_value())?;
    }

    if techniques.is_empty() {
        flag_mutagen_treatment(record);
    }

    for technique in techniques {
        if let Some(entry) = &technique.reagent {
            record.push_to_list("reagent_availability", entry.to_value())?;
        }

        match &technique.kind {
            TechniqueKind::Crispr { guide_rna_sequences, insert_sequence } => {
                record.insert("modification_technique", json!("CRISPR"));
                record.insert("guide_rna_sequences", guide_rna_sequences.clone());
                if let Some(insert) = insert_sequence {
                    record.insert("introduced_sequence", insert.clone());
                }
                push_aliases(record, &technique.aliases, "-CRISPR")?;

                // Tag insertions really need their construct metadata migrated by hand
                if record.get_str("purpose")? == Some("tagging") {
                    tracing::warn!("CRISPR tagging modification given default eGFP C-terminal tag");
                    record.insert(
                        "epitope_tags",
                        json!([{"name": "eGFP", "location": "C-terminal"}]),
                    );
                }
            }
            TechniqueKind::Tale { talen_platform } => {
                record.insert("modification_technique", json!("TALE"));
                if !record.contains("purpose") {
                    record.insert("purpose", json!(TALE_DEFAULT_PURPOSE));
                }

                let notes = match record.get_str("notes")? {
                    Some(notes) => format!("{}. TALEN platform: {}", notes, talen_platform),
                    None => format!("TALEN platform {}", talen_platform),
                };
                record.insert("notes", Value::String(notes));
                push_aliases(record, &technique.aliases, "-TALE")?;
            }
            TechniqueKind::Unknown => flag_mutagen_treatment(record),
        }
    }

    record.remove(TECHNIQUES_FIELD);

    if !record.contains("purpose") {
        tracing::warn!("modification without purpose defaulted to '{}'", DEFAULT_PURPOSE);
        record.insert("purpose", json!(DEFAULT_PURPOSE));
    }

    Ok(())
}

fn flag_mutagen_treatment(record: &mut Record) {
    tracing::warn!("no recognised technique; modification_technique set to '{}'", MUTAGEN_TREATMENT);
    record.insert("modification_technique", json!(MUTAGEN_TREATMENT));
}

fn push_aliases(record: &mut Record, aliases: &[String], suffix: &str) -> Result<(), RecordError> {
    for alias in aliases {
        record.push_to_list("aliases", Value::String(format!("{}{}", alias, suffix)))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::InMemoryResolver;
    use crate::upgrade_step::UpgradeStep;
    use crate::schema_version::SchemaVersion;
    use serde_json::Map;
    use uuid::Uuid;

    const CRISPR_ID: &str = "7a1c3b52-9d0e-4c4f-8a61-2f5e0d7b3c01";
    const TALE_ID: &str = "7a1c3b52-9d0e-4c4f-8a61-2f5e0d7b3c02";
    const OTHER_ID: &str = "7a1c3b52-9d0e-4c4f-8a61-2f5e0d7b3c03";

    fn resolver() -> InMemoryResolver {
        InMemoryResolver::from_value(json!({
            CRISPR_ID: {
                "guide_rna_sequences": ["GATTACA"],
                "insert_sequence": "ATG",
                "aliases": ["lab:guide-1"],
                "source": "addgene",
                "product_id": "61591"
            },
            TALE_ID: {
                "talen_platform": "v2",
                "aliases": ["lab:tale-1"],
                "source": "lab-stock"
            },
            OTHER_ID: {"description": "EMS"}
        }))
        .unwrap()
    }

    fn run(value: Value) -> Result<Map<String, Value>, StepError> {
        let resolver = resolver();
        let mut record = Record::from_value(value).unwrap();
        upgrade_5_6(&mut record, &SystemContext::new(&resolver))?;
        Ok(record.fields().clone())
    }

    #[test]
    fn test_rename_1_2() {
        let step = UpgradeStep::renaming("genetic_modification", SchemaVersion::new(1), SchemaVersion::new(2), RENAMES_1_2);
        let resolver = InMemoryResolver::new();
        let mut record = Record::from_value(json!({"modifiction_description": "x"})).unwrap();
        step.apply(&mut record, &SystemContext::new(&resolver)).unwrap();
        assert_eq!(record.into_value(), json!({"modification_description": "x"}));
    }

    #[test]
    fn test_rename_2_3() {
        let step = UpgradeStep::renaming("genetic_modification", SchemaVersion::new(2), SchemaVersion::new(3), RENAMES_2_3);
        let resolver = InMemoryResolver::new();
        let mut record = Record::from_value(json!({
            "modification_description": "d",
            "modification_zygocity": "het",
            "modification_purpose": "repression",
            "modification_genome_coordinates": [{"assembly": "GRCh38"}],
            "modification_treatments": ["t1"]
        }))
        .unwrap();
        step.apply(&mut record, &SystemContext::new(&resolver)).unwrap();
        assert_eq!(
            record.into_value(),
            json!({
                "description": "d",
                "zygosity": "het",
                "purpose": "repression",
                "modified_site": [{"assembly": "GRCh38"}],
                "treatments": ["t1"]
            })
        );
    }

    #[test]
    fn test_source_without_techniques() {
        let fields = run(json!({"source": "vendorX"})).unwrap();

        assert_eq!(
            fields.get("reagent_availability"),
            Some(&json!([{"repository": "vendorX", "identifier": "please-contact-lab"}]))
        );
        assert_eq!(fields.get("modification_technique"), Some(&json!("mutagen treatment")));
        assert_eq!(fields.get("purpose"), Some(&json!("analysis")));
        assert!(!fields.contains_key("source"));
        assert!(!fields.contains_key("product_id"));
    }

    #[test]
    fn test_empty_technique_list() {
        let fields = run(json!({"modification_techniques": [], "purpose": "repression"})).unwrap();
        assert_eq!(fields.get("modification_technique"), Some(&json!("mutagen treatment")));
        assert_eq!(fields.get("purpose"), Some(&json!("repression")));
        assert!(!fields.contains_key("modification_techniques"));
        assert!(!fields.contains_key("reagent_availability"));
    }

    #[test]
    fn test_site_renames() {
        let fields = run(json!({"target": "/targets/CTCF-human/", "modified_site": {"chromosome": "chr1"}})).unwrap();
        assert_eq!(fields.get("modified_site_by_target_id"), Some(&json!("/targets/CTCF-human/")));
        assert_eq!(fields.get("modified_site_by_coordinates"), Some(&json!({"chromosome": "chr1"})));
        assert!(!fields.contains_key("target"));
        assert!(!fields.contains_key("modified_site"));
    }

    #[test]
    fn test_crispr_tagging() {
        let fields = run(json!({
            "purpose": "tagging",
            "aliases": ["lab:gm-1"],
            "modification_techniques": [CRISPR_ID]
        }))
        .unwrap();

        assert_eq!(fields.get("modification_technique"), Some(&json!("CRISPR")));
        assert_eq!(fields.get("epitope_tags"), Some(&json!([{"name": "eGFP", "location": "C-terminal"}])));
        assert_eq!(fields.get("guide_rna_sequences"), Some(&json!(["GATTACA"])));
        assert_eq!(fields.get("introduced_sequence"), Some(&json!("ATG")));
        assert_eq!(fields.get("aliases"), Some(&json!(["lab:gm-1", "lab:guide-1-CRISPR"])));
        assert_eq!(
            fields.get("reagent_availability"),
            Some(&json!([{"repository": "addgene", "identifier": "61591"}]))
        );
        assert!(!fields.contains_key("modification_techniques"));
    }

    #[test]
    fn test_crispr_without_tagging_has_no_epitope_tags() {
        let fields = run(json!({"purpose": "repression", "modification_techniques": [CRISPR_ID]})).unwrap();
        assert!(!fields.contains_key("epitope_tags"));
    }

    #[test]
    fn test_tale_notes_and_purpose() {
        let fields = run(json!({"modification_techniques": [TALE_ID]})).unwrap();

        assert_eq!(fields.get("modification_technique"), Some(&json!("TALE")));
        assert_eq!(fields.get("notes"), Some(&json!("TALEN platform v2")));
        assert_eq!(fields.get("purpose"), Some(&json!("repression")));
        assert_eq!(fields.get("aliases"), Some(&json!(["lab:tale-1-TALE"])));
        assert_eq!(
            fields.get("reagent_availability"),
            Some(&json!([{"repository": "lab-stock", "identifier": "please-contact-lab"}]))
        );
    }

    #[test]
    fn test_tale_appends_to_existing_notes() {
        let fields = run(json!({"notes": "Made in 2015", "purpose": "analysis", "modification_techniques": [TALE_ID]})).unwrap();
        assert_eq!(fields.get("notes"), Some(&json!("Made in 2015. TALEN platform: v2")));
        assert_eq!(fields.get("purpose"), Some(&json!("analysis")));
    }

    #[test]
    fn test_unknown_technique() {
        let fields = run(json!({"purpose": "analysis", "modification_techniques": [OTHER_ID]})).unwrap();
        assert_eq!(fields.get("modification_technique"), Some(&json!("mutagen treatment")));
    }

    #[test]
    fn test_record_and_technique_reagents_are_separate_entries() {
        let fields = run(json!({
            "source": "vendorX",
            "product_id": "P-1",
            "reagent_availability": [{"repository": "old", "identifier": "0"}],
            "modification_techniques": [CRISPR_ID, TALE_ID]
        }))
        .unwrap();

        assert_eq!(
            fields.get("reagent_availability"),
            Some(&json!([
                {"repository": "old", "identifier": "0"},
                {"repository": "vendorX", "identifier": "P-1"},
                {"repository": "addgene", "identifier": "61591"},
                {"repository": "lab-stock", "identifier": "please-contact-lab"}
            ]))
        );
        // last technique wins the scalar field
        assert_eq!(fields.get("modification_technique"), Some(&json!("TALE")));
        assert_eq!(fields.get("aliases"), Some(&json!(["lab:guide-1-CRISPR", "lab:tale-1-TALE"])));
    }

    #[test]
    fn test_malformed_fields_are_errors() {
        let err = run(json!({"modification_techniques": CRISPR_ID})).unwrap_err();
        assert!(matches!(err, StepError::Record(RecordError::Malformed { .. })));

        let err = run(json!({"notes": ["n"], "modification_techniques": [TALE_ID]})).unwrap_err();
        assert!(matches!(err, StepError::Record(RecordError::Malformed { .. })));

        let err = run(json!({"aliases": "solo", "modification_techniques": [CRISPR_ID]})).unwrap_err();
        assert!(matches!(err, StepError::Record(RecordError::Malformed { .. })));
    }

    #[test]
    fn test_dangling_reference() {
        let missing = Uuid::parse_str("7a1c3b52-9d0e-4c4f-8a61-2f5e0d7b3cff").unwrap();
        let err = run(json!({"modification_techniques": [missing.to_string()]})).unwrap_err();
        assert!(matches!(err, StepError::Reference(_)));
    }
}
