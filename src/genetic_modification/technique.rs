use serde_json::{Map, Value};
use uuid::Uuid;
use crate::{
    record::{string_list, Record, RecordError},
    system::SystemContext,
    upgrade_step::StepError,
};
use super::reagent::ReagentAvailability;

pub const TECHNIQUES_FIELD: &str = "modification_techniques";

/// What kind of technique a referenced record describes, by the fields it carries
#[derive(Debug, Clone, PartialEq)]
pub enum TechniqueKind {
    Crispr {
        guide_rna_sequences: Value,
        insert_sequence: Option<Value>,
    },
    Tale {
        talen_platform: String,
    },
    Unknown,
}

/// A referenced technique record reduced to what the 5 -> 6 step consumes
#[derive(Debug, Clone, PartialEq)]
pub struct Technique {
    pub kind: TechniqueKind,
    pub aliases: Vec<String>,
    pub reagent: Option<ReagentAvailability>,
}

impl TechniqueKind {
    pub fn label(&self) -> &'static str {
        match self {
            TechniqueKind::Crispr { .. } => "CRISPR",
            TechniqueKind::Tale { .. } => "TALE",
            TechniqueKind::Unknown => "mutagen treatment",
        }
    }
}

/// Classify raw technique properties. `guide_rna_sequences` wins over `talen_platform`.
pub fn classify(properties: &Map<String, Value>) -> Result<Technique, RecordError> {
    let kind = if let Some(guides) = properties.get("guide_rna_sequences") {
        TechniqueKind::Crispr {
            guide_rna_sequences: guides.clone(),
            insert_sequence: properties.get("insert_sequence").cloned(),
        }
    } else if let Some(platform) = properties.get("talen_platform") {
        let talen_platform = platform
            .as_str()
            .ok_or_else(|| RecordError::malformed("talen_platform", "a string", platform))?
            .to_string();
        TechniqueKind::Tale { talen_platform }
    } else {
        TechniqueKind::Unknown
    };

    let aliases = match properties.get("aliases") {
        Some(value) => string_list("aliases", value)?,
        None => Vec::new(),
    };

    let reagent = ReagentAvailability::from_source(
        optional_string(properties, "source")?,
        optional_string(properties, "product_id")?,
    );

    Ok(Technique { kind, aliases, reagent })
}

/// Identifiers listed under `modification_techniques`; empty when the field is absent
pub fn technique_ids(record: &Record) -> Result<Vec<Uuid>, RecordError> {
    let Some(items) = record.get_list(TECHNIQUES_FIELD)? else {
        return Ok(Vec::new());
    };

    items
        .iter()
        .map(|item| {
            item.as_str()
                .and_then(|raw| Uuid::parse_str(raw).ok())
                .ok_or_else(|| RecordError::malformed(TECHNIQUES_FIELD, "a list of UUIDs", item))
        })
        .collect()
}

/// Fetch and classify every technique the record links to, in link order
pub fn gather_techniques(record: &Record, system: &SystemContext<'_>) -> Result<Vec<Technique>, StepError> {
    let resolver = system.resolver();
    let mut techniques = Vec::new();

    for id in technique_ids(record)? {
        let properties = resolver.resolve_by_identifier(&id)?;
        let technique = classify(&properties)?;
        tracing::debug!(technique = %id, kind = technique.kind.label(), "resolved modification technique");
        techniques.push(technique);
    }

    Ok(techniques)
}

fn optional_string(properties: &Map<String, Value>, field: &str) -> Result<Option<String>, RecordError> {
    match properties.get(field) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(RecordError::malformed(field, "a string", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::{InMemoryResolver, ResolveError};
    use serde_json::json;

    fn props(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_classify_crispr() {
        let technique = classify(&props(json!({
            "guide_rna_sequences": ["ACGT"],
            "insert_sequence": "TTT",
            "aliases": ["lab:crispr-1"]
        })))
        .unwrap();

        assert_eq!(
            technique.kind,
            TechniqueKind::Crispr {
                guide_rna_sequences: json!(["ACGT"]),
                insert_sequence: Some(json!("TTT")),
            }
        );
        assert_eq!(technique.aliases, vec!["lab:crispr-1"]);
        assert_eq!(technique.reagent, None);
    }

    #[test]
    fn test_classify_tale_with_source() {
        let technique = classify(&props(json!({"talen_platform": "v2", "source": "addgene"}))).unwrap();
        assert_eq!(technique.kind, TechniqueKind::Tale { talen_platform: "v2".to_string() });
        assert_eq!(technique.reagent.unwrap().repository.as_deref(), Some("addgene"));
    }

    #[test]
    fn test_classify_unknown() {
        let technique = classify(&props(json!({"description": "EMS"}))).unwrap();
        assert_eq!(technique.kind, TechniqueKind::Unknown);
        assert_eq!(technique.kind.label(), "mutagen treatment");
    }

    #[test]
    fn test_classify_rejects_wrong_shapes() {
        assert!(classify(&props(json!({"talen_platform": 2}))).is_err());
        assert!(classify(&props(json!({"aliases": "x"}))).is_err());
        assert!(classify(&props(json!({"product_id": ["1"]}))).is_err());
    }

    #[test]
    fn test_technique_ids() {
        let record = Record::from_value(json!({})).unwrap();
        assert!(technique_ids(&record).unwrap().is_empty());

        let record = Record::from_value(json!({TECHNIQUES_FIELD: "nope"})).unwrap();
        assert!(technique_ids(&record).is_err());

        let record = Record::from_value(json!({TECHNIQUES_FIELD: ["not-a-uuid"]})).unwrap();
        assert!(technique_ids(&record).is_err());
    }

    #[test]
    fn test_gather_propagates_not_found() {
        let id = Uuid::parse_str("0f6b6a04-3b56-4f8e-8d5d-6a1f6e2b9c11").unwrap();
        let record = Record::from_value(json!({TECHNIQUES_FIELD: [id.to_string()]})).unwrap();
        let resolver = InMemoryResolver::new();

        let err = gather_techniques(&record, &SystemContext::new(&resolver)).unwrap_err();
        assert_eq!(err, StepError::Reference(ResolveError::NotFound(id)));
    }
}
