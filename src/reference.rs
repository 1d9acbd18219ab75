use std::collections::HashMap;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

/// Read access to other records in the store, by identifier
pub trait ReferenceResolver: Send + Sync {
    fn resolve_by_identifier(&self, id: &Uuid) -> Result<Map<String, Value>, ResolveError>;
}

#[derive(Debug, Error, PartialEq)]
pub enum ResolveError {
    #[error("Referenced record not found: {0}")]
    NotFound(Uuid),

    #[error("Reference store error: {0}")]
    Backend(String),
}

/// Resolver over a fixed table of records, e.g. a dump of technique objects
#[derive(Debug, Clone, Default)]
pub struct InMemoryResolver {
    records: HashMap<Uuid, Map<String, Value>>,
}

impl InMemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: Uuid, properties: Map<String, Value>) {
        self.records.insert(id, properties);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Load from either `{uuid: {properties}}` or `[{uuid: ..., ...}]`
    pub fn from_value(value: Value) -> Result<Self, ResolveError> {
        let mut resolver = Self::new();

        match value {
            Value::Object(map) => {
                for (key, properties) in map {
                    let id = parse_uuid(&key)?;
                    resolver.insert(id, into_properties(properties, &key)?);
                }
            }
            Value::Array(items) => {
                for item in items {
                    let id = item
                        .get("uuid")
                        .and_then(Value::as_str)
                        .ok_or_else(|| ResolveError::Backend("reference entry without a 'uuid' string".to_string()))
                        .and_then(parse_uuid)?;
                    resolver.insert(id, into_properties(item, &id.to_string())?);
                }
            }
            Value::Null => {}
            _ => {
                return Err(ResolveError::Backend(
                    "references must be a mapping or a list of records".to_string(),
                ))
            }
        }

        Ok(resolver)
    }
}

impl ReferenceResolver for InMemoryResolver {
    fn resolve_by_identifier(&self, id: &Uuid) -> Result<Map<String, Value>, ResolveError> {
        self.records.get(id).cloned().ok_or(ResolveError::NotFound(*id))
    }
}

fn parse_uuid(raw: &str) -> Result<Uuid, ResolveError> {
    Uuid::parse_str(raw).map_err(|e| ResolveError::Backend(format!("invalid reference identifier '{}': {}", raw, e)))
}

fn into_properties(value: Value, id: &str) -> Result<Map<String, Value>, ResolveError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ResolveError::Backend(format!("reference {} is not a mapping", id))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TECHNIQUE: &str = "6d6c0b34-6f3a-4b4c-9a52-0c9f1d1f2a01";

    #[test]
    fn test_resolve_known_identifier() {
        let resolver = InMemoryResolver::from_value(json!({
            TECHNIQUE: {"talen_platform": "v2"}
        }))
        .unwrap();

        let id = Uuid::parse_str(TECHNIQUE).unwrap();
        let properties = resolver.resolve_by_identifier(&id).unwrap();
        assert_eq!(properties.get("talen_platform"), Some(&json!("v2")));
    }

    #[test]
    fn test_resolve_missing_identifier() {
        let resolver = InMemoryResolver::new();
        let id = Uuid::parse_str(TECHNIQUE).unwrap();
        assert_eq!(resolver.resolve_by_identifier(&id), Err(ResolveError::NotFound(id)));
    }

    #[test]
    fn test_load_from_list() {
        let resolver = InMemoryResolver::from_value(json!([
            {"uuid": TECHNIQUE, "guide_rna_sequences": ["ACGT"]}
        ]))
        .unwrap();
        assert_eq!(resolver.len(), 1);
    }

    #[test]
    fn test_load_rejects_bad_identifier() {
        let err = InMemoryResolver::from_value(json!({"not-a-uuid": {}})).unwrap_err();
        assert!(matches!(err, ResolveError::Backend(_)));
        assert!(InMemoryResolver::from_value(json!([{"talen_platform": "v1"}])).is_err());
        assert!(InMemoryResolver::from_value(json!("oops")).is_err());
    }
}
