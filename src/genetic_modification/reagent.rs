use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier backfilled when a repository is known but no product id is
pub const PLEASE_CONTACT_LAB: &str = "please-contact-lab";

/// One `reagent_availability` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReagentAvailability {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
}

impl ReagentAvailability {
    /// Derive an entry from a `source` / `product_id` pair; `None` when both are absent
    pub fn from_source(source: Option<String>, product_id: Option<String>) -> Option<Self> {
        let identifier = match (&source, product_id) {
            (_, Some(product_id)) => Some(product_id),
            (Some(_), None) => Some(PLEASE_CONTACT_LAB.to_string()),
            (None, None) => None,
        };

        if source.is_none() && identifier.is_none() {
            return None;
        }

        Some(Self {
            repository: source,
            identifier,
        })
    }

    pub fn to_value(&self) -> Value {
        let mut map = serde_json::Map::new();
        if let Some(repository) = &self.repository {
            map.insert("repository".to_string(), Value::String(repository.clone()));
        }
        if let Some(identifier) = &self.identifier {
            map.insert("identifier".to_string(), Value::String(identifier.clone()));
        }
        Value::Object(map)
    }
}
