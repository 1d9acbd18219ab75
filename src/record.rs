use serde_json::{Map, Value};
use thiserror::Error;
use crate::schema_version::{SchemaVersion, SchemaVersionError};

/// Key under which stored records carry their version marker
pub const VERSION_FIELD: &str = "schema_version";

/// A stored record: its field mapping plus the schema version it was written at
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: Map<String, Value>,
    version: Option<SchemaVersion>,
}

#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("Malformed record: field '{field}' should be {expected}, found {found}")]
    Malformed {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Record must be a mapping, found {0}")]
    NotAMapping(&'static str),

    #[error("Invalid schema version marker: {0}")]
    InvalidVersion(#[from] SchemaVersionError),
}

impl RecordError {
    pub fn malformed(field: &str, expected: &'static str, found: &Value) -> Self {
        RecordError::Malformed {
            field: field.to_string(),
            expected,
            found: value_kind(found),
        }
    }
}

impl Record {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields, version: None }
    }

    pub fn with_version(mut self, version: SchemaVersion) -> Self {
        self.version = Some(version);
        self
    }

    /// Build a record from a stored mapping, lifting `schema_version` out of the fields
    pub fn from_value(value: Value) -> Result<Self, RecordError> {
        let mut fields = match value {
            Value::Object(map) => map,
            other => return Err(RecordError::NotAMapping(value_kind(&other))),
        };

        let version: Option<SchemaVersion> = match fields.remove(VERSION_FIELD) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.parse()?),
            Some(Value::Number(n)) => Some(n.to_string().parse()?),
            Some(other) => return Err(RecordError::malformed(VERSION_FIELD, "a version string", &other)),
        };

        Ok(Self { fields, version })
    }

    /// Inverse of `from_value`: the version marker is written back as a string
    pub fn into_value(self) -> Value {
        let mut fields = self.fields;
        if let Some(version) = self.version {
            fields.insert(VERSION_FIELD.to_string(), Value::String(version.to_string()));
        }
        Value::Object(fields)
    }

    pub fn version(&self) -> Option<SchemaVersion> {
        self.version
    }

    pub fn set_version(&mut self, version: SchemaVersion) {
        self.version = Some(version);
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.keys().cloned().collect()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn insert(&mut self, field: &str, value: Value) -> Option<Value> {
        self.fields.insert(field.to_string(), value)
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    /// Move the value at `old` to `new`. Returns false when `old` is absent.
    pub fn rename(&mut self, old: &str, new: &str) -> bool {
        match self.fields.remove(old) {
            Some(value) => {
                self.fields.insert(new.to_string(), value);
                true
            }
            None => false,
        }
    }

    pub fn get_str(&self, field: &str) -> Result<Option<&str>, RecordError> {
        match self.fields.get(field) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(RecordError::malformed(field, "a string", other)),
        }
    }

    /// Remove a string field, failing without removing it when it has another shape
    pub fn take_str(&mut self, field: &str) -> Result<Option<String>, RecordError> {
        self.get_str(field)?;
        match self.fields.remove(field) {
            Some(Value::String(s)) => Ok(Some(s)),
            _ => Ok(None),
        }
    }

    pub fn get_list(&self, field: &str) -> Result<Option<&Vec<Value>>, RecordError> {
        match self.fields.get(field) {
            None => Ok(None),
            Some(Value::Array(items)) => Ok(Some(items)),
            Some(other) => Err(RecordError::malformed(field, "a list", other)),
        }
    }

    /// Append to a list field, creating the list on first use
    pub fn push_to_list(&mut self, field: &str, item: Value) -> Result<(), RecordError> {
        let entry = self
            .fields
            .entry(field.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));

        match entry {
            Value::Array(items) => {
                items.push(item);
                Ok(())
            }
            other => Err(RecordError::malformed(field, "a list", other)),
        }
    }
}

/// Human readable name of a JSON value's shape, for error messages
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

/// List of string values, e.g. `aliases` on a referenced record
pub fn string_list(field: &str, value: &Value) -> Result<Vec<String>, RecordError> {
    let items = value
        .as_array()
        .ok_or_else(|| RecordError::malformed(field, "a list of strings", value))?;

    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| RecordError::malformed(field, "a list of strings", item))
        })
        .collect()
}
