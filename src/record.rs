//! Record: one persisted row as a JSON object.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Primary key column present on every table.
pub const ID: &str = "id";
/// Soft-delete marker present on every table.
pub const EXCLUDED: &str = "excluded";
pub const CREATED_AT: &str = "created_at";
pub const UPDATED_AT: &str = "updated_at";

/// Columns a caller can never set through an update.
pub const PROTECTED_COLUMNS: [&str; 4] = [ID, EXCLUDED, CREATED_AT, UPDATED_AT];

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(pub Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Record(Map::new())
    }

    /// Builds a record from a JSON value. Anything but an object yields None.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(m) => Some(Record(m)),
            _ => None,
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.0.get(ID).and_then(Value::as_str)
    }

    pub fn is_excluded(&self) -> bool {
        self.0.get(EXCLUDED).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// True when the field is missing, null or an empty string.
    pub fn is_blank(&self, field: &str) -> bool {
        is_blank(self.0.get(field))
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(field.into(), value.into())
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Copy with the protected columns removed.
    pub fn without_protected(&self) -> Record {
        let mut out = self.clone();
        for col in PROTECTED_COLUMNS {
            out.0.remove(col);
        }
        out
    }

    /// Overlays every field of `other` onto this record.
    pub fn merge(&mut self, other: &Record) {
        for (k, v) in other.fields() {
            self.0.insert(k.clone(), v.clone());
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

static NULL: Value = Value::Null;

/// Missing fields index to null, like `serde_json::Value`.
impl std::ops::Index<&str> for Record {
    type Output = Value;

    fn index(&self, field: &str) -> &Value {
        self.0.get(field).unwrap_or(&NULL)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(m: Map<String, Value>) -> Self {
        Record(m)
    }
}

impl From<Record> for Value {
    fn from(r: Record) -> Self {
        r.into_value()
    }
}

pub fn is_blank(v: Option<&Value>) -> bool {
    match v {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        _ => false,
    }
}
