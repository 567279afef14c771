use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One input record: field name -> value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    fields: Map<String, Value>,
}

impl Document {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Build a document from string-valued pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let fields = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), Value::String(v.into())))
            .collect();
        Self { fields }
    }

    /// Wrap a JSON value. Objects are taken as-is; anything else becomes `{"value": v}`.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self { fields },
            other => {
                let mut fields = Map::new();
                fields.insert("value".into(), other);
                Self { fields }
            }
        }
    }

    /// String form of a field, "" if missing or null.
    pub fn text_of(&self, field: &str) -> String {
        match self.fields.get(field) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

/// Join the selected fields of one document with single spaces.
///
/// Missing fields contribute an empty string, so the separator count is
/// always `fields.len() - 1`.
pub fn compose(doc: &Document, fields: &[String]) -> String {
    fields
        .iter()
        .map(|f| doc.text_of(f))
        .collect::<Vec<String>>()
        .join(" ")
}

/// Compose every document, preserving input order.
pub fn compose_all(docs: &[Document], fields: &[String]) -> Vec<String> {
    docs.iter().map(|d| compose(d, fields)).collect()
}
