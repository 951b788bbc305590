//! Document store port.
//!
//! The store is schemaless: a document is a JSON object keyed by a storage-generated
//! [`RecordId`] inside a named [`Collection`]. Queries support equality filters, a single-field
//! sort and a limit. Updates support set-union on array fields.

use crate::constants::ID_FIELD;
use async_trait::async_trait;
use saude_uuid::RecordId;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;

/// Fields of a stored document.
pub type Fields = serde_json::Map<String, Value>;

/// The collections known to the application.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Users,
    Vitals,
    Recommendations,
    Credentials,
    Sessions,
}

impl Collection {
    pub const ALL: [Collection; 5] = [
        Collection::Users,
        Collection::Vitals,
        Collection::Recommendations,
        Collection::Credentials,
        Collection::Sessions,
    ];

    /// Stable name, also used as the directory name by the filesystem store.
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Vitals => "vitals",
            Collection::Recommendations => "recommendations",
            Collection::Credentials => "credentials",
            Collection::Sessions => "sessions",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document {collection}/{id} does not exist")]
    NotFound { collection: Collection, id: RecordId },
    #[error("field `{0}` is not an array")]
    NotAnArray(String),
    #[error("document must serialise to a JSON object")]
    NotAnObject,
    #[error("failed to encode document: {0}")]
    Encode(serde_json::Error),
    #[error("failed to decode document: {0}")]
    Decode(serde_json::Error),
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// A stored document together with its identifier.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub id: RecordId,
    pub fields: Fields,
}

impl Document {
    pub fn new(id: RecordId, fields: Fields) -> Self {
        Self { id, fields }
    }

    /// Decodes the document into `T`, exposing the identifier as the `id` field.
    pub fn decode<T: DeserializeOwned>(&self) -> StoreResult<T> {
        let mut fields = self.fields.clone();
        fields.insert(ID_FIELD.to_string(), Value::String(self.id.to_string()));
        serde_json::from_value(Value::Object(fields)).map_err(StoreError::Decode)
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// Serialises `value` into document fields. A top-level `id` field is dropped since the
/// identifier is the document key.
pub fn encode<T: Serialize>(value: &T) -> StoreResult<Fields> {
    match serde_json::to_value(value).map_err(StoreError::Encode)? {
        Value::Object(mut fields) => {
            fields.remove(ID_FIELD);
            Ok(fields)
        }
        _ => Err(StoreError::NotAnObject),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Equality filters, an optional single-field sort and an optional limit.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Query {
    filters: Vec<(String, Value)>,
    order_by: Option<(String, Direction)>,
    limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// True when every equality filter holds for `fields`.
    pub fn matches(&self, fields: &Fields) -> bool {
        self.filters
            .iter()
            .all(|(name, expected)| fields.get(name) == Some(expected))
    }

    /// Filters, sorts and truncates `documents`.
    ///
    /// Documents that lack the sort field are excluded when a sort is requested. Ties are
    /// broken by identifier so results are deterministic.
    pub fn apply(&self, documents: impl IntoIterator<Item = Document>) -> Vec<Document> {
        let mut matched: Vec<Document> = documents
            .into_iter()
            .filter(|doc| self.matches(&doc.fields))
            .collect();

        if let Some((field, direction)) = &self.order_by {
            matched.retain(|doc| doc.fields.contains_key(field));
            matched.sort_by(|a, b| {
                let ordering = compare_values(&a.fields[field], &b.fields[field]);
                let ordering = match direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                };
                ordering.then_with(|| a.id.cmp(&b.id))
            });
        }

        if let Some(limit) = self.limit {
            matched.truncate(limit);
        }

        matched
    }
}

/// Total order over JSON values: null < bool < number < string < array < object.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => {
                let x = x.as_f64().unwrap_or(f64::NAN);
                let y = y.as_f64().unwrap_or(f64::NAN);
                x.partial_cmp(&y).unwrap_or(Ordering::Equal)
            }
        },
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Applies a set-union of `values` to the array field `field`, creating it when absent.
///
/// Shared by the store adapters so both treat duplicates identically.
pub fn union_into(fields: &mut Fields, field: &str, values: Vec<Value>) -> StoreResult<()> {
    let entry = fields
        .entry(field.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));

    let array = entry
        .as_array_mut()
        .ok_or_else(|| StoreError::NotAnArray(field.to_string()))?;

    for value in values {
        if !array.contains(&value) {
            array.push(value);
        }
    }

    Ok(())
}

/// A schemaless document database.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Reads one document, `None` if it does not exist.
    async fn get(&self, collection: Collection, id: &RecordId) -> StoreResult<Option<Document>>;

    /// Creates or replaces the document with the given identifier.
    async fn set(&self, collection: Collection, id: &RecordId, fields: Fields) -> StoreResult<()>;

    /// Inserts a new document under a freshly generated identifier.
    async fn add(&self, collection: Collection, fields: Fields) -> StoreResult<RecordId>;

    /// Removes a document. Removing an absent document succeeds.
    async fn delete(&self, collection: Collection, id: &RecordId) -> StoreResult<()>;

    async fn query(&self, collection: Collection, query: &Query) -> StoreResult<Vec<Document>>;

    /// Adds each of `values` to the array field `field` unless already present.
    ///
    /// Fails with [`StoreError::NotFound`] if the document does not exist.
    async fn array_union(
        &self,
        collection: Collection,
        id: &RecordId,
        field: &str,
        values: Vec<Value>,
    ) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(fields: Value) -> Document {
        match fields {
            Value::Object(map) => Document::new(RecordId::new(), map),
            _ => panic!("test documents must be objects"),
        }
    }

    #[test]
    fn test_query_filters_on_every_field() {
        let docs = vec![
            doc(json!({"role": "patient", "sharing_code": "a"})),
            doc(json!({"role": "doctor", "sharing_code": "a"})),
            doc(json!({"role": "patient", "sharing_code": "b"})),
        ];

        let query = Query::new()
            .where_eq("role", "patient")
            .where_eq("sharing_code", "a");
        let result = query.apply(docs);

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].fields["role"], json!("patient"));
        assert_eq!(result[0].fields["sharing_code"], json!("a"));
    }

    #[test]
    fn test_query_sorts_descending_and_drops_missing_field() {
        let docs = vec![
            doc(json!({"recorded_at": 200})),
            doc(json!({"other": true})),
            doc(json!({"recorded_at": 300})),
            doc(json!({"recorded_at": 100})),
        ];

        let result = Query::new()
            .order_by("recorded_at", Direction::Descending)
            .apply(docs);

        let order: Vec<i64> = result
            .iter()
            .map(|d| d.fields["recorded_at"].as_i64().unwrap())
            .collect();
        assert_eq!(order, vec![300, 200, 100]);
    }

    #[test]
    fn test_query_limit_truncates() {
        let docs = (0..5).map(|n| doc(json!({"n": n})));
        let result = Query::new()
            .order_by("n", Direction::Ascending)
            .limit(2)
            .apply(docs);

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].fields["n"], json!(0));
        assert_eq!(result[1].fields["n"], json!(1));
    }

    #[test]
    fn test_compare_values_mixes_integers_and_floats() {
        assert_eq!(compare_values(&json!(1), &json!(1.5)), Ordering::Less);
        assert_eq!(compare_values(&json!(2), &json!(2)), Ordering::Equal);
        assert_eq!(compare_values(&json!("b"), &json!("a")), Ordering::Greater);
        assert_eq!(compare_values(&json!(null), &json!(0)), Ordering::Less);
    }

    #[test]
    fn test_union_into_skips_duplicates() {
        let mut fields = Fields::new();
        union_into(&mut fields, "ids", vec![json!("a"), json!("b")]).unwrap();
        union_into(&mut fields, "ids", vec![json!("b"), json!("c")]).unwrap();

        assert_eq!(fields["ids"], json!(["a", "b", "c"]));
    }

    #[test]
    fn test_union_into_rejects_non_array() {
        let mut fields = Fields::new();
        fields.insert("ids".into(), json!("scalar"));

        let err = union_into(&mut fields, "ids", vec![json!("a")]).unwrap_err();
        assert!(matches!(err, StoreError::NotAnArray(field) if field == "ids"));
    }

    #[test]
    fn test_encode_drops_id_and_decode_restores_it() {
        #[derive(serde::Serialize, serde::Deserialize, Debug, PartialEq)]
        struct Note {
            id: RecordId,
            text: String,
        }

        let note = Note {
            id: RecordId::new(),
            text: "drink water".into(),
        };
        let fields = encode(&note).unwrap();
        assert!(!fields.contains_key("id"));

        let stored = Document::new(note.id.clone(), fields);
        let decoded: Note = stored.decode().unwrap();
        assert_eq!(decoded, note);
    }
}
