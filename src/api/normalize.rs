//! Response shape normalization
//!
//! The backend has changed envelope formats more than once. Current builds
//! wrap payloads in `ApiResult { success, response, apiError }`; older ones
//! used `data` or `items`, returned bare arrays, or (for uploads) a single
//! `imageIds`/`imageId` field. The extractors here try each known shape in
//! order and say which one matched, so callers can tell "nothing yet" apart
//! from "the backend sent something we do not understand".

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Opaque id of an uploaded image
pub type AssetId = String;

const ID_ALIASES: &[&str] = &["imageId", "id", "image_id", "s3Url", "url"];

const STATUS_ALIASES: &[&str] = &[
    "analysisResult",
    "damage",
    "status",
    "result",
    "condition",
    "grassCondition",
    "damageLevel",
];

const MISSING_ID: &str = "-";

/// Known response shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Shape {
    /// `{"response": [..]}`
    Response,
    /// `{"data": [..]}`
    Data,
    /// `{"items": [..]}`
    Items,
    /// `[..]`
    BareArray,
    /// `{"imageIds": [..]}`
    ImageIds,
    /// `{"imageId": ".."}`
    ImageId,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Shape::Response => "response",
            Shape::Data => "data",
            Shape::Items => "items",
            Shape::BareArray => "bare array",
            Shape::ImageIds => "imageIds",
            Shape::ImageId => "imageId",
        };
        write!(f, "{}", name)
    }
}

/// Outcome of matching a response against the known shapes
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted<T> {
    /// A known shape with at least one item
    Found { shape: Shape, items: Vec<T> },
    /// A known shape that carried nothing
    Empty { shape: Shape },
    /// No known shape matched
    Unrecognized,
}

impl<T> Extracted<T> {
    fn from_items(shape: Shape, items: Vec<T>) -> Self {
        if items.is_empty() {
            Extracted::Empty { shape }
        } else {
            Extracted::Found { shape, items }
        }
    }

    pub fn shape(&self) -> Option<Shape> {
        match self {
            Extracted::Found { shape, .. } | Extracted::Empty { shape } => Some(*shape),
            Extracted::Unrecognized => None,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Extracted::Unrecognized)
    }

    pub fn items(&self) -> &[T] {
        match self {
            Extracted::Found { items, .. } => items,
            _ => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    /// The items, with both `Empty` and `Unrecognized` flattened to an empty list
    pub fn into_items(self) -> Vec<T> {
        match self {
            Extracted::Found { items, .. } => items,
            _ => Vec::new(),
        }
    }
}

/// Backend status for one analyzed image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub image_id: String,
    pub status: String,
}

impl ResultRecord {
    /// Build from one JSON entry. Only objects qualify.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        Some(Self {
            image_id: first_alias(obj, ID_ALIASES).unwrap_or_else(|| MISSING_ID.to_string()),
            status: first_alias(obj, STATUS_ALIASES).unwrap_or_default(),
        })
    }
}

/// Extract uploaded asset ids
pub fn extract_ids(body: &Value) -> Extracted<AssetId> {
    let ids = |entries: &[Value]| entries.iter().filter_map(id_from_entry).collect::<Vec<_>>();
    let mut nulled = None;

    if let Some(obj) = body.as_object() {
        let envelopes = [("response", Shape::Response), ("data", Shape::Data)];
        if let Some((shape, entries)) = first_array(obj, &envelopes, &mut nulled) {
            return Extracted::from_items(shape, ids(entries));
        }
    }

    if let Value::Array(entries) = body {
        return Extracted::from_items(Shape::BareArray, ids(entries));
    }

    if let Some(obj) = body.as_object() {
        if let Some((shape, entries)) = first_array(obj, &[("imageIds", Shape::ImageIds)], &mut nulled) {
            return Extracted::from_items(shape, ids(entries));
        }
        if let Some(id) = obj.get("imageId").and_then(scalar_text) {
            return Extracted::from_items(Shape::ImageId, vec![id]);
        }
    }

    unmatched(nulled)
}

/// Extract result records
pub fn extract_results(body: &Value) -> Extracted<ResultRecord> {
    let records = |entries: &[Value]| {
        entries
            .iter()
            .filter_map(ResultRecord::from_value)
            .collect::<Vec<_>>()
    };
    let mut nulled = None;

    if let Some(obj) = body.as_object() {
        let envelopes = [
            ("response", Shape::Response),
            ("items", Shape::Items),
            ("data", Shape::Data),
        ];
        if let Some((shape, entries)) = first_array(obj, &envelopes, &mut nulled) {
            return Extracted::from_items(shape, records(entries));
        }
    }

    if let Value::Array(entries) = body {
        return Extracted::from_items(Shape::BareArray, records(entries));
    }

    unmatched(nulled)
}

/// Decode a response body, treating anything unparseable as `{}`
pub fn safe_json(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).unwrap_or_else(|_| Value::Object(Map::new()))
}

/// Server-supplied error text: `message`, then `apiError` (string or
/// `{message}` object)
pub fn server_message(body: &Value) -> Option<String> {
    let obj = body.as_object()?;

    if let Some(msg) = obj.get("message").and_then(Value::as_str) {
        if !msg.trim().is_empty() {
            return Some(msg.to_string());
        }
    }

    match obj.get("apiError")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Object(inner) => inner
            .get("message")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string),
        _ => None,
    }
}

/// First `key` holding an array. A `null` key does not match, but its shape
/// is kept in `nulled` so an otherwise empty body still reads as `Empty`.
fn first_array<'a>(
    obj: &'a Map<String, Value>,
    keys: &[(&str, Shape)],
    nulled: &mut Option<Shape>,
) -> Option<(Shape, &'a [Value])> {
    for (key, shape) in keys {
        match obj.get(*key) {
            Some(Value::Array(entries)) => return Some((*shape, entries.as_slice())),
            Some(Value::Null) => {
                nulled.get_or_insert(*shape);
            }
            _ => {}
        }
    }
    None
}

fn unmatched<T>(nulled: Option<Shape>) -> Extracted<T> {
    match nulled {
        Some(shape) => Extracted::Empty { shape },
        None => Extracted::Unrecognized,
    }
}

fn id_from_entry(entry: &Value) -> Option<AssetId> {
    match entry {
        Value::Object(obj) => first_alias(obj, ID_ALIASES),
        other => scalar_text(other),
    }
}

fn first_alias(obj: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    aliases
        .iter()
        .filter_map(|key| obj.get(*key))
        .find_map(scalar_text)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
