//! # Gateway Domain Objects
//!
//! The gateway answers with self-describing JSON: every resource carries an
//! `object` tag (`"charge"`, `"customer"`, `"list"`, ...). Decoding turns each
//! tagged map into a `GatewayObject`, so domain objects are recognised by
//! their runtime variant rather than by a fixed list of field names.
//!
//! A `GatewayObject` is a wrapper: the resource data lives in its values
//! container, next to bookkeeping the wrapper needs to talk back to the
//! gateway (instance URL, keys changed since retrieval). Only the values
//! container is ever exposed to callers.

use crate::error::{GatewayError, GatewayResult};
use serde_json::{Map, Number, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Loosely-typed request payload and flattened response shape
pub type Payload = Map<String, Value>;

/// Resource type of a gateway object, read from its `object` tag
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectKind {
    Charge,
    Customer,
    Card,
    Subscription,
    Plan,
    Coupon,
    Event,
    Refund,
    Discount,
    List,
    Other(String),
}

impl ObjectKind {
    /// Parse an `object` tag
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "charge" => ObjectKind::Charge,
            "customer" => ObjectKind::Customer,
            "card" => ObjectKind::Card,
            "subscription" => ObjectKind::Subscription,
            "plan" => ObjectKind::Plan,
            "coupon" => ObjectKind::Coupon,
            "event" => ObjectKind::Event,
            "refund" => ObjectKind::Refund,
            "discount" => ObjectKind::Discount,
            "list" => ObjectKind::List,
            other => ObjectKind::Other(other.to_string()),
        }
    }

    /// The `object` tag for this kind
    pub fn as_str(&self) -> &str {
        match self {
            ObjectKind::Charge => "charge",
            ObjectKind::Customer => "customer",
            ObjectKind::Card => "card",
            ObjectKind::Subscription => "subscription",
            ObjectKind::Plan => "plan",
            ObjectKind::Coupon => "coupon",
            ObjectKind::Event => "event",
            ObjectKind::Refund => "refund",
            ObjectKind::Discount => "discount",
            ObjectKind::List => "list",
            ObjectKind::Other(tag) => tag,
        }
    }

    /// Path of the top-level collection holding this kind
    pub fn collection_path(&self) -> String {
        format!("/v1/{}s", self.as_str())
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded field value
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<GatewayValue>),
    Map(BTreeMap<String, GatewayValue>),
    Object(GatewayObject),
}

impl GatewayValue {
    /// Decode a JSON value, promoting tagged maps to domain objects
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(map) => {
                let kind = match map.get("object") {
                    Some(Value::String(tag)) => Some(ObjectKind::from_tag(tag)),
                    _ => None,
                };
                match kind {
                    Some(kind) => GatewayValue::Object(GatewayObject::decode(kind, map)),
                    None => GatewayValue::Map(
                        map.into_iter()
                            .map(|(k, v)| (k, GatewayValue::from_json(v)))
                            .collect(),
                    ),
                }
            }
            Value::Array(items) => {
                GatewayValue::Array(items.into_iter().map(GatewayValue::from_json).collect())
            }
            scalar => GatewayValue::from(scalar),
        }
    }

    pub fn as_object(&self) -> Option<&GatewayObject> {
        match self {
            GatewayValue::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            GatewayValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Request-parameter form of the value. Nested objects that carry an id
    /// are sent as that id, the way the gateway expects references.
    pub fn to_param(&self) -> Value {
        match self {
            GatewayValue::Null => Value::Null,
            GatewayValue::Bool(b) => Value::Bool(*b),
            GatewayValue::Number(n) => Value::Number(n.clone()),
            GatewayValue::String(s) => Value::String(s.clone()),
            GatewayValue::Array(items) => {
                Value::Array(items.iter().map(GatewayValue::to_param).collect())
            }
            GatewayValue::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_param()))
                    .collect(),
            ),
            GatewayValue::Object(obj) => match obj.id() {
                Some(id) => Value::String(id.to_string()),
                None => Value::Object(
                    obj.values
                        .iter()
                        .map(|(k, v)| (k.clone(), v.to_param()))
                        .collect(),
                ),
            },
        }
    }
}

/// Plain conversion: maps stay maps, no object promotion
impl From<Value> for GatewayValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => GatewayValue::Null,
            Value::Bool(b) => GatewayValue::Bool(b),
            Value::Number(n) => GatewayValue::Number(n),
            Value::String(s) => GatewayValue::String(s),
            Value::Array(items) => {
                GatewayValue::Array(items.into_iter().map(GatewayValue::from).collect())
            }
            Value::Object(map) => GatewayValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, GatewayValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for GatewayValue {
    fn from(value: &str) -> Self {
        GatewayValue::String(value.to_string())
    }
}

impl From<i64> for GatewayValue {
    fn from(value: i64) -> Self {
        GatewayValue::Number(value.into())
    }
}

impl From<bool> for GatewayValue {
    fn from(value: bool) -> Self {
        GatewayValue::Bool(value)
    }
}

impl From<GatewayObject> for GatewayValue {
    fn from(value: GatewayObject) -> Self {
        GatewayValue::Object(value)
    }
}

/// A resource returned by the gateway
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayObject {
    kind: ObjectKind,
    /// Values container: the resource's actual fields
    values: BTreeMap<String, GatewayValue>,
    /// Instance URL for follow-up calls (save, delete, actions)
    url: Option<String>,
    /// Keys changed through `set` since retrieval
    unsaved: BTreeSet<String>,
}

impl GatewayObject {
    /// Create an empty object of the given kind
    pub fn new(kind: ObjectKind) -> Self {
        let mut values = BTreeMap::new();
        values.insert(
            "object".to_string(),
            GatewayValue::String(kind.as_str().to_string()),
        );
        Self {
            kind,
            values,
            url: None,
            unsaved: BTreeSet::new(),
        }
    }

    /// Create an object with an `id` field
    pub fn with_id(kind: ObjectKind, id: impl Into<String>) -> Self {
        Self::new(kind).with("id", GatewayValue::String(id.into()))
    }

    /// Decode a top-level gateway response. The body must be a tagged map.
    pub fn from_json(value: Value) -> GatewayResult<Self> {
        match GatewayValue::from_json(value) {
            GatewayValue::Object(obj) => Ok(obj),
            other => Err(GatewayError::Api {
                message: format!(
                    "Response is not a gateway object: {}",
                    summarize(&other)
                ),
                http_status: None,
            }),
        }
    }

    fn decode(kind: ObjectKind, map: Map<String, Value>) -> Self {
        Self {
            kind,
            values: map
                .into_iter()
                .map(|(k, v)| (k, GatewayValue::from_json(v)))
                .collect(),
            url: None,
            unsaved: BTreeSet::new(),
        }
    }

    pub fn kind(&self) -> &ObjectKind {
        &self.kind
    }

    pub fn id(&self) -> Option<&str> {
        self.values.get("id").and_then(GatewayValue::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&GatewayValue> {
        self.values.get(key)
    }

    /// The values container
    pub fn values(&self) -> &BTreeMap<String, GatewayValue> {
        &self.values
    }

    /// Builder: add a field without marking it unsaved
    pub fn with(mut self, key: impl Into<String>, value: impl Into<GatewayValue>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Update a field and remember it for the next save
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<GatewayValue>) {
        let key = key.into();
        self.values.insert(key.clone(), value.into());
        self.unsaved.insert(key);
    }

    /// Keys changed since retrieval
    pub fn unsaved_keys(&self) -> impl Iterator<Item = &str> {
        self.unsaved.iter().map(String::as_str)
    }

    /// Parameters a save must send: only the changed keys
    pub fn unsaved_params(&self) -> Payload {
        self.unsaved
            .iter()
            .filter_map(|key| self.values.get(key).map(|v| (key.clone(), v.to_param())))
            .collect()
    }

    /// Forget pending changes (after a successful save)
    pub fn mark_saved(&mut self) {
        self.unsaved.clear();
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Builder: attach the instance URL
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// URL for follow-up calls on this object. Falls back to the top-level
    /// collection when the object was not obtained through a collection.
    pub fn instance_url(&self) -> GatewayResult<String> {
        if let Some(url) = &self.url {
            return Ok(url.clone());
        }
        let id = self.id().ok_or_else(|| {
            GatewayError::unexpected(format!("{} object has no id", self.kind))
        })?;
        Ok(format!(
            "{}/{}",
            self.kind.collection_path(),
            encode_path_segment(id)
        ))
    }

    /// Elements of a `list` object
    pub fn list_data(&self) -> Option<&[GatewayValue]> {
        if self.kind != ObjectKind::List {
            return None;
        }
        match self.values.get("data") {
            Some(GatewayValue::Array(items)) => Some(items),
            _ => None,
        }
    }

    /// Resolve the nested collection stored under `field` (e.g. a customer's
    /// `sources`). Uses the sub-list's own `url` when the object embeds one.
    pub fn nested_collection(&self, field: &str, kind: ObjectKind) -> GatewayResult<Collection> {
        let embedded = self
            .values
            .get(field)
            .and_then(GatewayValue::as_object)
            .filter(|list| list.kind == ObjectKind::List)
            .and_then(|list| list.get("url"))
            .and_then(GatewayValue::as_str);

        let url = match embedded {
            Some(url) => url.to_string(),
            None => format!("{}/{}", self.instance_url()?, field),
        };
        Ok(Collection { kind, url })
    }
}

/// Address of a resource collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub kind: ObjectKind,
    pub url: String,
}

impl Collection {
    /// Top-level collection, e.g. `/v1/charges`
    pub fn top_level(kind: ObjectKind) -> Self {
        let url = kind.collection_path();
        Self { kind, url }
    }

    /// URL of one member of the collection
    pub fn instance_url(&self, id: &str) -> String {
        format!("{}/{}", self.url, encode_path_segment(id))
    }
}

/// Percent-encode an identifier for use as one URL path segment
pub fn encode_path_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            other => out.push_str(&format!("%{:02X}", other)),
        }
    }
    out
}

fn summarize(value: &GatewayValue) -> &'static str {
    match value {
        GatewayValue::Null => "null",
        GatewayValue::Bool(_) => "boolean",
        GatewayValue::Number(_) => "number",
        GatewayValue::String(_) => "string",
        GatewayValue::Array(_) => "array",
        GatewayValue::Map(_) => "untagged map",
        GatewayValue::Object(_) => "object",
    }
}
