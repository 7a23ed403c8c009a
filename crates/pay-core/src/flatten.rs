//! # Object Flattening
//!
//! Converts decoded gateway objects into plain JSON maps. The output of
//! `flatten` is the object's values container with every nested domain
//! object replaced by its own flattened map, at any depth, including objects
//! held inside arrays and untagged maps. Non-object leaves are copied as is.
//!
//! Flattening is idempotent: feeding a flattened map back through
//! `flatten_value` returns it unchanged.

use crate::object::{GatewayObject, GatewayValue, ObjectKind, Payload};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, trace};

/// Field names seen for one object kind
pub type FieldSet = Arc<BTreeSet<String>>;

/// Recursive object flattener.
///
/// Shared between concurrent callers. The per-kind field cache (see
/// `observe`) only sizes output maps; every field of every instance is
/// always copied. The cache is written once per kind on first encounter and
/// only read afterwards; two callers racing to populate the same kind store
/// equal sets.
#[derive(Debug, Default)]
pub struct ObjectFlattener {
    field_cache: RwLock<HashMap<ObjectKind, FieldSet>>,
}

impl ObjectFlattener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flatten one domain object into its values map
    pub fn flatten(&self, object: &GatewayObject) -> Payload {
        let known = self.observe(object);

        let mut out = Map::with_capacity(known.len().max(object.values().len()));
        for (key, value) in object.values() {
            out.insert(key.clone(), self.flatten_value(value));
        }
        out
    }

    /// Flatten any value, descending through arrays and maps
    pub fn flatten_value(&self, value: &GatewayValue) -> Value {
        match value {
            GatewayValue::Object(obj) => Value::Object(self.flatten(obj)),
            GatewayValue::Array(items) => {
                Value::Array(items.iter().map(|item| self.flatten_value(item)).collect())
            }
            GatewayValue::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), self.flatten_value(v)))
                    .collect(),
            ),
            GatewayValue::Null => Value::Null,
            GatewayValue::Bool(b) => Value::Bool(*b),
            GatewayValue::Number(n) => Value::Number(n.clone()),
            GatewayValue::String(s) => Value::String(s.clone()),
        }
    }

    /// Field names cached for a kind, if it has been seen
    pub fn known_fields(&self, kind: &ObjectKind) -> Option<FieldSet> {
        self.field_cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(kind)
            .cloned()
    }

    /// Number of kinds in the cache
    pub fn cached_kinds(&self) -> usize {
        self.field_cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Record the field set of the first instance seen for a kind.
    ///
    /// The cache is a sizing hint and a drift signal only: `flatten` uses the
    /// cached set to size its output map and traces instances carrying fields
    /// outside it. It never filters or adds fields.
    fn observe(&self, object: &GatewayObject) -> FieldSet {
        if let Some(known) = self.known_fields(object.kind()) {
            if object.values().keys().any(|key| !known.contains(key)) {
                trace!(
                    kind = %object.kind(),
                    "object carries fields outside the cached set"
                );
            }
            return known;
        }

        let fields: FieldSet = Arc::new(object.values().keys().cloned().collect());
        let mut cache = self
            .field_cache
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let entry = cache
            .entry(object.kind().clone())
            .or_insert_with(|| {
                debug!(kind = %object.kind(), fields = fields.len(), "caching field set");
                fields
            });
        Arc::clone(entry)
    }
}
