//! Policy document store
//!
//! [`PolicyDocument`] holds one management policy as JSON. Top-level keys
//! declared by the [`SchemaRegistry`] live in the `known` map; every other
//! key is kept verbatim in the `extra` bag so server-supplied fields survive
//! a load/edit/save round trip.
//!
//! All write operations take `&self` and return a new document.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{json_type_name, PolicyError};
use crate::path::{as_index, PolicyPath};
use crate::schema::{FieldKind, FieldSchema, SchemaRegistry};

/// JSON object map used for policy records
pub type Record = Map<String, Value>;

/// Management policy document
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PolicyDocument {
    /// Fields owned by the schema registry
    known: Record,
    /// Fields the console does not edit, passed through unmodified
    extra: Record,
}

/// Schema-typed view of a field's current value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Text content; missing is empty
    Text(String),
    /// Toggle state; missing or non-boolean is `false`
    Toggle(bool),
    /// Selected option, if any
    Enum(Option<String>),
    /// List items rendered as text
    ScalarList(Vec<String>),
    /// List records; non-object items appear as empty records
    ObjectList(Vec<Record>),
}

impl PolicyDocument {
    /// Create empty document
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON value; `null` yields an empty document
    ///
    /// # Errors
    /// Returns error if the value is neither an object nor `null`
    pub fn from_value(value: Value) -> Result<Self, PolicyError> {
        match value {
            Value::Object(map) => Ok(Self::from_map(map)),
            Value::Null => Ok(Self::new()),
            other => Err(PolicyError::NotAMapping(json_type_name(&other))),
        }
    }

    /// Build from a JSON object
    #[must_use]
    pub fn from_map(map: Record) -> Self {
        let mut document = Self::new();
        for (key, value) in map {
            document.insert_top(key, value);
        }
        document
    }

    /// Parse from JSON text
    ///
    /// # Errors
    /// Returns error if JSON is invalid or not an object
    pub fn from_json(json: &str) -> Result<Self, PolicyError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Merge both bags back into one JSON object
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut merged = self.known.clone();
        merged.extend(self.extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        Value::Object(merged)
    }

    /// Serialize to compact JSON
    ///
    /// # Errors
    /// Returns error if serialization fails (rare for JSON)
    pub fn to_json(&self) -> Result<String, PolicyError> {
        serde_json::to_string(self).map_err(|e| PolicyError::Serialization(e.to_string()))
    }

    /// Serialize to indented JSON
    ///
    /// # Errors
    /// Returns error if serialization fails (rare for JSON)
    pub fn to_json_pretty(&self) -> Result<String, PolicyError> {
        serde_json::to_string_pretty(self).map_err(|e| PolicyError::Serialization(e.to_string()))
    }

    /// Serialize to YAML
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn to_yaml(&self) -> Result<String, PolicyError> {
        serde_yaml::to_string(self).map_err(|e| PolicyError::Serialization(e.to_string()))
    }

    /// Check if document has no fields
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.known.is_empty() && self.extra.is_empty()
    }

    /// Top-level keys owned by the schema
    pub fn known_keys(&self) -> impl Iterator<Item = &str> {
        self.known.keys().map(String::as_str)
    }

    /// Top-level keys passed through untouched
    pub fn extra_keys(&self) -> impl Iterator<Item = &str> {
        self.extra.keys().map(String::as_str)
    }

    /// Read the value at `path`
    ///
    /// Returns `None` when any segment is absent, including the root path.
    #[must_use]
    pub fn get(&self, path: &PolicyPath) -> Option<&Value> {
        let (first, rest) = path.segments().split_first()?;
        let mut current = self.top(first)?;
        for segment in rest {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(as_index(segment)?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Return a copy with `value` stored at `path`
    ///
    /// Missing, `null` or scalar intermediates become mappings. A numeric
    /// segment on a list addresses an existing element, or appends a fresh
    /// mapping when it equals the list length.
    ///
    /// # Errors
    /// - `PolicyError::EmptyPath` for the root path
    /// - `PolicyError::BadListIndex` when a list segment is not a valid index
    pub fn set(&self, path: &PolicyPath, value: Value) -> Result<Self, PolicyError> {
        let mut next = self.clone();
        next.set_in_place(path, value)?;
        Ok(next)
    }

    /// Return a copy with `item` appended to the list at `path`
    ///
    /// A missing or `null` value becomes a one-element list.
    ///
    /// # Errors
    /// - `PolicyError::NotAList` if the value at `path` is not a list
    pub fn append_to_list(&self, path: &PolicyPath, item: Value) -> Result<Self, PolicyError> {
        let mut next = self.clone();
        if let Some(Value::Array(items)) = next.get_mut(path) {
            items.push(item);
        } else if matches!(next.get(path), None | Some(Value::Null)) {
            next.set_in_place(path, Value::Array(vec![item]))?;
        } else {
            return Err(PolicyError::NotAList(path.to_string()));
        }
        Ok(next)
    }

    /// Return a copy with element `index` removed from the list at `path`
    ///
    /// Out-of-range indices and non-list values leave the copy unchanged.
    #[must_use]
    pub fn remove_from_list(&self, path: &PolicyPath, index: usize) -> Self {
        let mut next = self.clone();
        if let Some(Value::Array(items)) = next.get_mut(path) {
            if index < items.len() {
                items.remove(index);
            }
        }
        next
    }

    /// Return a copy with the boolean at `path` flipped
    ///
    /// Missing or non-boolean values count as `false`.
    ///
    /// # Errors
    /// Same as [`PolicyDocument::set`]
    pub fn toggle(&self, path: &PolicyPath) -> Result<Self, PolicyError> {
        let current = self.get(path).and_then(Value::as_bool).unwrap_or(false);
        self.set(path, Value::Bool(!current))
    }

    /// Schema-typed view of the value behind `schema`
    #[must_use]
    pub fn field(&self, schema: &FieldSchema) -> FieldValue {
        let raw = self.get(&schema.path());
        match schema.kind {
            FieldKind::Text => FieldValue::Text(raw.map(display_scalar).unwrap_or_default()),
            FieldKind::Toggle => FieldValue::Toggle(raw.and_then(Value::as_bool).unwrap_or(false)),
            FieldKind::Enum => FieldValue::Enum(raw.and_then(Value::as_str).map(str::to_string)),
            FieldKind::ListOfScalar => FieldValue::ScalarList(
                raw.and_then(Value::as_array)
                    .map(|items| items.iter().map(display_scalar).collect())
                    .unwrap_or_default(),
            ),
            FieldKind::ListOfObject => FieldValue::ObjectList(
                raw.and_then(Value::as_array)
                    .map(|items| {
                        items
                            .iter()
                            .map(|item| item.as_object().cloned().unwrap_or_default())
                            .collect()
                    })
                    .unwrap_or_default(),
            ),
        }
    }

    fn bag_for(&self, key: &str) -> &Record {
        if SchemaRegistry::standard().owns_top_level(key) {
            &self.known
        } else {
            &self.extra
        }
    }

    fn bag_for_mut(&mut self, key: &str) -> &mut Record {
        if SchemaRegistry::standard().owns_top_level(key) {
            &mut self.known
        } else {
            &mut self.extra
        }
    }

    fn top(&self, key: &str) -> Option<&Value> {
        self.bag_for(key).get(key)
    }

    fn insert_top(&mut self, key: String, value: Value) {
        self.bag_for_mut(&key).insert(key, value);
    }

    fn get_mut(&mut self, path: &PolicyPath) -> Option<&mut Value> {
        let (first, rest) = path.segments().split_first()?;
        let mut current = self.bag_for_mut(first).get_mut(first)?;
        for segment in rest {
            current = match current {
                Value::Object(map) => map.get_mut(segment)?,
                Value::Array(items) => items.get_mut(as_index(segment)?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    fn set_in_place(&mut self, path: &PolicyPath, value: Value) -> Result<(), PolicyError> {
        let (first, rest) = path.segments().split_first().ok_or(PolicyError::EmptyPath)?;
        let slot = self
            .bag_for_mut(first)
            .entry(first.clone())
            .or_insert(Value::Null);
        if rest.is_empty() {
            *slot = value;
            return Ok(());
        }
        assign(slot, rest, value, path)
    }
}

/// Walk `segments` below `current`, creating mappings as needed, and store
/// `value` at the leaf
fn assign(
    current: &mut Value,
    segments: &[String],
    value: Value,
    path: &PolicyPath,
) -> Result<(), PolicyError> {
    let Some((segment, rest)) = segments.split_first() else {
        *current = value;
        return Ok(());
    };

    let next = match current {
        Value::Array(items) => {
            let bad_index = || PolicyError::BadListIndex {
                path: path.to_string(),
                segment: segment.clone(),
            };
            let index = as_index(segment).ok_or_else(bad_index)?;
            if index == items.len() {
                items.push(Value::Object(Map::new()));
            }
            items.get_mut(index).ok_or_else(bad_index)?
        }
        other => {
            if !other.is_object() {
                *other = Value::Object(Map::new());
            }
            other
                .as_object_mut()
                .ok_or(PolicyError::NotAMapping("scalar"))?
                .entry(segment.clone())
                .or_insert(Value::Null)
        }
    };

    assign(next, rest, value, path)
}

/// Text shown for a JSON value inside a control
pub(crate) fn display_scalar(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(display_scalar).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}

impl Serialize for PolicyDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.known.iter().chain(self.extra.iter()))
    }
}

impl<'de> Deserialize<'de> for PolicyDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = Option::<Record>::deserialize(deserializer)?;
        Ok(Self::from_map(map.unwrap_or_default()))
    }
}

impl TryFrom<Value> for PolicyDocument {
    type Error = PolicyError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl From<&PolicyDocument> for Value {
    fn from(document: &PolicyDocument) -> Self {
        document.to_value()
    }
}
