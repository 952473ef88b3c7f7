//! Presence-tracked configuration trees. A `ConfigObject` holds the user-supplied
//! configuration for a single resource, mirroring the `spec` (plus standard
//! `metadata`) of one version of one Kubernetes kind.
//!
//! The crucial property of these types is that there is no null variant anywhere.
//! An optional field is either _set_ to a real value or it is simply not a key in
//! its enclosing `ConfigObject`. This makes the omit-if-absent rule for rendered
//! manifests a consequence of the type system instead of a convention that every
//! call site has to remember: a field that was never set cannot be serialized as
//! `null` or an empty string, because there is no value to serialize.

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::Value;

use std::collections::btree_map::{self, BTreeMap};
use std::fmt::{self, Display};

/// Error returned when a json value cannot be converted into a configuration
/// tree. The only json shapes this can happen for are non-object roots and
/// numbers that don't fit an `i64`.
#[derive(Debug, PartialEq, Clone)]
pub struct InvalidConfigError {
    pub message: &'static str,
    pub value: Value,
}

impl InvalidConfigError {
    fn new(message: &'static str, value: Value) -> InvalidConfigError {
        InvalidConfigError { message, value }
    }
}

impl Display for InvalidConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Invalid configuration: {}: {}", self.message, self.value)
    }
}

impl std::error::Error for InvalidConfigError {}

/// A single configuration value. Scalars, lists, and nested objects; maps of
/// string to string (labels, annotations, selectors) are represented as an
/// `Object` whose values are all strings, and are typed as such by the schema.
#[derive(Debug, PartialEq, Clone)]
pub enum ConfigValue {
    String(String),
    Integer(i64),
    Boolean(bool),
    List(Vec<ConfigValue>),
    Object(ConfigObject),
}

impl ConfigValue {
    /// the name of this value's type, used in validation error messages
    pub fn type_name(&self) -> &'static str {
        match *self {
            ConfigValue::String(_) => "string",
            ConfigValue::Integer(_) => "integer",
            ConfigValue::Boolean(_) => "boolean",
            ConfigValue::List(_) => "list",
            ConfigValue::Object(_) => "object",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match *self {
            ConfigValue::String(ref s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match *self {
            ConfigValue::Integer(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ConfigObject> {
        match *self {
            ConfigValue::Object(ref obj) => Some(obj),
            _ => None,
        }
    }

    fn from_json(value: Value) -> Result<ConfigValue, InvalidConfigError> {
        match value {
            Value::String(s) => Ok(ConfigValue::String(s)),
            Value::Bool(b) => Ok(ConfigValue::Boolean(b)),
            Value::Number(n) => n
                .as_i64()
                .map(ConfigValue::Integer)
                .ok_or_else(|| InvalidConfigError::new("number is not a 64 bit integer", Value::Number(n))),
            Value::Array(items) => {
                let mut list = Vec::with_capacity(items.len());
                for item in items {
                    if item.is_null() {
                        return Err(InvalidConfigError::new("list elements cannot be null", Value::Null));
                    }
                    list.push(ConfigValue::from_json(item)?);
                }
                Ok(ConfigValue::List(list))
            }
            Value::Object(map) => {
                let mut object = ConfigObject::new();
                for (key, val) in map {
                    // a null entry means the field is unset, so it has no
                    // representation in the tree at all
                    if val.is_null() {
                        continue;
                    }
                    object.fields.insert(key, ConfigValue::from_json(val)?);
                }
                Ok(ConfigValue::Object(object))
            }
            Value::Null => Err(InvalidConfigError::new("null has no configuration representation", Value::Null)),
        }
    }

    fn to_json(&self) -> Value {
        match *self {
            ConfigValue::String(ref s) => Value::String(s.clone()),
            ConfigValue::Integer(i) => Value::Number(i.into()),
            ConfigValue::Boolean(b) => Value::Bool(b),
            ConfigValue::List(ref items) => Value::Array(items.iter().map(ConfigValue::to_json).collect()),
            ConfigValue::Object(ref obj) => obj.to_json(),
        }
    }
}

impl Serialize for ConfigValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match *self {
            ConfigValue::String(ref s) => serializer.serialize_str(s),
            ConfigValue::Integer(i) => serializer.serialize_i64(i),
            ConfigValue::Boolean(b) => serializer.serialize_bool(b),
            ConfigValue::List(ref items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            ConfigValue::Object(ref obj) => obj.serialize(serializer),
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> ConfigValue {
        ConfigValue::String(s.to_owned())
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> ConfigValue {
        ConfigValue::String(s)
    }
}

impl From<i64> for ConfigValue {
    fn from(i: i64) -> ConfigValue {
        ConfigValue::Integer(i)
    }
}

impl From<bool> for ConfigValue {
    fn from(b: bool) -> ConfigValue {
        ConfigValue::Boolean(b)
    }
}

impl From<Vec<ConfigValue>> for ConfigValue {
    fn from(items: Vec<ConfigValue>) -> ConfigValue {
        ConfigValue::List(items)
    }
}

impl From<ConfigObject> for ConfigValue {
    fn from(obj: ConfigObject) -> ConfigValue {
        ConfigValue::Object(obj)
    }
}

/// A configuration object: field name to value, with absence of a key meaning
/// the field is unset. Keys are held in a `BTreeMap` so that iteration order is
/// stable, which keeps everything downstream of a configuration deterministic.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct ConfigObject {
    fields: BTreeMap<String, ConfigValue>,
}

impl ConfigObject {
    pub fn new() -> ConfigObject {
        ConfigObject {
            fields: BTreeMap::new(),
        }
    }

    /// Converts a `serde_json::Value` into a configuration tree. This is the
    /// bridge from the caller's declarative configuration language, which
    /// models unset optional fields as `null`: null object entries are
    /// dropped, so they end up unset here. The root must be an object, and any
    /// number that does not fit an `i64` is rejected.
    pub fn from_json(value: Value) -> Result<ConfigObject, InvalidConfigError> {
        match ConfigValue::from_json(value)? {
            ConfigValue::Object(obj) => Ok(obj),
            other => Err(InvalidConfigError::new(
                "configuration root must be an object",
                other.to_json(),
            )),
        }
    }

    pub fn to_json(&self) -> Value {
        let map = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        Value::Object(map)
    }

    pub fn get(&self, name: &str) -> Option<&ConfigValue> {
        self.fields.get(name)
    }

    /// Sets a field to the given value. There is deliberately no way to set a
    /// field to "null"; to unset a field, use `remove`.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<ConfigValue>) -> &mut ConfigObject {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// builder-style version of `set`
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ConfigValue>) -> ConfigObject {
        self.set(name, value);
        self
    }

    pub fn remove(&mut self, name: &str) -> Option<ConfigValue> {
        self.fields.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> btree_map::Iter<String, ConfigValue> {
        self.fields.iter()
    }

    /// Returns the nested object at `name`, if it is set and is an object
    pub fn get_object(&self, name: &str) -> Option<&ConfigObject> {
        self.get(name).and_then(ConfigValue::as_object)
    }

    /// Returns the string at `name`, if it is set and is a string
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ConfigValue::as_str)
    }
}

impl Serialize for ConfigObject {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in self.fields.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl Display for ConfigObject {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.to_json().fmt(f)
    }
}
