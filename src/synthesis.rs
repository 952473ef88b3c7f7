//! The manifest synthesizer: a pure transformation from a configuration tree
//! plus a `K8sType` into a rendered yaml manifest and a synthetic state id.
//!
//! Synthesis is stateless and side-effect free apart from reading the injected
//! clock. Every call produces a brand-new `ManifestRecord`; there is no
//! in-progress state and nothing is ever partially updated. Concurrent calls
//! need no coordination because each one operates on its own configuration and
//! produces its own record.

use crate::k8s_types::K8sType;
use crate::schema::{Cardinality, Field, FieldType, Schema};
use crate::value::{ConfigObject, ConfigValue};

use serde_yaml::{Mapping, Value as YamlValue};

use std::fmt::{self, Display};
use std::time::{SystemTime, UNIX_EPOCH};

/// A source of nanosecond timestamps, injected into the synthesizer so that
/// tests can supply a deterministic clock. The timestamps are only used to
/// mint state-tracking ids; they carry no semantic meaning.
pub trait Clock: Send + Sync {
    fn now_nanos(&self) -> i64;
}

/// The wall clock. Note that ids minted from it are only as unique as the
/// platform's clock resolution makes them; callers that need a hard uniqueness
/// guarantee should supply their own `Clock`.
#[derive(Debug, Copy, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_nanos(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos() as i64)
            .unwrap_or(0)
    }
}

/// A clock that always returns the same instant
#[derive(Debug, Copy, Clone)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_nanos(&self) -> i64 {
        self.0
    }
}

/// The result of one synthesis call: the rendered manifest text, the id that
/// makes the state record change-detectable, and the echoed identity fields.
/// Records are immutable; a subsequent create or update produces a new one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManifestRecord {
    pub id: i64,
    pub yaml: String,
    pub api_version: String,
    pub kind: String,
    pub metadata: ConfigObject,
}

/// Error wrapping a yaml serialization failure. With schema-constrained input
/// this is practically unreachable, but it is the one failure mode synthesis
/// has, and it is surfaced rather than swallowed.
#[derive(Debug)]
pub struct SerializationError(serde_yaml::Error);

impl Display for SerializationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "failed to serialize manifest: {}", self.0)
    }
}

impl std::error::Error for SerializationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl From<serde_yaml::Error> for SerializationError {
    fn from(err: serde_yaml::Error) -> SerializationError {
        SerializationError(err)
    }
}

/// Renders configuration trees into manifests. The type parameter is the clock
/// used to mint record ids; production code uses `SystemClock`.
#[derive(Debug, Clone)]
pub struct Synthesizer<C: Clock = SystemClock> {
    clock: C,
}

impl Synthesizer<SystemClock> {
    pub fn new() -> Synthesizer<SystemClock> {
        Synthesizer { clock: SystemClock }
    }
}

impl Default for Synthesizer<SystemClock> {
    fn default() -> Synthesizer<SystemClock> {
        Synthesizer::new()
    }
}

impl<C: Clock> Synthesizer<C> {
    pub fn with_clock(clock: C) -> Synthesizer<C> {
        Synthesizer { clock }
    }

    /// Renders `config` as a yaml manifest of the given type.
    ///
    /// The output always carries `apiVersion` and `kind` from the `K8sType`
    /// constants, never from the configuration, and emits the remaining fields
    /// in the schema's declaration order under their wire names. A field that
    /// is unset in the configuration is entirely absent from the output; a
    /// field set to an empty list is emitted as an empty sequence. The yaml
    /// text is therefore a pure function of `(schema, config, k8s_type)` and
    /// only the `id` differs between calls.
    pub fn synthesize(
        &self,
        schema: &Schema,
        config: &ConfigObject,
        k8s_type: &K8sType,
    ) -> Result<ManifestRecord, SerializationError> {
        let manifest = render_manifest(schema, config, k8s_type);
        let yaml = serde_yaml::to_string(&manifest)?;
        let id = self.clock.now_nanos();
        let metadata = config.get_object("metadata").cloned().unwrap_or_default();
        log::debug!(
            "synthesized manifest for {} '{}' with id {}",
            k8s_type,
            metadata.get_str("name").unwrap_or("<unnamed>"),
            id
        );
        Ok(ManifestRecord {
            id,
            yaml,
            api_version: k8s_type.api_version.to_owned(),
            kind: k8s_type.kind.to_owned(),
            metadata,
        })
    }
}

fn yaml_key(key: &str) -> YamlValue {
    YamlValue::String(key.to_owned())
}

// wire keys that only the synthesizer may write at the document root
static RESERVED_KEYS: &[&str] = &["apiVersion", "kind"];

fn render_manifest(schema: &Schema, config: &ConfigObject, k8s_type: &K8sType) -> YamlValue {
    let mut root = Mapping::new();
    // apiVersion and kind are always computed from the type constants,
    // regardless of anything the caller set in the configuration
    root.insert(yaml_key("apiVersion"), yaml_key(k8s_type.api_version));
    root.insert(yaml_key("kind"), yaml_key(k8s_type.kind));
    render_fields(&mut root, schema, config, RESERVED_KEYS);
    YamlValue::Mapping(root)
}

fn render_fields(out: &mut Mapping, schema: &Schema, config: &ConfigObject, reserved: &[&str]) {
    for field in schema.fields() {
        if field.cardinality() == Cardinality::Computed {
            continue;
        }
        if let Some(value) = config.get(field.name()) {
            out.insert(yaml_key(field.wire_name()), render_value(field, value));
        }
    }
    // Fields that are set but undeclared can only be present when validation
    // was skipped. Serialization stays total: they are appended after the
    // schema-ordered fields, in the configuration's own stable order. The
    // reserved keys remain off limits so that the stamped values can never be
    // overwritten.
    for (name, value) in config.iter() {
        if schema.field(name).is_none() && !reserved.contains(&name.as_str()) {
            out.insert(yaml_key(name), render_untyped(value));
        }
    }
}

fn render_value(field: &Field, value: &ConfigValue) -> YamlValue {
    render_typed(field.field_type(), value)
}

fn render_typed(field_type: &FieldType, value: &ConfigValue) -> YamlValue {
    match (field_type, value) {
        (&FieldType::Object(ref schema), &ConfigValue::Object(ref obj)) => {
            let mut nested = Mapping::new();
            render_fields(&mut nested, schema, obj, &[]);
            YamlValue::Mapping(nested)
        }
        (&FieldType::List(ref element_type), &ConfigValue::List(ref items)) => YamlValue::Sequence(
            items
                .iter()
                .map(|item| render_typed(element_type, item))
                .collect(),
        ),
        // string maps have no schema ordering; the configuration's own key
        // order is already deterministic
        (_, value) => render_untyped(value),
    }
}

fn render_untyped(value: &ConfigValue) -> YamlValue {
    match *value {
        ConfigValue::String(ref s) => YamlValue::String(s.clone()),
        ConfigValue::Integer(i) => YamlValue::Number(i.into()),
        ConfigValue::Boolean(b) => YamlValue::Bool(b),
        ConfigValue::List(ref items) => {
            YamlValue::Sequence(items.iter().map(render_untyped).collect())
        }
        ConfigValue::Object(ref obj) => {
            let mut map = Mapping::new();
            for (key, val) in obj.iter() {
                map.insert(yaml_key(key), render_untyped(val));
            }
            YamlValue::Mapping(map)
        }
    }
}
