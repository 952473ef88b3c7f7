//! Declarative schema descriptors for resource types. One `Schema` describes the
//! configurable surface of one version of one Kubernetes kind as plain data: an
//! ordered list of fields, each with a configuration-facing name, a canonical
//! wire name, a type, a cardinality, and zero or more constraints. A single
//! generic walk over this data replaces the per-resource validation and
//! rendering code that would otherwise be duplicated for every kind.
//!
//! Schemas are ordered: rendered manifests emit fields in declaration order,
//! not in the order the caller happened to set them, so manifests produced from
//! the same configuration are diffable across runs.

use crate::value::{ConfigObject, ConfigValue};

use regex::Regex;

use std::fmt::{self, Display, Write};

/// Whether a field must be set, may be set, or is computed by the synthesizer.
/// Computed fields (`api_version`, `kind`) are output-only: validation ignores
/// any caller-supplied value and synthesis always overwrites it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Cardinality {
    Required,
    Optional,
    Computed,
}

/// The type of a single field. `StringMap` is a map of string to string
/// (labels, annotations, node selectors), represented in configuration as an
/// object whose values are all strings.
#[derive(Debug, Clone)]
pub enum FieldType {
    String,
    Integer,
    Boolean,
    StringMap,
    List(Box<FieldType>),
    Object(Schema),
}

impl FieldType {
    fn name(&self) -> &'static str {
        match *self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Boolean => "boolean",
            FieldType::StringMap => "map of string to string",
            FieldType::List(_) => "list",
            FieldType::Object(_) => "object",
        }
    }
}

/// A value constraint, checked by `Schema::validate` after the type check
/// passes for the field.
#[derive(Debug, Clone)]
pub enum Constraint {
    /// string must be one of the given values
    OneOf(Vec<String>),
    /// string must match the given pattern
    Pattern(Regex),
    /// inclusive numeric bounds
    Range { min: Option<i64>, max: Option<i64> },
    /// inclusive length bounds for strings and lists
    Length { min: Option<usize>, max: Option<usize> },
}

/// Descriptor for a single field. The `wire_name` is the key the field is
/// serialized under, which is derived from the configuration-facing `name` by
/// snake_case to camelCase conversion unless overridden (`api_version` becomes
/// `apiVersion` on the wire).
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    wire_name: String,
    field_type: FieldType,
    cardinality: Cardinality,
    constraints: Vec<Constraint>,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Field {
        let name = name.into();
        let wire_name = wire_name_of(&name);
        Field {
            name,
            wire_name,
            field_type,
            cardinality: Cardinality::Optional,
            constraints: Vec::new(),
        }
    }

    pub fn string(name: impl Into<String>) -> Field {
        Field::new(name, FieldType::String)
    }

    pub fn integer(name: impl Into<String>) -> Field {
        Field::new(name, FieldType::Integer)
    }

    pub fn boolean(name: impl Into<String>) -> Field {
        Field::new(name, FieldType::Boolean)
    }

    pub fn string_map(name: impl Into<String>) -> Field {
        Field::new(name, FieldType::StringMap)
    }

    pub fn list(name: impl Into<String>, element_type: FieldType) -> Field {
        Field::new(name, FieldType::List(Box::new(element_type)))
    }

    pub fn object(name: impl Into<String>, schema: Schema) -> Field {
        Field::new(name, FieldType::Object(schema))
    }

    pub fn required(mut self) -> Field {
        self.cardinality = Cardinality::Required;
        self
    }

    pub fn computed(mut self) -> Field {
        self.cardinality = Cardinality::Computed;
        self
    }

    /// Overrides the derived wire name, for the cases where the canonical key
    /// is not a mechanical camelCase of the configuration name (e.g. `host_ipc`
    /// serializes as `hostIPC`)
    pub fn with_wire_name(mut self, wire_name: impl Into<String>) -> Field {
        self.wire_name = wire_name.into();
        self
    }

    pub fn one_of(mut self, values: &[&str]) -> Field {
        let values = values.iter().map(|v| (*v).to_owned()).collect();
        self.constraints.push(Constraint::OneOf(values));
        self
    }

    /// Constrains string values to the given regex. Schemas are static data
    /// declared at startup, so an invalid pattern is a programming error and
    /// panics immediately rather than surfacing at validation time.
    pub fn matching(mut self, pattern: &str) -> Field {
        let regex = Regex::new(pattern).expect("invalid field constraint pattern");
        self.constraints.push(Constraint::Pattern(regex));
        self
    }

    pub fn at_least(mut self, min: i64) -> Field {
        self.push_range(Some(min), None);
        self
    }

    pub fn at_most(mut self, max: i64) -> Field {
        self.push_range(None, Some(max));
        self
    }

    pub fn min_length(mut self, min: usize) -> Field {
        self.constraints.push(Constraint::Length {
            min: Some(min),
            max: None,
        });
        self
    }

    pub fn max_length(mut self, max: usize) -> Field {
        self.constraints.push(Constraint::Length {
            min: None,
            max: Some(max),
        });
        self
    }

    fn push_range(&mut self, min: Option<i64>, max: Option<i64>) {
        self.constraints.push(Constraint::Range { min, max });
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn wire_name(&self) -> &str {
        &self.wire_name
    }

    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }
}

/// An ordered collection of field descriptors
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn new() -> Schema {
        Schema { fields: Vec::new() }
    }

    pub fn with_field(mut self, field: Field) -> Schema {
        self.fields.push(field);
        self
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Validates a configuration tree against this schema: required fields must
    /// be set, every set field must be declared, types must agree recursively,
    /// and constraints must hold. This is the boundary that lets synthesis
    /// assume well-formed input; the synthesizer itself never re-checks.
    ///
    /// Caller-supplied values for computed fields are ignored rather than
    /// rejected, since the synthesizer overwrites them unconditionally.
    pub fn validate(&self, config: &ConfigObject) -> Result<(), ValidationError> {
        let mut path = Vec::with_capacity(8);
        self.validate_object(&mut path, config)
    }

    fn validate_object<'a>(
        &'a self,
        path: &mut Vec<Segment<'a>>,
        config: &'a ConfigObject,
    ) -> Result<(), ValidationError> {
        for field in self.fields.iter() {
            match (field.cardinality, config.get(&field.name)) {
                (Cardinality::Computed, Some(_)) => {
                    log::debug!(
                        "ignoring caller-supplied value for computed field: {}",
                        format_path(path, Some(field.name.as_str()))
                    );
                }
                (Cardinality::Computed, None) => {}
                (Cardinality::Required, None) => {
                    return Err(ValidationError::MissingField {
                        path: format_path(path, Some(field.name.as_str())),
                    });
                }
                (_, Some(value)) => {
                    path.push(Segment::Key(&field.name));
                    validate_value(path, &field.field_type, value)?;
                    for constraint in field.constraints.iter() {
                        check_constraint(path, constraint, value)?;
                    }
                    path.pop();
                }
                (Cardinality::Optional, None) => {}
            }
        }
        for (name, _) in config.iter() {
            if self.field(name).is_none() {
                return Err(ValidationError::UnknownField {
                    path: format_path(path, Some(name.as_str())),
                });
            }
        }
        Ok(())
    }
}

fn validate_value<'a>(
    path: &mut Vec<Segment<'a>>,
    expected: &'a FieldType,
    value: &'a ConfigValue,
) -> Result<(), ValidationError> {
    match (expected, value) {
        (&FieldType::String, &ConfigValue::String(_)) => Ok(()),
        (&FieldType::Integer, &ConfigValue::Integer(_)) => Ok(()),
        (&FieldType::Boolean, &ConfigValue::Boolean(_)) => Ok(()),
        (&FieldType::StringMap, &ConfigValue::Object(ref entries)) => {
            for (key, entry) in entries.iter() {
                if entry.as_str().is_none() {
                    path.push(Segment::Key(key));
                    let err = ValidationError::TypeMismatch {
                        path: format_path(path, None),
                        expected: "string",
                        actual: entry.type_name(),
                    };
                    path.pop();
                    return Err(err);
                }
            }
            Ok(())
        }
        (&FieldType::List(ref element_type), &ConfigValue::List(ref items)) => {
            for (index, item) in items.iter().enumerate() {
                path.push(Segment::Index(index));
                let result = validate_value(path, element_type, item);
                path.pop();
                result?;
            }
            Ok(())
        }
        (&FieldType::Object(ref schema), &ConfigValue::Object(ref obj)) => {
            schema.validate_object(path, obj)
        }
        (expected, actual) => Err(ValidationError::TypeMismatch {
            path: format_path(path, None),
            expected: expected.name(),
            actual: actual.type_name(),
        }),
    }
}

fn check_constraint(
    path: &[Segment],
    constraint: &Constraint,
    value: &ConfigValue,
) -> Result<(), ValidationError> {
    let violation = |message: String| ValidationError::Constraint {
        path: format_path(path, None),
        message,
    };
    match (constraint, value) {
        (&Constraint::OneOf(ref allowed), &ConfigValue::String(ref s)) => {
            if allowed.iter().any(|a| a == s) {
                Ok(())
            } else {
                Err(violation(format!(
                    "value '{}' is not one of the allowed values: {}",
                    s,
                    allowed.join(", ")
                )))
            }
        }
        (&Constraint::Pattern(ref regex), &ConfigValue::String(ref s)) => {
            if regex.is_match(s) {
                Ok(())
            } else {
                Err(violation(format!(
                    "value '{}' does not match the pattern '{}'",
                    s,
                    regex.as_str()
                )))
            }
        }
        (&Constraint::Range { min, max }, &ConfigValue::Integer(i)) => {
            if let Some(min) = min {
                if i < min {
                    return Err(violation(format!("value {} is less than the minimum {}", i, min)));
                }
            }
            if let Some(max) = max {
                if i > max {
                    return Err(violation(format!("value {} is greater than the maximum {}", i, max)));
                }
            }
            Ok(())
        }
        (&Constraint::Length { min, max }, value) => {
            let len = match *value {
                ConfigValue::String(ref s) => s.chars().count(),
                ConfigValue::List(ref items) => items.len(),
                // length constraints only apply to strings and lists; the type
                // check has already run, so anything else is a schema that
                // declared a length bound on a scalar, which we let pass
                _ => return Ok(()),
            };
            if let Some(min) = min {
                if len < min {
                    return Err(violation(format!("length {} is less than the minimum {}", len, min)));
                }
            }
            if let Some(max) = max {
                if len > max {
                    return Err(violation(format!("length {} is greater than the maximum {}", len, max)));
                }
            }
            Ok(())
        }
        // constraint applies to a type the value doesn't have; the type check
        // has already passed, so this only happens for mis-declared schemas
        _ => Ok(()),
    }
}

enum Segment<'a> {
    Key(&'a str),
    Index(usize),
}

fn format_path(path: &[Segment], last: Option<&str>) -> String {
    let mut formatted = String::with_capacity(16);
    for segment in path.iter() {
        formatted.push('.');
        match *segment {
            Segment::Key(key) => formatted.push_str(key),
            Segment::Index(index) => {
                write!(formatted, "{}", index).unwrap();
            }
        }
    }
    if let Some(last) = last {
        formatted.push('.');
        formatted.push_str(last);
    }
    if formatted.is_empty() {
        formatted.push('.');
    }
    formatted
}

/// Error raised when a configuration tree violates its declared schema. The
/// `path` in each variant is the dotted path to the offending field.
#[derive(Debug, PartialEq, Clone)]
pub enum ValidationError {
    MissingField {
        path: String,
    },
    UnknownField {
        path: String,
    },
    TypeMismatch {
        path: String,
        expected: &'static str,
        actual: &'static str,
    },
    Constraint {
        path: String,
        message: String,
    },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ValidationError::MissingField { ref path } => {
                write!(f, "required field '{}' is not set", path)
            }
            ValidationError::UnknownField { ref path } => {
                write!(f, "field '{}' is not declared by the schema", path)
            }
            ValidationError::TypeMismatch {
                ref path,
                expected,
                actual,
            } => write!(
                f,
                "field '{}' must be a {}, but the configured value is a {}",
                path, expected, actual
            ),
            ValidationError::Constraint {
                ref path,
                ref message,
            } => write!(f, "field '{}': {}", path, message),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Derives the canonical wire name from a snake_case configuration name:
/// the first segment stays lowercase and each subsequent segment is
/// capitalized, so `api_version` becomes `apiVersion`
pub fn wire_name_of(name: &str) -> String {
    let mut wire = String::with_capacity(name.len());
    let mut capitalize_next = false;
    for ch in name.chars() {
        if ch == '_' {
            capitalize_next = true;
        } else if capitalize_next {
            wire.extend(ch.to_uppercase());
            capitalize_next = false;
        } else {
            wire.push(ch);
        }
    }
    wire
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::value::ConfigObject;
    use serde_json::json;

    fn cache_schema() -> Schema {
        Schema::new()
            .with_field(Field::string("api_version").computed())
            .with_field(Field::string("kind").computed())
            .with_field(
                Field::object(
                    "metadata",
                    Schema::new()
                        .with_field(Field::string("name").required().matching("^[a-z0-9]([-a-z0-9]*[a-z0-9])?$"))
                        .with_field(Field::string_map("labels")),
                )
                .required(),
            )
            .with_field(Field::object(
                "spec",
                Schema::new()
                    .with_field(Field::integer("replicas").at_least(1).at_most(100))
                    .with_field(Field::string("engine").one_of(&["redis", "memcached"]))
                    .with_field(Field::list("args", FieldType::String).max_length(4)),
            ))
    }

    fn config(value: serde_json::Value) -> ConfigObject {
        ConfigObject::from_json(value).unwrap()
    }

    #[test]
    fn valid_configuration_passes() {
        let conf = config(json!({
            "metadata": { "name": "cache-one", "labels": { "app": "cache" } },
            "spec": { "replicas": 3, "engine": "redis", "args": ["--verbose"] }
        }));
        cache_schema().validate(&conf).unwrap();
    }

    #[test]
    fn missing_required_field_names_the_path() {
        let conf = config(json!({ "metadata": {} }));
        let err = cache_schema().validate(&conf).unwrap_err();
        assert_eq!(
            ValidationError::MissingField {
                path: ".metadata.name".to_owned()
            },
            err
        );
    }

    #[test]
    fn unknown_field_is_rejected() {
        let conf = config(json!({
            "metadata": { "name": "cache-one" },
            "spec": { "replicaz": 3 }
        }));
        let err = cache_schema().validate(&conf).unwrap_err();
        assert_eq!(
            ValidationError::UnknownField {
                path: ".spec.replicaz".to_owned()
            },
            err
        );
    }

    #[test]
    fn type_mismatch_reports_expected_and_actual() {
        let conf = config(json!({
            "metadata": { "name": "cache-one" },
            "spec": { "replicas": "three" }
        }));
        let err = cache_schema().validate(&conf).unwrap_err();
        assert_eq!(
            ValidationError::TypeMismatch {
                path: ".spec.replicas".to_owned(),
                expected: "integer",
                actual: "string",
            },
            err
        );
    }

    #[test]
    fn string_map_entries_must_be_strings() {
        let conf = config(json!({
            "metadata": { "name": "cache-one", "labels": { "replicas": 3 } }
        }));
        let err = cache_schema().validate(&conf).unwrap_err();
        assert_eq!(
            ValidationError::TypeMismatch {
                path: ".metadata.labels.replicas".to_owned(),
                expected: "string",
                actual: "integer",
            },
            err
        );
    }

    #[test]
    fn list_elements_are_validated_with_their_index_in_the_path() {
        let conf = config(json!({
            "metadata": { "name": "cache-one" },
            "spec": { "args": ["fine", 7] }
        }));
        let err = cache_schema().validate(&conf).unwrap_err();
        assert_eq!(
            ValidationError::TypeMismatch {
                path: ".spec.args.1".to_owned(),
                expected: "string",
                actual: "integer",
            },
            err
        );
    }

    #[test]
    fn enum_constraint_is_enforced() {
        let conf = config(json!({
            "metadata": { "name": "cache-one" },
            "spec": { "engine": "varnish" }
        }));
        let err = cache_schema().validate(&conf).unwrap_err();
        match err {
            ValidationError::Constraint { path, .. } => assert_eq!(".spec.engine", path),
            other => panic!("expected constraint violation, got: {}", other),
        }
    }

    #[test]
    fn pattern_constraint_is_enforced() {
        let conf = config(json!({ "metadata": { "name": "Not-Valid" } }));
        let err = cache_schema().validate(&conf).unwrap_err();
        match err {
            ValidationError::Constraint { path, .. } => assert_eq!(".metadata.name", path),
            other => panic!("expected constraint violation, got: {}", other),
        }
    }

    #[test]
    fn numeric_bounds_are_inclusive() {
        let schema = cache_schema();
        let at_min = config(json!({ "metadata": { "name": "c" }, "spec": { "replicas": 1 } }));
        schema.validate(&at_min).unwrap();

        let below_min = config(json!({ "metadata": { "name": "c" }, "spec": { "replicas": 0 } }));
        assert!(schema.validate(&below_min).is_err());

        let above_max = config(json!({ "metadata": { "name": "c" }, "spec": { "replicas": 101 } }));
        assert!(schema.validate(&above_max).is_err());
    }

    #[test]
    fn list_length_bound_is_enforced() {
        let conf = config(json!({
            "metadata": { "name": "c" },
            "spec": { "args": ["a", "b", "c", "d", "e"] }
        }));
        assert!(cache_schema().validate(&conf).is_err());
    }

    #[test]
    fn computed_fields_supplied_by_the_caller_are_ignored() {
        let conf = config(json!({
            "api_version": "caller/v1",
            "kind": "Sneaky",
            "metadata": { "name": "cache-one" }
        }));
        cache_schema().validate(&conf).unwrap();
    }

    #[test]
    fn wire_names_are_derived_from_snake_case() {
        assert_eq!("apiVersion", wire_name_of("api_version"));
        assert_eq!("replicas", wire_name_of("replicas"));
        assert_eq!("imagePullPolicy", wire_name_of("image_pull_policy"));
    }

    #[test]
    fn wire_name_can_be_overridden() {
        let field = Field::boolean("host_ipc").with_wire_name("hostIPC");
        assert_eq!("hostIPC", field.wire_name());
    }
}
