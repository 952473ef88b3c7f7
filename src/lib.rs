//! Kubesynth renders Kubernetes resource manifests from declarative,
//! schema-checked configuration. Instead of hand-writing one rendering module
//! per kind, you describe each kind's configurable surface as a `Schema` (an
//! ordered table of field descriptors) and a single generic synthesizer turns
//! any validated configuration tree into a yaml manifest plus a synthetic,
//! change-detectable state id.
//!
//! The crate never talks to a Kubernetes API server. The manifests it produces
//! are meant to be applied by something else: piped into `kubectl apply`,
//! committed to a GitOps repo, or handed to whatever deployment machinery you
//! already run.
//!
//! Synthesizing a manifest for a custom resource:
//! ```
//! use kubesynth::prelude::*;
//! use kubesynth::serde_json::json;
//!
//! // a `K8sType` holds the identity constants for the kind
//! static CACHE_TYPE: &K8sType = &K8sType {
//!     api_version: "example.com/v1alpha1",
//!     kind: "Cache",
//!     plural_kind: "caches",
//! };
//!
//! // the configurable surface of the kind, declared as data. The two identity
//! // fields are computed: the synthesizer stamps them, callers cannot
//! let schema = Schema::new()
//!     .with_field(Field::string("api_version").computed())
//!     .with_field(Field::string("kind").computed())
//!     .with_field(Field::object("metadata", kubesynth::catalog::metadata_schema()).required())
//!     .with_field(Field::object("spec", Schema::new()
//!         .with_field(Field::integer("replicas").at_least(1))
//!         .with_field(Field::string("engine").one_of(&["redis", "memcached"]))));
//!
//! let config = ConfigObject::from_json(json!({
//!     "metadata": { "name": "session-cache" },
//!     "spec": { "replicas": 3, "engine": "redis" }
//! })).expect("configuration is representable");
//!
//! schema.validate(&config).expect("configuration matches the schema");
//!
//! let record = Synthesizer::new()
//!     .synthesize(&schema, &config, CACHE_TYPE)
//!     .expect("schema-checked input always serializes");
//!
//! assert!(record.yaml.contains("apiVersion: example.com/v1alpha1"));
//! assert!(record.yaml.contains("kind: Cache"));
//! assert!(record.yaml.contains("replicas: 3"));
//! ```
//!
//! For serving a whole family of resource types behind the usual
//! create/update/read/delete lifecycle, register them with a
//! `provider::Provider`. Create and update validate and synthesize; read and
//! delete are no-ops by design, since there is no live system behind them.

#[macro_use]
extern crate serde_derive;

pub mod catalog;
pub mod error;
pub mod k8s_types;
pub mod provider;
pub mod schema;
pub mod synthesis;
pub mod value;

pub use serde;
pub use serde_json;
pub use serde_yaml;

pub mod prelude {
    pub use crate::error::Error;
    pub use crate::k8s_types::{self, K8sType};
    pub use crate::provider::{Provider, ProviderConfig, ResourceType};
    pub use crate::schema::{Cardinality, Field, FieldType, Schema, ValidationError};
    pub use crate::synthesis::{
        Clock, FixedClock, ManifestRecord, SerializationError, Synthesizer, SystemClock,
    };
    pub use crate::value::{ConfigObject, ConfigValue};
    pub use serde::{Deserialize, Serialize};
}
