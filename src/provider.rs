//! The resource lifecycle layer: a registry of resource types plus the four
//! lifecycle operations. Only create and update do any work, and both do the
//! same work: validate the configuration against the type's schema, then
//! synthesize a fresh manifest record. Read and delete are deliberate no-ops,
//! because no Kubernetes API server is ever contacted; the rendered manifests
//! are handed to whatever applies them (piped into `kubectl apply`, committed
//! to a GitOps repo, and so on), and the record is simply discarded on delete.

use crate::error::{Error, UnknownResourceTypeError};
use crate::k8s_types::K8sType;
use crate::schema::Schema;
use crate::synthesis::{Clock, ManifestRecord, Synthesizer, SystemClock};
use crate::value::ConfigObject;

use std::collections::HashMap;

/// One registered resource type: its lookup name, its Group/Version/Kind
/// constants, and the schema its configuration is validated against. The name
/// is what callers address the type by, e.g. `"kubernetes_deployment"`.
#[derive(Debug, Clone)]
pub struct ResourceType {
    pub name: String,
    pub k8s_type: &'static K8sType,
    pub schema: Schema,
}

impl ResourceType {
    pub fn new(name: impl Into<String>, k8s_type: &'static K8sType, schema: Schema) -> ResourceType {
        ResourceType {
            name: name.into(),
            k8s_type,
            schema,
        }
    }
}

/// Describes the set of resource types a provider serves
#[derive(Debug, Clone, Default)]
pub struct ProviderConfig {
    pub provider_name: String,
    resource_types: HashMap<String, ResourceType>,
}

impl ProviderConfig {
    pub fn new(provider_name: impl Into<String>) -> ProviderConfig {
        ProviderConfig {
            provider_name: provider_name.into(),
            resource_types: HashMap::new(),
        }
    }

    pub fn with_resource(mut self, resource_type: ResourceType) -> ProviderConfig {
        self.resource_types
            .insert(resource_type.name.clone(), resource_type);
        self
    }

    pub fn resource_type(&self, name: &str) -> Option<&ResourceType> {
        self.resource_types.get(name)
    }

    pub fn resource_type_names(&self) -> impl Iterator<Item = &str> {
        self.resource_types.keys().map(String::as_str)
    }
}

/// Serves lifecycle operations for a set of registered resource types
#[derive(Debug, Clone)]
pub struct Provider<C: Clock = SystemClock> {
    config: ProviderConfig,
    synthesizer: Synthesizer<C>,
}

impl Provider<SystemClock> {
    pub fn new(config: ProviderConfig) -> Provider<SystemClock> {
        Provider {
            config,
            synthesizer: Synthesizer::new(),
        }
    }
}

impl<C: Clock> Provider<C> {
    pub fn with_clock(config: ProviderConfig, clock: C) -> Provider<C> {
        Provider {
            config,
            synthesizer: Synthesizer::with_clock(clock),
        }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Validates the configuration and synthesizes a new manifest record
    pub fn create(&self, type_name: &str, config: &ConfigObject) -> Result<ManifestRecord, Error> {
        let resource_type = self
            .config
            .resource_type(type_name)
            .ok_or_else(|| UnknownResourceTypeError::new(type_name))?;
        resource_type.schema.validate(config)?;
        let record = self
            .synthesizer
            .synthesize(&resource_type.schema, config, resource_type.k8s_type)?;
        log::debug!(
            "provider '{}' created record {} for resource type '{}'",
            self.config.provider_name,
            record.id,
            type_name
        );
        Ok(record)
    }

    /// Identical semantics to `create`: an update does not modify the previous
    /// record, it replaces it with a freshly synthesized one
    pub fn update(&self, type_name: &str, config: &ConfigObject) -> Result<ManifestRecord, Error> {
        let record = self.create(type_name, config)?;
        log::debug!(
            "provider '{}' replaced state for resource type '{}' with record {}",
            self.config.provider_name,
            type_name,
            record.id
        );
        Ok(record)
    }

    /// No-op: there is no live system to read from, so the stored record is
    /// already the whole truth
    pub fn read(&self, record: &ManifestRecord) -> ManifestRecord {
        record.clone()
    }

    /// No-op: the record is dropped and nothing else needs to happen
    pub fn delete(&self, record: ManifestRecord) {
        log::debug!(
            "provider '{}' discarded record {}",
            self.config.provider_name,
            record.id
        );
    }
}
