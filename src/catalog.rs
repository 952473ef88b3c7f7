//! Built-in resource type definitions. Each one is nothing but data: a name, a
//! `K8sType`, and a schema built from field descriptors. The single generic
//! validation and synthesis walk does the rest, which is the whole point of
//! the table-driven design; adding a resource type means declaring another
//! table, not writing another module.
//!
//! The built-ins here cover a few common kinds and one CRD. They are starting
//! points, not an attempt at full coverage of the upstream APIs; most callers
//! will declare their own `ResourceType` for the CRDs they care about.

use crate::k8s_types::{self, K8sType};
use crate::provider::ResourceType;
use crate::schema::{Field, FieldType, Schema};

use lazy_static::lazy_static;

const DNS_SUBDOMAIN_PATTERN: &str =
    "^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$";
const DNS_LABEL_PATTERN: &str = "^[a-z0-9]([-a-z0-9]*[a-z0-9])?$";

/// The standard object metadata sub-schema shared by every resource type:
/// a required DNS-1123 `name`, an optional `namespace`, and the two string
/// maps. Resources never configure `uid`, `resourceVersion`, or the other
/// server-populated metadata fields, so they are not declared.
pub fn metadata_schema() -> Schema {
    Schema::new()
        .with_field(
            Field::string("name")
                .required()
                .matching(DNS_SUBDOMAIN_PATTERN)
                .max_length(253),
        )
        .with_field(
            Field::string("namespace")
                .matching(DNS_LABEL_PATTERN)
                .max_length(63),
        )
        .with_field(Field::string_map("labels"))
        .with_field(Field::string_map("annotations"))
}

/// Every manifest schema starts the same way: the two computed identity
/// fields plus required metadata
fn manifest_schema() -> Schema {
    Schema::new()
        .with_field(Field::string("api_version").computed())
        .with_field(Field::string("kind").computed())
        .with_field(Field::object("metadata", metadata_schema()).required())
}

fn container_schema() -> Schema {
    Schema::new()
        .with_field(Field::string("name").required().matching(DNS_LABEL_PATTERN))
        .with_field(Field::string("image").required())
        .with_field(
            Field::string("image_pull_policy").one_of(&["Always", "IfNotPresent", "Never"]),
        )
        .with_field(Field::list("command", FieldType::String))
        .with_field(Field::list("args", FieldType::String))
        .with_field(Field::list(
            "env",
            FieldType::Object(
                Schema::new()
                    .with_field(Field::string("name").required())
                    .with_field(Field::string("value")),
            ),
        ))
        .with_field(Field::list(
            "ports",
            FieldType::Object(
                Schema::new()
                    .with_field(Field::string("name"))
                    .with_field(
                        Field::integer("container_port")
                            .required()
                            .at_least(1)
                            .at_most(65535),
                    )
                    .with_field(Field::string("protocol").one_of(&["TCP", "UDP", "SCTP"])),
            ),
        ))
}

fn pod_template_schema() -> Schema {
    Schema::new()
        .with_field(Field::object(
            "metadata",
            Schema::new()
                .with_field(Field::string_map("labels"))
                .with_field(Field::string_map("annotations")),
        ))
        .with_field(Field::object(
            "spec",
            Schema::new()
                .with_field(
                    Field::list("containers", FieldType::Object(container_schema()))
                        .required()
                        .min_length(1),
                )
                .with_field(Field::string("service_account_name"))
                .with_field(Field::string("restart_policy").one_of(&["Always", "OnFailure", "Never"]))
                .with_field(Field::string_map("node_selector")),
        ))
}

fn deployment_schema() -> Schema {
    manifest_schema().with_field(Field::object(
        "spec",
        Schema::new()
            .with_field(Field::integer("replicas").at_least(0))
            .with_field(Field::object(
                "selector",
                Schema::new().with_field(Field::string_map("match_labels")),
            ))
            .with_field(Field::object("template", pod_template_schema()).required())
            .with_field(Field::integer("min_ready_seconds").at_least(0))
            .with_field(Field::boolean("paused")),
    ))
}

fn config_map_schema() -> Schema {
    manifest_schema()
        .with_field(Field::string_map("data"))
        .with_field(Field::boolean("immutable"))
}

fn service_schema() -> Schema {
    manifest_schema().with_field(Field::object(
        "spec",
        Schema::new()
            .with_field(Field::string_map("selector"))
            .with_field(
                Field::string("type").one_of(&["ClusterIP", "NodePort", "LoadBalancer", "ExternalName"]),
            )
            .with_field(Field::string("cluster_ip").with_wire_name("clusterIP"))
            .with_field(Field::list(
                "ports",
                FieldType::Object(
                    Schema::new()
                        .with_field(Field::string("name"))
                        .with_field(Field::integer("port").required().at_least(1).at_most(65535))
                        .with_field(Field::integer("target_port").at_least(1).at_most(65535))
                        .with_field(Field::integer("node_port").at_least(1).at_most(65535))
                        .with_field(Field::string("protocol").one_of(&["TCP", "UDP", "SCTP"])),
                ),
            )),
    ))
}

/// Argo CD's Application CRD, the canonical example of a kind this crate
/// exists for. The schema covers the commonly-configured subset.
fn argo_application_schema() -> Schema {
    manifest_schema().with_field(Field::object(
        "spec",
        Schema::new()
            .with_field(Field::string("project").required())
            .with_field(Field::object(
                "source",
                Schema::new()
                    .with_field(Field::string("repo_url").required().with_wire_name("repoURL"))
                    .with_field(Field::string("path"))
                    .with_field(Field::string("target_revision"))
                    .with_field(Field::string("chart")),
            ))
            .with_field(Field::object(
                "destination",
                Schema::new()
                    .with_field(Field::string("server"))
                    .with_field(Field::string("name"))
                    .with_field(Field::string("namespace")),
            ))
            .with_field(Field::object(
                "sync_policy",
                Schema::new()
                    .with_field(Field::object(
                        "automated",
                        Schema::new()
                            .with_field(Field::boolean("prune"))
                            .with_field(Field::boolean("self_heal")),
                    ))
                    .with_field(Field::list("sync_options", FieldType::String)),
            )),
    ))
}

#[allow(non_upper_case_globals)]
pub static Application: &K8sType = &K8sType {
    api_version: "argoproj.io/v1alpha1",
    kind: "Application",
    plural_kind: "applications",
};

lazy_static! {
    pub static ref DEPLOYMENT: ResourceType = ResourceType::new(
        "kubernetes_deployment",
        k8s_types::apps::v1::Deployment,
        deployment_schema(),
    );
    pub static ref CONFIG_MAP: ResourceType = ResourceType::new(
        "kubernetes_config_map",
        k8s_types::core::v1::ConfigMap,
        config_map_schema(),
    );
    pub static ref SERVICE: ResourceType = ResourceType::new(
        "kubernetes_service",
        k8s_types::core::v1::Service,
        service_schema(),
    );
    pub static ref ARGO_APPLICATION: ResourceType = ResourceType::new(
        "argocd_application",
        Application,
        argo_application_schema(),
    );
}
