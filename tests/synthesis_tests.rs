use kubesynth::catalog;
use kubesynth::prelude::*;
use kubesynth::serde_json::json;

use std::time::Duration;

fn init_logging() {
    std::env::set_var("RUST_LOG", "kubesynth=debug");
    let _ = env_logger::try_init();
}

fn provider() -> Provider {
    init_logging();
    let config = ProviderConfig::new("kubesynth-tests")
        .with_resource(catalog::DEPLOYMENT.clone())
        .with_resource(catalog::CONFIG_MAP.clone())
        .with_resource(catalog::SERVICE.clone())
        .with_resource(catalog::ARGO_APPLICATION.clone());
    Provider::new(config)
}

fn config(value: kubesynth::serde_json::Value) -> ConfigObject {
    ConfigObject::from_json(value).expect("fixture must be representable")
}

fn deployment_schema() -> Schema {
    catalog::DEPLOYMENT.schema.clone()
}

#[test]
fn minimal_deployment_renders_only_the_configured_fields() {
    init_logging();
    let conf = config(json!({
        "metadata": { "name": "foo" },
        "spec": {
            "replicas": 3,
            "template": {
                "spec": { "containers": [ { "name": "app", "image": "busybox:latest" } ] }
            }
        }
    }));
    let schema = deployment_schema();
    schema.validate(&conf).expect("fixture is valid");

    let record = Synthesizer::with_clock(FixedClock(1))
        .synthesize(&schema, &conf, k8s_types::apps::v1::Deployment)
        .expect("synthesis succeeds");

    assert!(record.yaml.contains("apiVersion: apps/v1"));
    assert!(record.yaml.contains("kind: Deployment"));
    assert!(record.yaml.contains("metadata:\n  name: foo"));
    assert!(record.yaml.contains("replicas: 3"));
    assert!(!record.yaml.contains("namespace"));
    assert!(!record.yaml.contains("labels"));
    assert!(!record.yaml.contains("annotations"));
    assert!(!record.yaml.contains("null"));
}

#[test]
fn unset_nested_object_is_entirely_absent_from_the_output() {
    init_logging();
    let conf = config(json!({
        "metadata": { "name": "guestbook" },
        "spec": {
            "project": "default",
            "destination": { "namespace": "guestbook" }
        }
    }));
    let schema = catalog::ARGO_APPLICATION.schema.clone();
    schema.validate(&conf).expect("fixture is valid");

    let record = Synthesizer::with_clock(FixedClock(1))
        .synthesize(&schema, &conf, catalog::Application)
        .expect("synthesis succeeds");

    assert!(!record.yaml.contains("syncPolicy"));
    assert!(!record.yaml.contains("source"));
    assert!(record.yaml.contains("destination:\n    namespace: guestbook"));
}

#[test]
fn empty_list_is_distinguishable_from_an_absent_list() {
    init_logging();
    let schema = Schema::new()
        .with_field(
            Field::object(
                "metadata",
                Schema::new().with_field(Field::string("name").required()),
            )
            .required(),
        )
        .with_field(Field::object(
            "spec",
            Schema::new().with_field(Field::list("sync_options", FieldType::String)),
        ));

    let with_empty = config(json!({
        "metadata": { "name": "app" },
        "spec": { "sync_options": [] }
    }));
    let without = config(json!({
        "metadata": { "name": "app" },
        "spec": {}
    }));

    let synthesizer = Synthesizer::with_clock(FixedClock(1));
    let rendered_empty = synthesizer
        .synthesize(&schema, &with_empty, catalog::Application)
        .unwrap();
    let rendered_absent = synthesizer
        .synthesize(&schema, &without, catalog::Application)
        .unwrap();

    assert!(rendered_empty.yaml.contains("syncOptions: []"));
    assert!(!rendered_absent.yaml.contains("syncOptions"));
}

#[test]
fn caller_supplied_identity_fields_never_reach_the_output() {
    init_logging();
    let conf = config(json!({
        "api_version": "hijacked/v1",
        "kind": "Hijacked",
        "metadata": { "name": "foo" }
    }));
    let record = Synthesizer::with_clock(FixedClock(1))
        .synthesize(&deployment_schema(), &conf, k8s_types::apps::v1::Deployment)
        .unwrap();

    assert_eq!("apps/v1", record.api_version);
    assert_eq!("Deployment", record.kind);
    assert!(!record.yaml.contains("hijacked/v1"));
    assert!(!record.yaml.contains("Hijacked"));
}

#[test]
fn re_synthesis_of_unchanged_configuration_is_idempotent_modulo_id() {
    let provider = provider();
    let conf = config(json!({
        "metadata": { "name": "settings", "namespace": "prod" },
        "data": { "retries": "3", "timeout": "30s" }
    }));

    let created = provider.create("kubernetes_config_map", &conf).unwrap();
    std::thread::sleep(Duration::from_millis(5));
    let updated = provider.update("kubernetes_config_map", &conf).unwrap();

    assert_eq!(created.yaml, updated.yaml);
    assert_eq!(created.api_version, updated.api_version);
    assert_eq!(created.kind, updated.kind);
    assert_eq!(created.metadata, updated.metadata);
    assert_ne!(created.id, updated.id);
}

#[test]
fn sequential_records_get_strictly_increasing_ids() {
    let provider = provider();
    let conf = config(json!({ "metadata": { "name": "settings" } }));

    let first = provider.create("kubernetes_config_map", &conf).unwrap();
    std::thread::sleep(Duration::from_millis(10));
    let second = provider.create("kubernetes_config_map", &conf).unwrap();

    assert!(second.id > first.id);
}

#[test]
fn full_deployment_round_trip_through_the_provider() {
    let provider = provider();
    let conf = config(json!({
        "metadata": {
            "name": "web",
            "namespace": "prod",
            "labels": { "app": "web" }
        },
        "spec": {
            "replicas": 2,
            "selector": { "match_labels": { "app": "web" } },
            "template": {
                "metadata": { "labels": { "app": "web" } },
                "spec": {
                    "containers": [
                        {
                            "name": "web",
                            "image": "nginx:1.25",
                            "image_pull_policy": "IfNotPresent",
                            "ports": [ { "container_port": 80, "protocol": "TCP" } ]
                        }
                    ],
                    "restart_policy": "Always"
                }
            }
        }
    }));

    let record = provider.create("kubernetes_deployment", &conf).unwrap();

    // wire names, not configuration names
    assert!(record.yaml.contains("matchLabels"));
    assert!(record.yaml.contains("imagePullPolicy: IfNotPresent"));
    assert!(record.yaml.contains("containerPort: 80"));
    assert!(record.yaml.contains("restartPolicy: Always"));
    assert!(!record.yaml.contains("match_labels"));
    assert!(!record.yaml.contains("image_pull_policy"));

    // the record echoes identity and metadata for the state store
    assert_eq!("apps/v1", record.api_version);
    assert_eq!("Deployment", record.kind);
    assert_eq!(Some("web"), record.metadata.get_str("name"));
    assert_eq!(Some("prod"), record.metadata.get_str("namespace"));

    // read hands back exactly what was stored, and delete is a no-op
    let read_back = provider.read(&record);
    assert_eq!(record, read_back);
    provider.delete(read_back);
}

#[test]
fn field_order_is_stable_across_differently_ordered_configurations() {
    init_logging();
    let schema = deployment_schema();
    // json object ordering differs between these two fixtures; the rendered
    // output must not
    let first = config(json!({
        "spec": { "replicas": 1, "template": { "spec": { "containers": [ { "image": "a", "name": "a" } ] } } },
        "metadata": { "name": "foo" }
    }));
    let second = config(json!({
        "metadata": { "name": "foo" },
        "spec": { "template": { "spec": { "containers": [ { "name": "a", "image": "a" } ] } }, "replicas": 1 }
    }));

    let synthesizer = Synthesizer::with_clock(FixedClock(1));
    let first_yaml = synthesizer
        .synthesize(&schema, &first, k8s_types::apps::v1::Deployment)
        .unwrap()
        .yaml;
    let second_yaml = synthesizer
        .synthesize(&schema, &second, k8s_types::apps::v1::Deployment)
        .unwrap()
        .yaml;

    assert_eq!(first_yaml, second_yaml);

    let name_at = first_yaml.find("name: a").unwrap();
    let image_at = first_yaml.find("image: a").unwrap();
    assert!(name_at < image_at, "container name is declared before image");
}

#[test]
fn invalid_configuration_is_stopped_before_synthesis() {
    let provider = provider();
    let conf = config(json!({
        "metadata": { "name": "web" },
        "spec": {
            "replicas": -1,
            "template": { "spec": { "containers": [ { "name": "web", "image": "nginx" } ] } }
        }
    }));

    let err = provider.create("kubernetes_deployment", &conf).unwrap_err();
    let validation = err
        .as_type::<ValidationError>()
        .expect("a validation error reaches the caller");
    match validation {
        ValidationError::Constraint { path, .. } => assert_eq!(".spec.replicas", path),
        other => panic!("expected a constraint violation, got: {}", other),
    }
}

#[test]
fn rendered_manifests_parse_back_as_yaml_with_the_stamped_identity() {
    let provider = provider();
    let conf = config(json!({
        "metadata": { "name": "guestbook", "namespace": "argocd" },
        "spec": {
            "project": "default",
            "source": {
                "repo_url": "https://github.com/argoproj/argocd-example-apps",
                "path": "guestbook",
                "target_revision": "HEAD"
            },
            "destination": { "server": "https://kubernetes.default.svc", "namespace": "guestbook" },
            "sync_policy": { "automated": { "prune": true, "self_heal": true } }
        }
    }));

    let record = provider.create("argocd_application", &conf).unwrap();
    let parsed: kubesynth::serde_yaml::Value =
        kubesynth::serde_yaml::from_str(&record.yaml).expect("output is well-formed yaml");

    assert_eq!(
        Some("argoproj.io/v1alpha1"),
        parsed.get("apiVersion").and_then(|v| v.as_str())
    );
    assert_eq!(Some("Application"), parsed.get("kind").and_then(|v| v.as_str()));
    let spec = parsed.get("spec").expect("spec is present");
    assert!(spec.get("syncPolicy").is_some());
    assert_eq!(
        Some("https://github.com/argoproj/argocd-example-apps"),
        spec.get("source")
            .and_then(|s| s.get("repoURL"))
            .and_then(|v| v.as_str())
    );
}

#[test]
fn runtime_defined_crd_types_flow_through_the_whole_pipeline() {
    init_logging();
    let widget_type = kubesynth::k8s_types::define_type(
        "factory.example.com/v1".to_owned(),
        "Widget".to_owned(),
        "widgets".to_owned(),
    );
    let schema = Schema::new()
        .with_field(Field::string("api_version").computed())
        .with_field(Field::string("kind").computed())
        .with_field(Field::object("metadata", catalog::metadata_schema()).required())
        .with_field(Field::object(
            "spec",
            Schema::new()
                .with_field(Field::integer("cogs").required().at_least(1))
                .with_field(Field::string("finish").one_of(&["matte", "gloss"])),
        ));
    let provider_config = ProviderConfig::new("widget-factory")
        .with_resource(ResourceType::new("factory_widget", widget_type, schema));
    let provider = Provider::new(provider_config);

    let conf = config(json!({
        "metadata": { "name": "widget-one" },
        "spec": { "cogs": 12, "finish": "matte" }
    }));
    let record = provider.create("factory_widget", &conf).unwrap();

    assert!(record.yaml.contains("apiVersion: factory.example.com/v1"));
    assert!(record.yaml.contains("kind: Widget"));
    assert!(record.yaml.contains("cogs: 12"));
}
