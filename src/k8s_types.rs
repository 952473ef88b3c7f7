use std::fmt::{self, Display};
use std::hash::{self, Hash};

/// The Group/Version/Kind identity of a resource type: just enough information
/// to stamp a manifest's `apiVersion` and `kind`. These two values are always
/// computed into the output by the synthesizer and are never taken from user
/// configuration. We use `&'static str` for all of the fields so that it's easy
/// to pass references around without copying. You can define your own types
/// simply by declaring a static, like:
///
/// ```no_run
/// use kubesynth::k8s_types::K8sType;
///
/// #[allow(non_upper_case_globals)]
/// pub static MyCrd: &K8sType = &K8sType {
///     api_version: "example.com/v1",
///     kind: "MyCrd",
///     plural_kind: "mycrds"
/// };
/// ```
///
/// For CRD kinds that are only known at runtime, use the `define_type`
/// function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct K8sType {
    pub api_version: &'static str,
    pub kind: &'static str,
    pub plural_kind: &'static str,
}

impl Hash for K8sType {
    fn hash<H: hash::Hasher>(&self, hasher: &mut H) {
        self.api_version.hash(hasher);
        self.kind.hash(hasher);
    }
}

/// Creates a `&'static K8sType` at runtime **by leaking memory**. This is totally fine, as long as it's only
/// done once on application startup, but you definitely want to avoid repeated calls to define the same type.
pub fn define_type(api_version: String, kind: String, plural_kind: String) -> &'static K8sType {
    fn leak_str(s: String) -> &'static str {
        Box::leak(s.into_boxed_str())
    }

    let k8s_type = K8sType {
        api_version: leak_str(api_version),
        kind: leak_str(kind),
        plural_kind: leak_str(plural_kind),
    };
    log::info!("Dynamically defining {:?}", k8s_type);
    Box::leak(Box::new(k8s_type))
}

impl K8sType {
    pub fn as_group_and_version(&self) -> (&str, &str) {
        match self.api_version.find('/') {
            Some(slash_idx) => (
                &self.api_version[..slash_idx],
                &self.api_version[(slash_idx + 1)..],
            ),
            None => ("", self.api_version),
        }
    }

    pub fn group(&self) -> &str {
        self.as_group_and_version().0
    }

    pub fn version(&self) -> &str {
        self.as_group_and_version().1
    }
}

impl Display for K8sType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.api_version, self.kind)
    }
}

macro_rules! k8s_type {
    ($ref_name:ident, $api_version:expr, $kind:expr, $plural_kind:expr) => {
        #[allow(non_upper_case_globals)]
        pub static $ref_name: &crate::k8s_types::K8sType = &crate::k8s_types::K8sType {
            api_version: $api_version,
            kind: $kind,
            plural_kind: $plural_kind,
        };
    };
}

macro_rules! def_types {
    (@nogroupmod, $group:expr, [
        $( $version:ident => [
            $( $kind:ident ~ $plural_kind:ident ),*
        ]),*
    ]) => {
        $(
            pub mod $version {

                $(
                    k8s_type!($kind, concat!($group, "/", stringify!($version)), stringify!($kind), stringify!($plural_kind));
                )*
            }

        )*
    };
    ($group:ident => $rem:tt ) => {

        pub mod $group {

            def_types!{@nogroupmod, stringify!($group), $rem }
        }

    };
    (@core => [
        $( $version:ident => [
            $( $kind:ident ~ $plural_kind:ident ),*
        ]),*
    ]) => {
        pub mod core {
            $(pub mod $version {
                $(
                    k8s_type!($kind, stringify!($version), stringify!($kind), stringify!($plural_kind));
                )*
            })*
        }
    }
}

def_types! {
    @core => [
        v1 => [
            Namespace ~ namespaces,
            Pod ~ pods,
            Service ~ services,
            Secret ~ secrets,
            ConfigMap ~ configmaps,
            PersistentVolumeClaim ~ persistentvolumeclaims,
            ServiceAccount ~ serviceaccounts
        ]
    ]
}

pub mod apiextensions_k8s_io {
    def_types! {
        @nogroupmod, "apiextensions.k8s.io", [
            v1 => [
                CustomResourceDefinition ~ customresourcedefinitions
            ]
        ]
    }
}

def_types! {
    apps => [
        v1 => [
            DaemonSet ~ daemonsets,
            Deployment ~ deployments,
            StatefulSet ~ statefulsets,
            ReplicaSet ~ replicasets
        ]
    ]
}

def_types! {
    batch => [
        v1 => [
            CronJob ~ cronjobs,
            Job ~ jobs
        ]
    ]
}

pub mod networking_k8s_io {
    def_types! {
        @nogroupmod, "networking.k8s.io", [
            v1 => [
                Ingress ~ ingresses,
                NetworkPolicy ~ networkpolicies
            ]
        ]
    }
}

pub mod rbac_authorization_k8s_io {
    def_types! {
        @nogroupmod, "rbac.authorization.k8s.io", [
            v1 => [
                ClusterRoleBinding ~ clusterrolebindings,
                ClusterRole ~ clusterroles,
                RoleBinding ~ rolebindings,
                Role ~ roles
            ]
        ]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn k8s_type_returns_group_and_api_version_when_both_are_present() {
        let subject = apps::v1::Deployment;
        assert_eq!("apps", subject.group());
        assert_eq!("v1", subject.version());
    }

    #[test]
    fn k8s_type_returns_empty_str_for_group_when_no_group_is_present() {
        let subject = core::v1::Pod;
        assert_eq!("", subject.group());
        assert_eq!("v1", subject.version());
    }

    #[test]
    fn defined_type_carries_its_parts() {
        let subject = define_type(
            "example.com/v1alpha1".to_owned(),
            "Widget".to_owned(),
            "widgets".to_owned(),
        );
        assert_eq!("example.com", subject.group());
        assert_eq!("v1alpha1", subject.version());
        assert_eq!("Widget", subject.kind);
        assert_eq!("widgets", subject.plural_kind);
    }
}
