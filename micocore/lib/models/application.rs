use getset::Getters;
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use super::{Identity, MicoResourceConstraint, Patch};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A versioned set of services that are deployed together.
///
/// Services are referenced by identity, never owned: the same service may belong to many
/// applications. `service_deployment_infos` holds exactly one entry per referenced service, in
/// the same order as `services`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TypedBuilder, Getters)]
#[getset(get = "pub with_prefix")]
pub struct MicoApplication {
    /// The surrogate id assigned by the composer.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    #[builder(default, setter(skip))]
    pub(crate) id: Option<u64>,

    /// The short name of the application.
    #[builder(setter(into))]
    pub(crate) short_name: String,

    /// The version of the application.
    #[builder(setter(into))]
    pub(crate) version: String,

    /// The human readable name of the application.
    #[builder(setter(into))]
    pub(crate) name: String,

    /// A description of the application.
    #[serde(default)]
    #[builder(default, setter(into))]
    pub(crate) description: String,

    /// The referenced services, in order.
    #[serde(default)]
    #[builder(default)]
    pub(crate) services: Vec<Identity>,

    /// The deployment information of each referenced service, in the order of `services`.
    #[serde(default)]
    #[builder(default)]
    pub(crate) service_deployment_infos: Vec<MicoServiceDeploymentInfo>,
}

/// The desired configuration of one service inside one application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
#[getset(get = "pub with_prefix")]
pub struct MicoServiceDeploymentInfo {
    /// The service this information configures.
    pub(crate) service: Identity,

    /// The desired number of replicas. Falls back to the configured default when unset.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub(crate) replicas: Option<u32>,

    /// Labels attached to the deployment.
    #[serde(default)]
    pub(crate) labels: Vec<MicoLabel>,

    /// Environment variables passed to the containers.
    #[serde(default)]
    pub(crate) environment_variables: Vec<MicoEnvironmentVariable>,

    /// Resource limits applied to every container.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub(crate) resource_limits: Option<MicoResourceConstraint>,

    /// Node-selector constraints.
    #[serde(default)]
    pub(crate) topology_constraints: Vec<TopologyConstraint>,

    /// When the platform pulls the images.
    #[serde(default)]
    pub(crate) image_pull_policy: ImagePullPolicy,

    /// Where the service was deployed, recorded by the deploy workflow.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub(crate) platform_binding: Option<PlatformBinding>,
}

/// A key/value label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Getters)]
#[getset(get = "pub with_prefix")]
pub struct MicoLabel {
    /// The label key.
    pub(crate) key: String,

    /// The label value.
    pub(crate) value: String,
}

/// An environment variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Getters)]
#[getset(get = "pub with_prefix")]
pub struct MicoEnvironmentVariable {
    /// The variable name.
    pub(crate) name: String,

    /// The variable value.
    pub(crate) value: String,
}

/// A node-selector constraint, matching nodes that carry the given label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Getters)]
#[getset(get = "pub with_prefix")]
pub struct TopologyConstraint {
    /// The node label key.
    pub(crate) key: String,

    /// The node label value.
    pub(crate) value: String,
}

/// When the orchestration platform pulls container images.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImagePullPolicy {
    /// Always pull.
    #[default]
    Always,

    /// Pull only when the image is not present on the node.
    IfNotPresent,

    /// Never pull.
    Never,
}

/// The coordinates of a live deployment on the orchestration platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder, Getters)]
#[getset(get = "pub with_prefix")]
pub struct PlatformBinding {
    /// The namespace the deployment lives in.
    #[builder(setter(into))]
    pub(crate) namespace: String,

    /// The name of the deployment object.
    #[builder(setter(into))]
    pub(crate) deployment_name: String,

    /// The names of the platform services exposing the deployment.
    #[serde(default)]
    #[builder(default)]
    pub(crate) service_names: Vec<String>,
}

/// A partial update of a [`MicoServiceDeploymentInfo`]. Only fields set to [`Patch::Set`]
/// overwrite the stored values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeploymentInfoPatch {
    /// The desired number of replicas. `Set(None)` resets it to the configured default.
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub replicas: Patch<Option<u32>>,

    /// Replaces all labels.
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub labels: Patch<Vec<MicoLabel>>,

    /// Replaces all environment variables.
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub environment_variables: Patch<Vec<MicoEnvironmentVariable>>,

    /// The resource limits.
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub resource_limits: Patch<Option<MicoResourceConstraint>>,

    /// Replaces all topology constraints.
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub topology_constraints: Patch<Vec<TopologyConstraint>>,

    /// The image pull policy.
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub image_pull_policy: Patch<ImagePullPolicy>,

    /// The platform binding.
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub platform_binding: Patch<Option<PlatformBinding>>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl MicoApplication {
    /// Returns the identity of the application.
    pub fn identity(&self) -> Identity {
        Identity::new(&self.short_name, &self.version)
    }

    /// Whether the application references a service with the given short name.
    pub fn includes_service(&self, short_name: &str) -> bool {
        self.services.iter().any(|s| s.get_short_name() == short_name)
    }

    /// Returns the deployment information for the service with the given short name.
    pub fn deployment_info_for(&self, short_name: &str) -> Option<&MicoServiceDeploymentInfo> {
        self.service_deployment_infos
            .iter()
            .find(|info| info.service.get_short_name() == short_name)
    }
}

impl MicoServiceDeploymentInfo {
    /// Creates default deployment information for a service.
    pub fn for_service(service: Identity) -> Self {
        Self {
            service,
            replicas: None,
            labels: Vec::new(),
            environment_variables: Vec::new(),
            resource_limits: None,
            topology_constraints: Vec::new(),
            image_pull_policy: ImagePullPolicy::default(),
            platform_binding: None,
        }
    }

    /// Applies every provided field of `patch`.
    pub fn apply(&mut self, patch: DeploymentInfoPatch) {
        patch.replicas.apply(&mut self.replicas);
        patch.labels.apply(&mut self.labels);
        patch
            .environment_variables
            .apply(&mut self.environment_variables);
        patch.resource_limits.apply(&mut self.resource_limits);
        patch
            .topology_constraints
            .apply(&mut self.topology_constraints);
        patch.image_pull_policy.apply(&mut self.image_pull_policy);
        patch.platform_binding.apply(&mut self.platform_binding);
    }

    /// Returns the desired replica count, or `default` when unset.
    pub fn replicas_or(&self, default: u32) -> u32 {
        self.replicas.unwrap_or(default)
    }
}

impl MicoLabel {
    /// Creates a new label.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl MicoEnvironmentVariable {
    /// Creates a new environment variable.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl TopologyConstraint {
    /// Creates a new topology constraint.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_overwrites_only_provided_fields() {
        let mut info = MicoServiceDeploymentInfo::for_service(Identity::new("svc-a", "1.0.0"));
        info.replicas = Some(3);
        info.labels = vec![MicoLabel::new("tier", "backend")];

        info.apply(DeploymentInfoPatch {
            environment_variables: Patch::Set(vec![MicoEnvironmentVariable::new("MODE", "prod")]),
            image_pull_policy: Patch::Set(ImagePullPolicy::IfNotPresent),
            ..Default::default()
        });

        assert_eq!(info.get_replicas(), &Some(3));
        assert_eq!(info.get_labels(), &vec![MicoLabel::new("tier", "backend")]);
        assert_eq!(info.get_environment_variables().len(), 1);
        assert_eq!(info.get_image_pull_policy(), &ImagePullPolicy::IfNotPresent);
    }

    #[test]
    fn test_patch_from_json_clears_explicit_nulls() -> anyhow::Result<()> {
        let mut info = MicoServiceDeploymentInfo::for_service(Identity::new("svc-a", "1.0.0"));
        info.replicas = Some(3);
        info.resource_limits = Some(MicoResourceConstraint::new(Some(500), Some(256)));

        let patch: DeploymentInfoPatch =
            serde_json::from_str(r#"{ "replicas": null, "labels": [{ "key": "a", "value": "b" }] }"#)?;
        info.apply(patch);

        assert_eq!(info.replicas_or(1), 1);
        assert_eq!(info.get_labels(), &vec![MicoLabel::new("a", "b")]);
        assert!(info.get_resource_limits().is_some());

        Ok(())
    }

    #[test]
    fn test_application_lookups_by_short_name() {
        let app = MicoApplication::builder()
            .short_name("app")
            .version("1.0.0")
            .name("App")
            .services(vec![Identity::new("svc-a", "1.0.0")])
            .service_deployment_infos(vec![MicoServiceDeploymentInfo::for_service(
                Identity::new("svc-a", "1.0.0"),
            )])
            .build();

        assert!(app.includes_service("svc-a"));
        assert!(!app.includes_service("svc-b"));
        assert!(app.deployment_info_for("svc-a").is_some());
        assert_eq!(app.identity(), Identity::new("app", "1.0.0"));
    }
}
