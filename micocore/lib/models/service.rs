use getset::{CopyGetters, Getters};
use semver::VersionReq;
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use super::Identity;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A versioned service definition.
///
/// `(short_name, version)` identifies the service. Its outgoing dependency edges are owned by
/// the catalog's graph; the `dependencies` list is filled in from that graph whenever a service
/// is read, and is taken as the initial set of edges when a service is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TypedBuilder, Getters)]
#[getset(get = "pub with_prefix")]
pub struct MicoService {
    /// The surrogate id assigned by the catalog.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    #[builder(default, setter(skip))]
    pub(crate) id: Option<u64>,

    /// The short name of the service.
    #[builder(setter(into))]
    pub(crate) short_name: String,

    /// The version of the service.
    #[builder(setter(into))]
    pub(crate) version: String,

    /// The human readable name of the service.
    #[builder(setter(into))]
    pub(crate) name: String,

    /// A description of the service.
    #[serde(default)]
    #[builder(default, setter(into))]
    pub(crate) description: String,

    /// The URL to clone the source repository from.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    #[builder(default, setter(strip_option, into))]
    pub(crate) git_clone_url: Option<String>,

    /// The URL of the release information of the source repository.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    #[builder(default, setter(strip_option, into))]
    pub(crate) git_release_info_url: Option<String>,

    /// The contact person of the service.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    #[builder(default, setter(strip_option, into))]
    pub(crate) contact: Option<String>,

    /// The owner of the service.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    #[builder(default, setter(strip_option, into))]
    pub(crate) owner: Option<String>,

    /// The network-exposed interfaces of the service.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    #[builder(default)]
    pub(crate) service_interfaces: Vec<MicoServiceInterface>,

    /// The containers the service runs.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    #[builder(default)]
    pub(crate) containers: Vec<MicoImageContainer>,

    /// The outgoing dependency edges, in insertion order.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    #[builder(default)]
    pub(crate) dependencies: Vec<MicoServiceDependency>,
}

/// A directed dependency edge from `service` to `depended_service`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[getset(get = "pub with_prefix")]
pub struct MicoServiceDependency {
    /// The depending service.
    pub(crate) service: Identity,

    /// The depended service.
    pub(crate) depended_service: Identity,

    /// The versions of the depended service that are acceptable.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub(crate) version_range: Option<VersionReq>,
}

/// A named, network-exposed interface of a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder, Getters)]
#[getset(get = "pub with_prefix")]
pub struct MicoServiceInterface {
    /// The name of the interface.
    #[builder(setter(into))]
    pub(crate) service_interface_name: String,

    /// The ports of the interface.
    #[serde(default)]
    #[builder(default)]
    pub(crate) ports: Vec<MicoPort>,

    /// A description of the interface.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    #[builder(default, setter(strip_option, into))]
    pub(crate) description: Option<String>,

    /// The application protocol, e.g. `HTTP`.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    #[builder(default, setter(strip_option, into))]
    pub(crate) protocol: Option<String>,

    /// The transport protocol, e.g. `TCP`.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    #[builder(default, setter(strip_option, into))]
    pub(crate) transport_protocol: Option<String>,
}

/// A port exposed by an interface or a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, CopyGetters)]
#[getset(get_copy = "pub with_prefix")]
pub struct MicoPort {
    /// The port number exposed to other services.
    pub(crate) number: u16,

    /// The port number the container listens on.
    pub(crate) target_port: u16,

    /// The transport of the port.
    #[serde(default)]
    pub(crate) port_type: PortType,
}

/// The transport of a [`MicoPort`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PortType {
    /// TCP.
    #[default]
    Tcp,

    /// UDP.
    Udp,
}

/// A container image run as part of a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder, Getters)]
#[getset(get = "pub with_prefix")]
pub struct MicoImageContainer {
    /// The image reference.
    #[builder(setter(into))]
    pub(crate) image: String,

    /// The name of the container. Defaults to the service short name when deployed.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    #[builder(default, setter(strip_option, into))]
    pub(crate) name: Option<String>,

    /// The ports the container exposes.
    #[serde(default)]
    #[builder(default)]
    pub(crate) ports: Vec<MicoPort>,

    /// The minimum compute resources.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    #[builder(default, setter(strip_option))]
    pub(crate) resource_lower_limit: Option<MicoResourceConstraint>,

    /// The maximum compute resources.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    #[builder(default, setter(strip_option))]
    pub(crate) resource_upper_limit: Option<MicoResourceConstraint>,

    /// Whether the root filesystem is mounted read-only.
    #[serde(default)]
    #[builder(default)]
    pub(crate) read_only_root_file_system: bool,

    /// Whether the container must run as a non-root user.
    #[serde(default)]
    #[builder(default)]
    pub(crate) run_as_non_root: bool,
}

/// A compute resource bound.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, CopyGetters)]
#[getset(get_copy = "pub with_prefix")]
pub struct MicoResourceConstraint {
    /// CPU in millicores.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub(crate) cpu_millicores: Option<u32>,

    /// Memory in MiB.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub(crate) memory_mib: Option<u32>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl MicoService {
    /// Returns the identity of the service.
    pub fn identity(&self) -> Identity {
        Identity::new(&self.short_name, &self.version)
    }

    /// Returns a copy of the service under `new_version`, without a surrogate id and without
    /// dependency edges.
    pub(crate) fn promoted(&self, new_version: &str) -> Self {
        Self {
            id: None,
            version: new_version.to_string(),
            dependencies: Vec::new(),
            ..self.clone()
        }
    }

    /// Replaces every non-identity attribute with the one from `other`. The surrogate id and
    /// dependency edges are left untouched.
    pub(crate) fn replace_attributes(&mut self, other: MicoService) {
        self.name = other.name;
        self.description = other.description;
        self.git_clone_url = other.git_clone_url;
        self.git_release_info_url = other.git_release_info_url;
        self.contact = other.contact;
        self.owner = other.owner;
        self.service_interfaces = other.service_interfaces;
        self.containers = other.containers;
    }
}

impl MicoServiceDependency {
    /// Creates an unconstrained dependency edge.
    pub fn new(service: Identity, depended_service: Identity) -> Self {
        Self {
            service,
            depended_service,
            version_range: None,
        }
    }

    /// Constrains the acceptable versions of the depended service.
    pub fn with_version_range(mut self, version_range: VersionReq) -> Self {
        self.version_range = Some(version_range);
        self
    }
}

impl MicoPort {
    /// Creates a TCP port.
    pub fn tcp(number: u16, target_port: u16) -> Self {
        Self {
            number,
            target_port,
            port_type: PortType::Tcp,
        }
    }

    /// Creates a UDP port.
    pub fn udp(number: u16, target_port: u16) -> Self {
        Self {
            number,
            target_port,
            port_type: PortType::Udp,
        }
    }
}

impl MicoResourceConstraint {
    /// Creates a new resource constraint.
    pub fn new(cpu_millicores: Option<u32>, memory_mib: Option<u32>) -> Self {
        Self {
            cpu_millicores,
            memory_mib,
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
