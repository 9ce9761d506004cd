use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;

use crate::{
    models::{
        DeploymentInfoPatch, Identity, ImagePullPolicy, MicoApplication,
        MicoEnvironmentVariable, MicoLabel, MicoResourceConstraint, MicoServiceDeploymentInfo,
        PlatformBinding, TopologyConstraint,
    },
    MicoError, MicoResult,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Id of a child record in an [`ApplicationStore`].
pub(crate) type RecordId = u64;

/// Normalized storage for applications.
///
/// Deployment infos and their labels, environment variables and platform bindings are stored as
/// separate records that reference each other by id. Replacing or detaching a record does not
/// delete what it referenced; [`ApplicationStore::clean_up_orphans`] sweeps those explicitly.
#[derive(Debug, Default)]
pub struct ApplicationStore {
    applications: BTreeMap<Identity, ApplicationRecord>,
    deployment_infos: HashMap<RecordId, DeploymentInfoRecord>,
    labels: HashMap<RecordId, MicoLabel>,
    environment_variables: HashMap<RecordId, MicoEnvironmentVariable>,
    platform_bindings: HashMap<RecordId, PlatformBinding>,
    next_record_id: RecordId,
    next_application_id: u64,
}

/// The records removed by one [`ApplicationStore::clean_up_orphans`] sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OrphanReport {
    /// Deployment infos no application referenced.
    pub deployment_infos: usize,

    /// Labels no deployment info referenced.
    pub labels: usize,

    /// Environment variables no deployment info referenced.
    pub environment_variables: usize,

    /// Platform bindings no deployment info referenced.
    pub platform_bindings: usize,
}

/// The number of records per table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecordCounts {
    /// Stored applications.
    pub applications: usize,

    /// Stored deployment infos.
    pub deployment_infos: usize,

    /// Stored labels.
    pub labels: usize,

    /// Stored environment variables.
    pub environment_variables: usize,

    /// Stored platform bindings.
    pub platform_bindings: usize,
}

#[derive(Debug, Clone)]
struct ApplicationRecord {
    /// The application without deployment infos.
    application: MicoApplication,

    /// One deployment info record per entry of `application.services`, in the same order.
    deployment_infos: Vec<RecordId>,
}

#[derive(Debug, Clone)]
struct DeploymentInfoRecord {
    service: Identity,
    replicas: Option<u32>,
    resource_limits: Option<MicoResourceConstraint>,
    topology_constraints: Vec<TopologyConstraint>,
    image_pull_policy: ImagePullPolicy,
    labels: Vec<RecordId>,
    environment_variables: Vec<RecordId>,
    platform_binding: Option<RecordId>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl ApplicationStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an application with the identity is stored.
    pub fn contains(&self, identity: &Identity) -> bool {
        self.applications.contains_key(identity)
    }

    /// Returns the application with its deployment infos assembled.
    pub fn get(&self, identity: &Identity) -> Option<MicoApplication> {
        self.applications.get(identity).map(|r| self.assemble(r))
    }

    /// Returns every version of the application, in identity order.
    pub fn versions(&self, short_name: &str) -> Vec<MicoApplication> {
        self.applications
            .iter()
            .filter(|(identity, _)| identity.get_short_name() == short_name)
            .map(|(_, r)| self.assemble(r))
            .collect()
    }

    /// Returns every application, in identity order.
    pub fn all(&self) -> Vec<MicoApplication> {
        self.applications
            .values()
            .map(|r| self.assemble(r))
            .collect()
    }

    /// Returns every application referencing the service.
    pub fn using_service(&self, service: &Identity) -> Vec<MicoApplication> {
        self.applications
            .values()
            .filter(|r| r.application.services.contains(service))
            .map(|r| self.assemble(r))
            .collect()
    }

    /// Stores a new application. Its deployment infos are copied into fresh records and put in
    /// the order of its services.
    pub fn insert(&mut self, mut application: MicoApplication) -> MicoResult<MicoApplication> {
        let identity = application.identity();
        if self.applications.contains_key(&identity) {
            return Err(MicoError::ApplicationAlreadyExists(identity));
        }
        check_consistency(&application)?;

        let mut infos = std::mem::take(&mut application.service_deployment_infos);
        let mut deployment_infos = Vec::with_capacity(application.services.len());
        for service in &application.services {
            let position = infos
                .iter()
                .position(|info| &info.service == service)
                .ok_or_else(|| {
                    MicoError::InconsistentApplication(
                        identity.clone(),
                        format!("no deployment information for service '{}'", service),
                    )
                })?;
            deployment_infos.push(self.store_info(infos.swap_remove(position)));
        }

        self.next_application_id += 1;
        application.id = Some(self.next_application_id);

        let record = ApplicationRecord {
            application,
            deployment_infos,
        };
        let assembled = self.assemble(&record);
        self.applications.insert(identity, record);

        Ok(assembled)
    }

    /// Replaces the name and the description of an application.
    pub fn update_attributes(
        &mut self,
        identity: &Identity,
        name: String,
        description: String,
    ) -> MicoResult<MicoApplication> {
        let record = self.record_mut(identity)?;
        record.application.name = name;
        record.application.description = description;

        let record = record.clone();
        Ok(self.assemble(&record))
    }

    /// Removes an application. Its deployment infos stay until the next orphan sweep.
    pub fn remove(&mut self, identity: &Identity) -> Option<MicoApplication> {
        let record = self.applications.remove(identity)?;
        Some(self.assemble(&record))
    }

    /// References `service` from the application together with default deployment information.
    ///
    /// Does nothing if the exact service is already referenced. If another version of the same
    /// short name is referenced, it is replaced by the new version with fresh default deployment
    /// information; the old deployment info is detached until the next orphan sweep. Returns
    /// whether the application changed.
    pub fn add_service(&mut self, identity: &Identity, service: Identity) -> MicoResult<bool> {
        let record = self.record(identity)?;
        if record.application.services.contains(&service) {
            return Ok(false);
        }

        let mut services = record.application.services.clone();
        let mut infos = record.deployment_infos.clone();

        match services
            .iter()
            .position(|s| s.get_short_name() == service.get_short_name())
        {
            Some(position) => {
                infos[position] =
                    self.store_info(MicoServiceDeploymentInfo::for_service(service.clone()));
                services[position] = service;
            }
            None => {
                let info_id =
                    self.store_info(MicoServiceDeploymentInfo::for_service(service.clone()));
                services.push(service);
                infos.push(info_id);
            }
        }

        self.commit(identity, services, infos)?;
        Ok(true)
    }

    /// Drops every reference to a service with the given short name together with its deployment
    /// information. Returns whether the application changed.
    pub fn remove_service(&mut self, identity: &Identity, short_name: &str) -> MicoResult<bool> {
        let record = self.record(identity)?;
        if !record.application.includes_service(short_name) {
            return Ok(false);
        }

        let (services, infos): (Vec<Identity>, Vec<RecordId>) = record
            .application
            .services
            .iter()
            .cloned()
            .zip(record.deployment_infos.iter().copied())
            .filter(|(s, _)| s.get_short_name() != short_name)
            .unzip();

        self.commit(identity, services, infos)?;
        Ok(true)
    }

    /// Returns the deployment information of a service inside an application.
    ///
    /// Fails with [`MicoError::ServiceNotInApplication`] when the application does not reference
    /// the service, and with [`MicoError::DeploymentInfoNotFound`] when it does but no deployment
    /// information record exists.
    pub fn deployment_info(
        &self,
        identity: &Identity,
        short_name: &str,
    ) -> MicoResult<MicoServiceDeploymentInfo> {
        let info_id = self.info_id(identity, short_name)?;
        self.assemble_info(info_id)
            .ok_or_else(|| missing_info(identity, short_name))
    }

    /// Applies a patch to the deployment information of a service inside an application.
    ///
    /// Replaced labels, environment variables and platform bindings are detached, not deleted.
    pub fn update_deployment_info(
        &mut self,
        identity: &Identity,
        short_name: &str,
        patch: DeploymentInfoPatch,
    ) -> MicoResult<MicoServiceDeploymentInfo> {
        let info_id = self.info_id(identity, short_name)?;
        let mut info = self
            .assemble_info(info_id)
            .ok_or_else(|| missing_info(identity, short_name))?;

        info.apply(patch);
        let record = self.info_record(info.clone());
        self.deployment_infos.insert(info_id, record);

        Ok(info)
    }

    /// Deletes every deployment info no application references, then every label, environment
    /// variable and platform binding no deployment info references.
    pub fn clean_up_orphans(&mut self) -> OrphanReport {
        let referenced_infos: HashSet<RecordId> = self
            .applications
            .values()
            .flat_map(|r| r.deployment_infos.iter().copied())
            .collect();

        let before = self.deployment_infos.len();
        self.deployment_infos
            .retain(|id, _| referenced_infos.contains(id));
        let deployment_infos = before - self.deployment_infos.len();

        let mut referenced_labels = HashSet::new();
        let mut referenced_variables = HashSet::new();
        let mut referenced_bindings = HashSet::new();
        for info in self.deployment_infos.values() {
            referenced_labels.extend(info.labels.iter().copied());
            referenced_variables.extend(info.environment_variables.iter().copied());
            referenced_bindings.extend(info.platform_binding);
        }

        let report = OrphanReport {
            deployment_infos,
            labels: sweep(&mut self.labels, &referenced_labels),
            environment_variables: sweep(&mut self.environment_variables, &referenced_variables),
            platform_bindings: sweep(&mut self.platform_bindings, &referenced_bindings),
        };

        if report != OrphanReport::default() {
            tracing::debug!(?report, "cleaned up orphaned records");
        }

        report
    }

    /// Returns the number of stored records per table.
    pub fn record_counts(&self) -> RecordCounts {
        RecordCounts {
            applications: self.applications.len(),
            deployment_infos: self.deployment_infos.len(),
            labels: self.labels.len(),
            environment_variables: self.environment_variables.len(),
            platform_bindings: self.platform_bindings.len(),
        }
    }

    fn record(&self, identity: &Identity) -> MicoResult<&ApplicationRecord> {
        self.applications
            .get(identity)
            .ok_or_else(|| MicoError::ApplicationNotFound(identity.clone()))
    }

    fn record_mut(&mut self, identity: &Identity) -> MicoResult<&mut ApplicationRecord> {
        self.applications
            .get_mut(identity)
            .ok_or_else(|| MicoError::ApplicationNotFound(identity.clone()))
    }

    fn info_id(&self, identity: &Identity, short_name: &str) -> MicoResult<RecordId> {
        let record = self.record(identity)?;
        if !record.application.includes_service(short_name) {
            return Err(MicoError::ServiceNotInApplication {
                application: identity.clone(),
                service_short_name: short_name.to_string(),
            });
        }

        record
            .deployment_infos
            .iter()
            .copied()
            .find(|id| {
                self.deployment_infos
                    .get(id)
                    .is_some_and(|info| info.service.get_short_name() == short_name)
            })
            .ok_or_else(|| missing_info(identity, short_name))
    }

    /// Validates the new lists against the pairing invariant and only then replaces them.
    fn commit(
        &mut self,
        identity: &Identity,
        services: Vec<Identity>,
        infos: Vec<RecordId>,
    ) -> MicoResult<()> {
        if services.len() != infos.len() {
            return Err(MicoError::InconsistentApplication(
                identity.clone(),
                format!(
                    "{} services but {} deployment infos",
                    services.len(),
                    infos.len()
                ),
            ));
        }

        for (service, info_id) in services.iter().zip(&infos) {
            let paired = self
                .deployment_infos
                .get(info_id)
                .is_some_and(|info| &info.service == service);
            if !paired {
                return Err(MicoError::InconsistentApplication(
                    identity.clone(),
                    format!("service '{}' is not paired with its deployment info", service),
                ));
            }
        }

        let record = self.record_mut(identity)?;
        record.application.services = services;
        record.deployment_infos = infos;
        Ok(())
    }

    fn allocate(&mut self) -> RecordId {
        self.next_record_id += 1;
        self.next_record_id
    }

    fn store_info(&mut self, info: MicoServiceDeploymentInfo) -> RecordId {
        let record = self.info_record(info);
        let id = self.allocate();
        self.deployment_infos.insert(id, record);
        id
    }

    /// Stores the children of `info` as fresh records and returns the record referencing them.
    fn info_record(&mut self, info: MicoServiceDeploymentInfo) -> DeploymentInfoRecord {
        let labels = info
            .labels
            .into_iter()
            .map(|label| {
                let id = self.allocate();
                self.labels.insert(id, label);
                id
            })
            .collect();

        let environment_variables = info
            .environment_variables
            .into_iter()
            .map(|variable| {
                let id = self.allocate();
                self.environment_variables.insert(id, variable);
                id
            })
            .collect();

        let platform_binding = info.platform_binding.map(|binding| {
            let id = self.allocate();
            self.platform_bindings.insert(id, binding);
            id
        });

        DeploymentInfoRecord {
            service: info.service,
            replicas: info.replicas,
            resource_limits: info.resource_limits,
            topology_constraints: info.topology_constraints,
            image_pull_policy: info.image_pull_policy,
            labels,
            environment_variables,
            platform_binding,
        }
    }

    fn assemble(&self, record: &ApplicationRecord) -> MicoApplication {
        let mut application = record.application.clone();
        application.service_deployment_infos = record
            .deployment_infos
            .iter()
            .filter_map(|&id| self.assemble_info(id))
            .collect();
        application
    }

    fn assemble_info(&self, id: RecordId) -> Option<MicoServiceDeploymentInfo> {
        let record = self.deployment_infos.get(&id)?;

        Some(MicoServiceDeploymentInfo {
            service: record.service.clone(),
            replicas: record.replicas,
            labels: record
                .labels
                .iter()
                .filter_map(|id| self.labels.get(id).cloned())
                .collect(),
            environment_variables: record
                .environment_variables
                .iter()
                .filter_map(|id| self.environment_variables.get(id).cloned())
                .collect(),
            resource_limits: record.resource_limits,
            topology_constraints: record.topology_constraints.clone(),
            image_pull_policy: record.image_pull_policy,
            platform_binding: record
                .platform_binding
                .and_then(|id| self.platform_bindings.get(&id).cloned()),
        })
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Checks that an application references each short name at most once and carries exactly one
/// deployment info per referenced service.
pub fn check_consistency(application: &MicoApplication) -> MicoResult<()> {
    let identity = application.identity();
    let inconsistent = |reason: String| MicoError::InconsistentApplication(identity.clone(), reason);

    let services = &application.services;
    let infos = &application.service_deployment_infos;
    if services.len() != infos.len() {
        return Err(inconsistent(format!(
            "{} services but {} deployment infos",
            services.len(),
            infos.len()
        )));
    }

    let mut short_names = HashSet::new();
    for service in services {
        if !short_names.insert(service.get_short_name()) {
            return Err(inconsistent(format!(
                "service '{}' is referenced more than once",
                service.get_short_name()
            )));
        }
    }

    let referenced: HashSet<&Identity> = services.iter().collect();
    let configured: HashSet<&Identity> = infos.iter().map(|info| &info.service).collect();
    if referenced != configured {
        return Err(inconsistent(
            "referenced services and deployment infos differ".to_string(),
        ));
    }

    Ok(())
}

fn missing_info(identity: &Identity, short_name: &str) -> MicoError {
    MicoError::DeploymentInfoNotFound {
        application: identity.clone(),
        service_short_name: short_name.to_string(),
    }
}

fn sweep<T>(records: &mut HashMap<RecordId, T>, referenced: &HashSet<RecordId>) -> usize {
    let before = records.len();
    records.retain(|id, _| referenced.contains(id));
    before - records.len()
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Patch;

    fn application(short_name: &str, version: &str) -> MicoApplication {
        MicoApplication::builder()
            .short_name(short_name)
            .version(version)
            .name(short_name)
            .build()
    }

    fn app_id() -> Identity {
        Identity::new("app", "1.0.0")
    }

    #[test]
    fn test_add_and_remove_service_keep_lists_paired() -> anyhow::Result<()> {
        let mut store = ApplicationStore::new();
        store.insert(application("app", "1.0.0"))?;

        assert!(store.add_service(&app_id(), Identity::new("svc-a", "1.0.0"))?);
        assert!(!store.add_service(&app_id(), Identity::new("svc-a", "1.0.0"))?);
        assert!(store.add_service(&app_id(), Identity::new("svc-b", "1.0.0"))?);

        let app = store.get(&app_id()).ok_or_else(|| anyhow::anyhow!("missing"))?;
        assert_eq!(app.get_services().len(), 2);
        assert_eq!(app.get_service_deployment_infos().len(), 2);
        check_consistency(&app)?;

        assert!(store.remove_service(&app_id(), "svc-a")?);
        assert!(!store.remove_service(&app_id(), "svc-a")?);

        let app = store.get(&app_id()).ok_or_else(|| anyhow::anyhow!("missing"))?;
        assert_eq!(app.get_services(), &vec![Identity::new("svc-b", "1.0.0")]);
        assert_eq!(app.get_service_deployment_infos().len(), 1);

        Ok(())
    }

    #[test]
    fn test_adding_another_version_starts_from_default_info() -> anyhow::Result<()> {
        let mut store = ApplicationStore::new();
        store.insert(application("app", "1.0.0"))?;
        store.add_service(&app_id(), Identity::new("svc-a", "1.0.0"))?;
        store.update_deployment_info(
            &app_id(),
            "svc-a",
            DeploymentInfoPatch {
                replicas: Patch::Set(Some(4)),
                platform_binding: Patch::Set(Some(
                    PlatformBinding::builder()
                        .namespace("default")
                        .deployment_name("svc-a-v1")
                        .build(),
                )),
                ..Default::default()
            },
        )?;
        store.clean_up_orphans();

        assert!(store.add_service(&app_id(), Identity::new("svc-a", "2.0.0"))?);

        let app = store.get(&app_id()).ok_or_else(|| anyhow::anyhow!("missing"))?;
        assert_eq!(app.get_services(), &vec![Identity::new("svc-a", "2.0.0")]);
        assert_eq!(app.get_service_deployment_infos().len(), 1);

        let info = store.deployment_info(&app_id(), "svc-a")?;
        assert_eq!(
            info,
            MicoServiceDeploymentInfo::for_service(Identity::new("svc-a", "2.0.0"))
        );

        let report = store.clean_up_orphans();
        assert_eq!(report.deployment_infos, 1);
        assert_eq!(report.platform_bindings, 1);
        assert_eq!(store.record_counts().deployment_infos, 1);
        assert_eq!(store.record_counts().platform_bindings, 0);

        Ok(())
    }

    #[test]
    fn test_update_detaches_children_until_sweep() -> anyhow::Result<()> {
        let mut store = ApplicationStore::new();
        store.insert(application("app", "1.0.0"))?;
        store.add_service(&app_id(), Identity::new("svc-a", "1.0.0"))?;

        store.update_deployment_info(
            &app_id(),
            "svc-a",
            DeploymentInfoPatch {
                labels: Patch::Set(vec![MicoLabel::new("a", "1"), MicoLabel::new("b", "2")]),
                environment_variables: Patch::Set(vec![MicoEnvironmentVariable::new("X", "1")]),
                ..Default::default()
            },
        )?;
        let info = store.update_deployment_info(
            &app_id(),
            "svc-a",
            DeploymentInfoPatch {
                labels: Patch::Set(vec![MicoLabel::new("c", "3")]),
                ..Default::default()
            },
        )?;

        assert_eq!(info.get_labels(), &vec![MicoLabel::new("c", "3")]);
        assert_eq!(info.get_environment_variables().len(), 1);

        let report = store.clean_up_orphans();
        assert_eq!(report.deployment_infos, 0);
        assert_eq!(report.labels, 2);
        assert_eq!(report.environment_variables, 1);

        let counts = store.record_counts();
        assert_eq!(counts.labels, 1);
        assert_eq!(counts.environment_variables, 1);

        Ok(())
    }

    #[test]
    fn test_removed_service_leaves_orphans_for_sweep() -> anyhow::Result<()> {
        let mut store = ApplicationStore::new();
        store.insert(application("app", "1.0.0"))?;
        store.add_service(&app_id(), Identity::new("svc-a", "1.0.0"))?;
        store.update_deployment_info(
            &app_id(),
            "svc-a",
            DeploymentInfoPatch {
                platform_binding: Patch::Set(Some(
                    PlatformBinding::builder()
                        .namespace("mico")
                        .deployment_name("svc-a")
                        .build(),
                )),
                ..Default::default()
            },
        )?;

        store.remove_service(&app_id(), "svc-a")?;
        let report = store.clean_up_orphans();

        assert_eq!(report.deployment_infos, 1);
        assert_eq!(report.platform_bindings, 1);
        assert_eq!(store.clean_up_orphans(), OrphanReport::default());

        Ok(())
    }

    #[test]
    fn test_deployment_info_not_found_conditions_differ() -> anyhow::Result<()> {
        let mut store = ApplicationStore::new();
        store.insert(application("app", "1.0.0"))?;

        assert!(matches!(
            store.deployment_info(&app_id(), "svc-a"),
            Err(MicoError::ServiceNotInApplication { .. })
        ));

        store.add_service(&app_id(), Identity::new("svc-a", "1.0.0"))?;
        store.deployment_infos.clear();

        assert!(matches!(
            store.deployment_info(&app_id(), "svc-a"),
            Err(MicoError::DeploymentInfoNotFound { .. })
        ));
        assert!(matches!(
            store.deployment_info(&Identity::new("other", "1.0.0"), "svc-a"),
            Err(MicoError::ApplicationNotFound(_))
        ));

        Ok(())
    }

    #[test]
    fn test_insert_orders_infos_and_rejects_mismatches() -> anyhow::Result<()> {
        let mut store = ApplicationStore::new();
        let a = Identity::new("svc-a", "1.0.0");
        let b = Identity::new("svc-b", "1.0.0");

        let mut app = application("app", "1.0.0");
        app.services = vec![a.clone(), b.clone()];
        app.service_deployment_infos = vec![
            MicoServiceDeploymentInfo::for_service(b.clone()),
            MicoServiceDeploymentInfo::for_service(a.clone()),
        ];
        let stored = store.insert(app)?;
        assert_eq!(stored.get_service_deployment_infos()[0].get_service(), &a);

        let mut broken = application("broken", "1.0.0");
        broken.services = vec![a.clone()];
        broken.service_deployment_infos = vec![MicoServiceDeploymentInfo::for_service(b)];
        assert!(matches!(
            store.insert(broken),
            Err(MicoError::InconsistentApplication(..))
        ));
        assert!(matches!(
            store.insert(application("app", "1.0.0")),
            Err(MicoError::ApplicationAlreadyExists(_))
        ));

        Ok(())
    }
}
