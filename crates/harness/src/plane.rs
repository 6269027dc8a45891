use chrono::{DateTime, Utc};
use uuid::Uuid;

use gitopsdb_core::{
    Application, ClusterAccess, ClusterCredentials, ClusterUser, GitopsEngineCluster,
    GitopsEngineInstance, ManagedEnvironment, OperationTarget, ids::*,
};
use gitopsdb_lifecycle::{NewOperation, OperationEngine};
use gitopsdb_storage::{
    ApplicationRepository, ClusterAccessRepository, ClusterCredentialsRepository,
    ClusterUserRepository, GitopsEngineClusterRepository, GitopsEngineInstanceRepository,
    ManagedEnvironmentRepository, SqliteStorage, StorageError,
};

/// A control plane in a box: one SQLite store plus builders that seed
/// the topology rows most tests need as a substrate.
pub struct TestPlane {
    pub storage: SqliteStorage,
}

impl TestPlane {
    pub fn new() -> Result<Self, StorageError> {
        Ok(Self {
            storage: SqliteStorage::open_in_memory()?,
        })
    }

    /// On-disk plane, for tests where several connections share a store.
    pub fn open(path: &str) -> Result<Self, StorageError> {
        Ok(Self {
            storage: SqliteStorage::open(path)?,
        })
    }

    pub fn into_engine(self) -> OperationEngine<SqliteStorage> {
        OperationEngine::new(self.storage)
    }

    /// Mint an opaque UID the way an upstream API layer would.
    pub fn uid(prefix: &str) -> String {
        format!("{prefix}-{}", Uuid::new_v4())
    }

    /// Current time at millisecond precision, matching what survives a
    /// round trip through the store.
    pub fn now() -> DateTime<Utc> {
        DateTime::from_timestamp_millis(Utc::now().timestamp_millis())
            .expect("current time is representable")
    }

    pub fn seed_credentials(&mut self) -> Result<ClusterCredentialsId, StorageError> {
        let id = ClusterCredentialsId::new(Self::uid("cred"));
        self.storage.create_cluster_credentials(&ClusterCredentials {
            clustercredentials_cred_id: id.clone(),
            seq_id: 0,
            host: "https://api.test.internal:6443".into(),
            kube_config: "apiVersion: v1".into(),
            kube_config_context: "default".into(),
            serviceaccount_bearer_token: String::new(),
            serviceaccount_ns: String::new(),
        })?;
        Ok(id)
    }

    pub fn seed_engine_cluster(&mut self) -> Result<GitopsEngineClusterId, StorageError> {
        let creds = self.seed_credentials()?;
        let id = GitopsEngineClusterId::new(Self::uid("engine-cluster"));
        self.storage.create_engine_cluster(&GitopsEngineCluster {
            gitopsenginecluster_id: id.clone(),
            seq_id: 0,
            clustercredentials_id: creds,
        })?;
        Ok(id)
    }

    pub fn seed_engine_instance(&mut self) -> Result<GitopsEngineInstanceId, StorageError> {
        let cluster = self.seed_engine_cluster()?;
        self.seed_engine_instance_on(&cluster)
    }

    pub fn seed_engine_instance_on(
        &mut self,
        cluster: &GitopsEngineClusterId,
    ) -> Result<GitopsEngineInstanceId, StorageError> {
        let id = GitopsEngineInstanceId::new(Self::uid("engine-instance"));
        self.storage.create_engine_instance(&GitopsEngineInstance {
            gitopsengineinstance_id: id.clone(),
            seq_id: 0,
            namespace_name: "gitops-engine".into(),
            namespace_uid: Self::uid("ns"),
            enginecluster_id: cluster.clone(),
        })?;
        Ok(id)
    }

    pub fn seed_environment(&mut self) -> Result<ManagedEnvironmentId, StorageError> {
        let creds = self.seed_credentials()?;
        let id = ManagedEnvironmentId::new(Self::uid("env"));
        self.storage.create_managed_environment(&ManagedEnvironment {
            managedenvironment_id: id.clone(),
            seq_id: 0,
            name: "staging".into(),
            clustercredentials_id: creds,
        })?;
        Ok(id)
    }

    pub fn seed_user(&mut self) -> Result<ClusterUserId, StorageError> {
        let id = ClusterUserId::new(Self::uid("user"));
        self.storage.create_cluster_user(&ClusterUser {
            clusteruser_id: id.clone(),
            seq_id: 0,
            user_name: "jane".into(),
        })?;
        Ok(id)
    }

    pub fn seed_access(
        &mut self,
        user: &ClusterUserId,
        environment: &ManagedEnvironmentId,
        instance: &GitopsEngineInstanceId,
    ) -> Result<(), StorageError> {
        self.storage.create_cluster_access(&ClusterAccess {
            clusteraccess_user_id: user.clone(),
            clusteraccess_managed_environment_id: environment.clone(),
            clusteraccess_gitops_engine_instance_id: instance.clone(),
            seq_id: 0,
        })?;
        Ok(())
    }

    pub fn seed_application(
        &mut self,
        instance: &GitopsEngineInstanceId,
        environment: &ManagedEnvironmentId,
    ) -> Result<ApplicationId, StorageError> {
        let id = ApplicationId::new(Self::uid("app"));
        self.storage.create_application(&Application {
            application_id: id.clone(),
            seq_id: 0,
            name: "guestbook".into(),
            spec_field: r#"{"source":{"repoURL":"https://example.com/repo.git"}}"#.into(),
            engine_instance_inst_id: instance.clone(),
            managed_environment_id: environment.clone(),
        })?;
        Ok(id)
    }

    /// A ready-to-create operation against the given target.
    pub fn new_operation(
        instance: &GitopsEngineInstanceId,
        owner: &ClusterUserId,
        target: OperationTarget,
    ) -> NewOperation {
        NewOperation {
            operation_id: OperationId::new(Self::uid("op")),
            instance_id: instance.clone(),
            target,
            owner_user_id: owner.clone(),
            human_readable_state: "queued".into(),
        }
    }
}
