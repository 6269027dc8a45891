use chrono::{DateTime, Utc};

use gitopsdb_core::{
    Application, ApplicationState, ClusterAccess, ClusterCredentials, ClusterUser,
    GitopsEngineCluster, GitopsEngineInstance, ManagedEnvironment, Operation, OperationState,
    ids::*,
};

use crate::error::StorageError;

// One repository trait per entity so the schema description stays
// decoupled from any particular storage binding. Create methods return
// the seq_id assigned by the store; the seq_id on the passed-in record
// is ignored. Every key is supplied by the caller.

pub trait ClusterCredentialsRepository {
    fn create_cluster_credentials(
        &mut self,
        creds: &ClusterCredentials,
    ) -> Result<i64, StorageError>;

    fn get_cluster_credentials(
        &self,
        id: &ClusterCredentialsId,
    ) -> Result<ClusterCredentials, StorageError>;

    fn update_cluster_credentials(&mut self, creds: &ClusterCredentials)
    -> Result<(), StorageError>;

    fn delete_cluster_credentials(&mut self, id: &ClusterCredentialsId)
    -> Result<(), StorageError>;
}

pub trait GitopsEngineClusterRepository {
    fn create_engine_cluster(&mut self, cluster: &GitopsEngineCluster)
    -> Result<i64, StorageError>;

    fn get_engine_cluster(
        &self,
        id: &GitopsEngineClusterId,
    ) -> Result<GitopsEngineCluster, StorageError>;

    fn update_engine_cluster(&mut self, cluster: &GitopsEngineCluster)
    -> Result<(), StorageError>;

    fn delete_engine_cluster(&mut self, id: &GitopsEngineClusterId) -> Result<(), StorageError>;

    fn list_engine_clusters_by_credentials(
        &self,
        credentials_id: &ClusterCredentialsId,
    ) -> Result<Vec<GitopsEngineCluster>, StorageError>;
}

pub trait GitopsEngineInstanceRepository {
    fn create_engine_instance(
        &mut self,
        instance: &GitopsEngineInstance,
    ) -> Result<i64, StorageError>;

    fn get_engine_instance(
        &self,
        id: &GitopsEngineInstanceId,
    ) -> Result<GitopsEngineInstance, StorageError>;

    fn update_engine_instance(
        &mut self,
        instance: &GitopsEngineInstance,
    ) -> Result<(), StorageError>;

    fn delete_engine_instance(&mut self, id: &GitopsEngineInstanceId) -> Result<(), StorageError>;

    fn list_engine_instances_by_cluster(
        &self,
        cluster_id: &GitopsEngineClusterId,
    ) -> Result<Vec<GitopsEngineInstance>, StorageError>;
}

pub trait ManagedEnvironmentRepository {
    fn create_managed_environment(
        &mut self,
        env: &ManagedEnvironment,
    ) -> Result<i64, StorageError>;

    fn get_managed_environment(
        &self,
        id: &ManagedEnvironmentId,
    ) -> Result<ManagedEnvironment, StorageError>;

    fn update_managed_environment(&mut self, env: &ManagedEnvironment)
    -> Result<(), StorageError>;

    fn delete_managed_environment(&mut self, id: &ManagedEnvironmentId)
    -> Result<(), StorageError>;

    fn list_managed_environments_by_credentials(
        &self,
        credentials_id: &ClusterCredentialsId,
    ) -> Result<Vec<ManagedEnvironment>, StorageError>;
}

pub trait ClusterUserRepository {
    fn create_cluster_user(&mut self, user: &ClusterUser) -> Result<i64, StorageError>;

    fn get_cluster_user(&self, id: &ClusterUserId) -> Result<ClusterUser, StorageError>;

    fn update_cluster_user(&mut self, user: &ClusterUser) -> Result<(), StorageError>;

    fn delete_cluster_user(&mut self, id: &ClusterUserId) -> Result<(), StorageError>;
}

pub trait ClusterAccessRepository {
    /// Inserts a grant. A duplicate (user, environment, instance) triple
    /// fails with `ConstraintViolation`.
    fn create_cluster_access(&mut self, access: &ClusterAccess) -> Result<i64, StorageError>;

    fn get_cluster_access(
        &self,
        user_id: &ClusterUserId,
        environment_id: &ManagedEnvironmentId,
        instance_id: &GitopsEngineInstanceId,
    ) -> Result<ClusterAccess, StorageError>;

    fn delete_cluster_access(
        &mut self,
        user_id: &ClusterUserId,
        environment_id: &ManagedEnvironmentId,
        instance_id: &GitopsEngineInstanceId,
    ) -> Result<(), StorageError>;

    fn list_cluster_access_by_user(
        &self,
        user_id: &ClusterUserId,
    ) -> Result<Vec<ClusterAccess>, StorageError>;

    fn list_cluster_access_by_managed_environment(
        &self,
        environment_id: &ManagedEnvironmentId,
    ) -> Result<Vec<ClusterAccess>, StorageError>;

    fn list_cluster_access_by_engine_instance(
        &self,
        instance_id: &GitopsEngineInstanceId,
    ) -> Result<Vec<ClusterAccess>, StorageError>;
}

pub trait ApplicationRepository {
    fn create_application(&mut self, app: &Application) -> Result<i64, StorageError>;

    fn get_application(&self, id: &ApplicationId) -> Result<Application, StorageError>;

    fn update_application(&mut self, app: &Application) -> Result<(), StorageError>;

    fn delete_application(&mut self, id: &ApplicationId) -> Result<(), StorageError>;

    fn list_applications_by_engine_instance(
        &self,
        instance_id: &GitopsEngineInstanceId,
    ) -> Result<Vec<Application>, StorageError>;

    fn list_applications_by_managed_environment(
        &self,
        environment_id: &ManagedEnvironmentId,
    ) -> Result<Vec<Application>, StorageError>;
}

pub trait ApplicationStateRepository {
    /// Observed status is always overwritten, never merged: insert or
    /// replace in one call.
    fn upsert_application_state(&mut self, state: &ApplicationState) -> Result<i64, StorageError>;

    fn get_application_state(&self, id: &ApplicationId) -> Result<ApplicationState, StorageError>;

    fn delete_application_state(&mut self, id: &ApplicationId) -> Result<(), StorageError>;
}

pub trait OperationRepository {
    fn create_operation(&mut self, op: &Operation) -> Result<i64, StorageError>;

    fn get_operation(&self, id: &OperationId) -> Result<Operation, StorageError>;

    fn delete_operation(&mut self, id: &OperationId) -> Result<(), StorageError>;

    fn list_operations_by_instance(
        &self,
        instance_id: &GitopsEngineInstanceId,
    ) -> Result<Vec<Operation>, StorageError>;

    fn list_operations_by_owner(
        &self,
        owner_user_id: &ClusterUserId,
    ) -> Result<Vec<Operation>, StorageError>;

    fn list_waiting_operations(&self) -> Result<Vec<Operation>, StorageError>;

    /// Conditional write backing claim, finalize and reclamation: moves
    /// the row from `from` to `to` and refreshes `last_state_update`
    /// only if it is still in `from`. Returns whether the row moved —
    /// `false` means the race was lost, which is not an error here.
    ///
    /// When `message` is `Some`, `human_readable_state` is replaced in
    /// the same write.
    fn compare_and_swap_operation_state(
        &mut self,
        id: &OperationId,
        from: OperationState,
        to: OperationState,
        message: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<bool, StorageError>;

    /// `In_Progress` rows whose `last_state_update` is strictly older
    /// than `older_than`; reclamation candidates.
    fn list_stale_in_progress(
        &self,
        older_than: DateTime<Utc>,
    ) -> Result<Vec<Operation>, StorageError>;

    /// Garbage-collects terminal rows whose `last_state_update` is
    /// strictly older than `cutoff`. Returns how many were deleted.
    fn delete_terminal_operations_before(
        &mut self,
        cutoff: DateTime<Utc>,
    ) -> Result<usize, StorageError>;
}

/// Everything a control-plane process needs from the store.
pub trait ControlPlaneRepository:
    ClusterCredentialsRepository
    + GitopsEngineClusterRepository
    + GitopsEngineInstanceRepository
    + ManagedEnvironmentRepository
    + ClusterUserRepository
    + ClusterAccessRepository
    + ApplicationRepository
    + ApplicationStateRepository
    + OperationRepository
{
}

impl<T> ControlPlaneRepository for T where
    T: ClusterCredentialsRepository
        + GitopsEngineClusterRepository
        + GitopsEngineInstanceRepository
        + ManagedEnvironmentRepository
        + ClusterUserRepository
        + ClusterAccessRepository
        + ApplicationRepository
        + ApplicationStateRepository
        + OperationRepository
{
}
