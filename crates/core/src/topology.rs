use serde::{Deserialize, Serialize};

use crate::ids::{
    ClusterCredentialsId, ClusterUserId, GitopsEngineClusterId, GitopsEngineInstanceId,
    ManagedEnvironmentId,
};

/// A cluster that hosts one or more deployment-engine instances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitopsEngineCluster {
    pub gitopsenginecluster_id: GitopsEngineClusterId,
    pub seq_id: i64,

    /// Credentials for the hosting cluster.
    pub clustercredentials_id: ClusterCredentialsId,
}

/// One deployment-engine instance, scoped to a namespace on its engine
/// cluster. A cluster may host many instances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitopsEngineInstance {
    pub gitopsengineinstance_id: GitopsEngineInstanceId,
    pub seq_id: i64,

    pub namespace_name: String,
    pub namespace_uid: String,

    pub enginecluster_id: GitopsEngineClusterId,
}

/// A user-defined deployment target: the namespace(s) on a user's
/// cluster that applications are deployed into. Carries its own
/// credentials, independent of the engine's hosting cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedEnvironment {
    pub managedenvironment_id: ManagedEnvironmentId,
    pub seq_id: i64,

    pub name: String,

    pub clustercredentials_id: ClusterCredentialsId,
}

/// An individual user/customer. Placeholder shape: a real identity
/// model would carry far more than a display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterUser {
    pub clusteruser_id: ClusterUserId,
    pub seq_id: i64,

    pub user_name: String,
}

/// Grants a user access to a managed environment under a specific
/// engine instance. The triple is the natural key; duplicates are
/// rejected by the storage layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterAccess {
    pub clusteraccess_user_id: ClusterUserId,
    pub clusteraccess_managed_environment_id: ManagedEnvironmentId,
    pub clusteraccess_gitops_engine_instance_id: GitopsEngineInstanceId,
    pub seq_id: i64,
}
