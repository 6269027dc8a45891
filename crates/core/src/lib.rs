pub mod application;
pub mod credentials;
pub mod error;
pub mod ids;
pub mod operation;
pub mod topology;

pub use application::{Application, ApplicationState, HealthStatus, SyncStatus};
pub use credentials::{ClusterCredentials, CredentialMode};
pub use error::CoreError;
pub use ids::*;
pub use operation::{Operation, OperationState, OperationTarget};
pub use topology::{
    ClusterAccess, ClusterUser, GitopsEngineCluster, GitopsEngineInstance, ManagedEnvironment,
};
