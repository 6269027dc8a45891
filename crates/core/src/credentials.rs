use serde::{Deserialize, Serialize};

use crate::ids::ClusterCredentialsId;

/// Which of the two supported authentication representations a
/// credentials row currently holds.
///
/// A row starts in kubeconfig state (the raw content a user would paste
/// from `~/.kube/config`, plus a context name) and is promoted to
/// service-account state by the cluster agent, which exchanges the
/// kubeconfig for a bearer token on the target cluster. The promotion
/// happens at most once and is never reversed under normal operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CredentialMode {
    Kubeconfig,
    ServiceAccount,
}

/// Credentials required to access one remote cluster.
///
/// The mode is inferred from field presence rather than stored: the row
/// is in service-account state iff `serviceaccount_bearer_token` is
/// non-empty. Unpopulated fields of the other mode are empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterCredentials {
    pub clustercredentials_cred_id: ClusterCredentialsId,
    pub seq_id: i64,

    /// API URL for the cluster, e.g. `https://api.example.com:6443`.
    pub host: String,

    /// Kubeconfig state: full kubeconfig content.
    pub kube_config: String,

    /// Kubeconfig state: name of a context within `kube_config`.
    pub kube_config_context: String,

    /// Service-account state: bearer token on the target cluster.
    pub serviceaccount_bearer_token: String,

    /// Service-account state: namespace of the service account.
    pub serviceaccount_ns: String,
}

impl ClusterCredentials {
    pub fn mode(&self) -> CredentialMode {
        if self.serviceaccount_bearer_token.is_empty() {
            CredentialMode::Kubeconfig
        } else {
            CredentialMode::ServiceAccount
        }
    }
}
