use serde::{Deserialize, Serialize};
use std::fmt;

/// Entity UIDs are opaque strings minted by the caller (API layer),
/// never by the schema layer itself.
macro_rules! string_id {
    ($name:ident) => {
        #[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(uid: impl Into<String>) -> Self {
                Self(uid.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                // UIDs are opaque; truncate by characters, not bytes.
                let short: String = self.0.chars().take(8).collect();
                write!(f, "{}({})", stringify!($name), short)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(uid: String) -> Self {
                Self(uid)
            }
        }

        impl From<&str> for $name {
            fn from(uid: &str) -> Self {
                Self(uid.to_string())
            }
        }
    };
}

string_id!(ClusterCredentialsId);
string_id!(GitopsEngineClusterId);
string_id!(GitopsEngineInstanceId);
string_id!(ManagedEnvironmentId);
string_id!(ClusterUserId);
string_id!(ApplicationId);
string_id!(OperationId);
