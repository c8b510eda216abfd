use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FormatResult};
use std::path::PathBuf;

/// Who provides a remote-interface directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathNamespace {
    /// Shipped with the framework, keyed by server role.
    Sys,
    /// Written by the application, keyed by server type.
    User,
}

impl Display for PathNamespace {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        match self {
            PathNamespace::Sys => f.write_str("sys"),
            PathNamespace::User => f.write_str("user"),
        }
    }
}

/// A directory of remote-callable modules exposed through the RPC server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemotePathRecord {
    pub namespace: PathNamespace,
    pub server_type: String,
    pub path: PathBuf,
}

impl RemotePathRecord {
    pub fn new(namespace: PathNamespace, server_type: impl Into<String>, path: PathBuf) -> Self {
        Self {
            namespace,
            server_type: server_type.into(),
            path,
        }
    }
}
