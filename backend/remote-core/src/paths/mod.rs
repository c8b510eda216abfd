//! Discovery of remote-interface directories.
//!
//! Two locations can hold remote-callable modules for a server:
//!
//! - the system directory shipped with the framework, keyed by role:
//!   `<sys root>/frontend` or `<sys root>/backend`
//! - the application directory, keyed by server type:
//!   `<base>/app/servers/<server type>/remote`
//!
//! Only locations that exist are returned, system first, so the RPC server
//! can let user modules shadow system ones.

use models::{AppContext, PathNamespace, RemotePathRecord, ServerRole};

use std::path::{Path, PathBuf};

use log::{debug, trace};

const USER_SERVERS_DIR: &str = "app/servers";
const USER_REMOTE_DIR: &str = "remote";

#[derive(Debug, Clone)]
pub struct PathResolver {
    sys_root: PathBuf,
    base: PathBuf,
}

impl PathResolver {
    pub fn new(sys_root: impl Into<PathBuf>, base: impl Into<PathBuf>) -> Self {
        Self {
            sys_root: sys_root.into(),
            base: base.into(),
        }
    }

    pub fn sys_remote_path(&self, role: ServerRole) -> PathBuf {
        self.sys_root.join(role.as_str())
    }

    pub fn user_remote_path(&self, server_type: &str) -> PathBuf {
        self.base
            .join(USER_SERVERS_DIR)
            .join(server_type)
            .join(USER_REMOTE_DIR)
    }

    /// Existing remote directories for `role` and `server_type`, system first.
    pub fn resolve_paths(&self, role: ServerRole, server_type: &str) -> Vec<RemotePathRecord> {
        let candidates = [
            (PathNamespace::Sys, self.sys_remote_path(role)),
            (PathNamespace::User, self.user_remote_path(server_type)),
        ];

        let mut paths = Vec::with_capacity(candidates.len());
        for (namespace, path) in candidates {
            if path_exists(&path) {
                debug!("Exposing {namespace} remote path {}", path.display());
                paths.push(RemotePathRecord::new(namespace, server_type, path));
            } else {
                trace!("Skipping missing {namespace} remote path {}", path.display());
            }
        }

        paths
    }

    /// Resolve for the server described by `context`.
    pub fn resolve_for(&self, context: &AppContext) -> Vec<RemotePathRecord> {
        self.resolve_paths(context.role(), context.server_type())
    }
}

fn path_exists(path: &Path) -> bool {
    path.try_exists().unwrap_or(false)
}
