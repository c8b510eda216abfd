use crate::server_record::{ServerRecord, ServerRole};

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Application handle handed to the RPC server as its invocation context.
#[derive(Debug, Clone)]
pub struct AppContext {
    base: PathBuf,
    server: ServerRecord,
    enabled: BTreeSet<String>,
}

impl AppContext {
    pub fn new(base: impl Into<PathBuf>, server: ServerRecord) -> Self {
        Self {
            base: base.into(),
            server,
            enabled: BTreeSet::new(),
        }
    }

    /// Enable a named application setting (e.g. `rpcDebugLog`).
    pub fn with_enabled(mut self, setting: impl Into<String>) -> Self {
        self.enabled.insert(setting.into());
        self
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn current_server(&self) -> &ServerRecord {
        &self.server
    }

    pub fn server_type(&self) -> &str {
        &self.server.server_type
    }

    pub fn server_id(&self) -> &str {
        &self.server.id
    }

    pub fn is_frontend(&self) -> bool {
        self.server.frontend
    }

    pub fn role(&self) -> ServerRole {
        self.server.role()
    }

    pub fn is_enabled(&self, setting: &str) -> bool {
        self.enabled.contains(setting)
    }
}
