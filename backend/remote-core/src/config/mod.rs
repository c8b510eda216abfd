//! Configuration for the remote service and the node that hosts it.
//!
//! [`RemoteConfig`] is the option set recognised by the remote service. Keys
//! use the camelCase names operators already write (`whitelistPath`,
//! `bufferMsg`, ...); keys the service does not know are kept in
//! [`RemoteConfig::extra`] and passed through to the RPC server untouched.
//!
//! [`NodeConfig`] is the on-disk JSON document a node starts from.

use crate::error::config::ConfigError;

use common::ErrorLocation;
use models::{AppContext, ServerRecord, ServerRecordBuilder};

use std::panic::Location;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::info;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const CONFIG_VERSION: u32 = 1;

/// Poll interval for the whitelist file when none is configured.
pub const DEFAULT_WHITELIST_INTERVAL_MS: u64 = 60_000;

/// RPC heartbeat interval when none is configured.
pub const DEFAULT_RPC_INTERVAL: u64 = 30;

/// System remote root, relative to the application base.
pub const DEFAULT_SYS_REMOTE_ROOT: &str = "lib/common/remote";

/// Application setting that turns on verbose RPC logging.
pub const RPC_DEBUG_LOG_SETTING: &str = "rpcDebugLog";

/// Log target used for verbose RPC logging.
pub const RPC_DEBUG_LOG_TARGET: &str = "rpc-debug";

// ============================================
// REMOTE OPTIONS
// ============================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteConfig {
    /// Whitelist source. Absent disables connection filtering.
    #[serde(default)]
    pub whitelist_path: Option<PathBuf>,

    /// Whitelist poll interval in milliseconds.
    #[serde(default)]
    pub whitelist_interval: Option<u64>,

    #[serde(default)]
    pub buffer_msg: Option<bool>,

    /// Deprecated spelling of `bufferMsg`.
    #[serde(default)]
    pub cache_msg: Option<bool>,

    /// RPC heartbeat interval.
    #[serde(default)]
    pub interval: Option<u64>,

    #[serde(default)]
    pub rpc_debug_log: Option<bool>,

    /// Root of the system remote directories.
    #[serde(default)]
    pub sys_remote_root: Option<PathBuf>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RemoteConfig {
    pub fn with_whitelist_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.whitelist_path = Some(path.into());
        self
    }

    pub fn with_whitelist_interval(mut self, millis: u64) -> Self {
        self.whitelist_interval = Some(millis);
        self
    }

    pub fn with_sys_remote_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.sys_remote_root = Some(root.into());
        self
    }

    /// `bufferMsg`, falling back to the legacy `cacheMsg`, default false.
    pub fn buffer_msg(&self) -> bool {
        self.buffer_msg.unwrap_or(false) || self.cache_msg.unwrap_or(false)
    }

    /// Heartbeat interval; zero counts as unset.
    pub fn interval(&self) -> u64 {
        self.interval
            .filter(|interval| *interval > 0)
            .unwrap_or(DEFAULT_RPC_INTERVAL)
    }

    /// Whitelist poll interval; zero counts as unset.
    pub fn whitelist_interval(&self) -> Duration {
        let millis = self
            .whitelist_interval
            .filter(|millis| *millis > 0)
            .unwrap_or(DEFAULT_WHITELIST_INTERVAL_MS);
        Duration::from_millis(millis)
    }

    /// Verbose RPC logging is on when either the option or the application
    /// setting asks for it.
    pub fn rpc_debug_log(&self, context: &AppContext) -> bool {
        self.rpc_debug_log.unwrap_or(false) || context.is_enabled(RPC_DEBUG_LOG_SETTING)
    }

    pub fn sys_remote_root(&self, base: &Path) -> PathBuf {
        let root = self
            .sys_remote_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SYS_REMOTE_ROOT));

        if root.is_absolute() {
            root
        } else {
            base.join(root)
        }
    }

    /// Validate option values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] for an empty `whitelistPath`.
    #[track_caller]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ref path) = self.whitelist_path
            && path.as_os_str().is_empty()
        {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: "whitelistPath cannot be empty".to_string(),
            });
        }

        Ok(())
    }
}

// ============================================
// NODE CONFIG
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Application base directory. Relative paths are resolved against the
    /// directory holding the config file.
    #[serde(default = "default_base")]
    pub base: PathBuf,

    pub server: ServerRecord,

    /// Enabled application settings.
    #[serde(default)]
    pub enabled: Vec<String>,

    #[serde(default)]
    pub remote: RemoteConfig,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

fn default_base() -> PathBuf {
    PathBuf::from(".")
}

impl NodeConfig {
    /// Load and validate a node config from a JSON file.
    ///
    /// A relative `base` and a relative `remote.whitelistPath` are anchored
    /// at the config file's directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, is not valid JSON,
    /// or fails validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            location: ErrorLocation::from(Location::caller()),
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut config: NodeConfig =
            serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError {
                location: ErrorLocation::from(Location::caller()),
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let config_dir = path.parent().unwrap_or_else(|| Path::new("."));
        if config.base.is_relative() {
            config.base = config_dir.join(&config.base);
        }
        if let Some(ref whitelist) = config.remote.whitelist_path
            && whitelist.is_relative()
        {
            config.remote.whitelist_path = Some(config_dir.join(whitelist));
        }

        config.validate()?;

        info!(
            "Node config loaded from {} (server {})",
            path.display(),
            config.server.id
        );
        Ok(config)
    }

    /// Validate config values.
    ///
    /// The server record goes through [`ServerRecordBuilder`] so a record read
    /// from disk is held to the same rules as one built in code.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if any value is invalid.
    #[track_caller]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version == 0 || self.version > CONFIG_VERSION {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!(
                    "Invalid version: {} (expected 1-{})",
                    self.version, CONFIG_VERSION
                ),
            });
        }

        let mut builder = ServerRecordBuilder::default()
            .with_id(self.server.id.clone())
            .with_server_type(self.server.server_type.clone())
            .with_host(self.server.host.clone())
            .with_port(self.server.port)
            .with_frontend(self.server.frontend);
        if let Some(client_port) = self.server.client_port {
            builder = builder.with_client_port(client_port);
        }
        builder.build().map_err(|e| ConfigError::ValidationError {
            location: ErrorLocation::from(Location::caller()),
            reason: e.to_string(),
        })?;

        self.remote.validate()
    }

    /// Build the application handle described by this config.
    pub fn app_context(&self) -> AppContext {
        self.enabled.iter().fold(
            AppContext::new(self.base.clone(), self.server.clone()),
            |context, setting| context.with_enabled(setting.clone()),
        )
    }
}
