//! IP whitelist for inbound RPC connections.
//!
//! The whitelist source is a JSON file holding an array of IP strings. Each
//! load re-reads the file and appends the loopback address and the host's
//! own interface addresses. [`WhitelistStore`] keeps the current result
//! behind an `Arc` and replaces it wholesale on reload, so readers always see
//! either the previous list or the new one.

pub mod interfaces;
pub mod watcher;

pub use interfaces::{InterfaceAddresses, PlatformFamily, SystemInterfaces};
pub use watcher::{FileWatcher, WatchState, modified_time_now};

use crate::error::config::ConfigError;

use common::ErrorLocation;

use std::collections::HashSet;
use std::fmt::{Debug, Formatter, Result as FormatResult};
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::SystemTime;

use log::info;
use serde_json::Value;

/// Always allowed.
pub const LOOPBACK_ADDRESS: &str = "127.0.0.1";

/// An immutable set of allowed IP strings, in order of first appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Whitelist {
    entries: Vec<String>,
    lookup: HashSet<String>,
}

impl Whitelist {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut whitelist = Self::default();
        for entry in entries {
            whitelist.push(entry.into());
        }
        whitelist
    }

    fn push(&mut self, entry: String) {
        if self.lookup.insert(entry.clone()) {
            self.entries.push(entry);
        }
    }

    pub fn contains(&self, ip: &str) -> bool {
        self.lookup.contains(ip)
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse whitelist file contents into the listed IP strings.
///
/// # Errors
///
/// - [`ConfigError::ParseError`] if `contents` is not JSON
/// - [`ConfigError::WhitelistNotArray`] if the top-level value is not an array
/// - [`ConfigError::WhitelistEntry`] if an element is not a string
#[track_caller]
pub fn parse_whitelist(path: &Path, contents: &str) -> Result<Vec<String>, ConfigError> {
    let location = ErrorLocation::from(Location::caller());

    let value: Value = serde_json::from_str(contents).map_err(|e| ConfigError::ParseError {
        location,
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let Value::Array(items) = value else {
        return Err(ConfigError::WhitelistNotArray {
            location,
            path: path.to_path_buf(),
            found: value_kind(&value),
        });
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::String(ip) => Ok(ip.trim().to_string()),
            other => Err(ConfigError::WhitelistEntry {
                location,
                path: path.to_path_buf(),
                index,
                found: value_kind(&other),
            }),
        })
        .collect()
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Resolve a configured whitelist path to its canonical location.
///
/// # Errors
///
/// Returns [`ConfigError::PathResolution`] if the path does not exist or
/// cannot be canonicalized.
#[track_caller]
pub fn resolve_source_path(path: &Path) -> Result<PathBuf, ConfigError> {
    let location = ErrorLocation::from(Location::caller());

    std::fs::canonicalize(path).map_err(|e| ConfigError::PathResolution {
        location,
        path: path.to_path_buf(),
        source: e,
    })
}

/// A whitelist file together with the local addresses merged into it.
#[derive(Clone)]
pub struct WhitelistSource {
    path: PathBuf,
    platform: PlatformFamily,
    interfaces: Arc<dyn InterfaceAddresses>,
}

impl WhitelistSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            platform: PlatformFamily::current(),
            interfaces: Arc::new(SystemInterfaces),
        }
    }

    pub fn with_platform(mut self, platform: PlatformFamily) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_interfaces(mut self, interfaces: Arc<dyn InterfaceAddresses>) -> Self {
        self.interfaces = interfaces;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file and build the effective whitelist.
    ///
    /// The file is read on every call.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadError`] if the file cannot be read, or any
    /// error from [`parse_whitelist`].
    #[track_caller]
    pub fn load(&self) -> Result<Whitelist, ConfigError> {
        let location = ErrorLocation::from(Location::caller());

        let contents =
            std::fs::read_to_string(&self.path).map_err(|e| ConfigError::ReadError {
                location,
                path: self.path.clone(),
                source: e,
            })?;

        let listed = parse_whitelist(&self.path, &contents)?;
        let local = interfaces::local_addresses(self.platform, self.interfaces.as_ref());

        let mut whitelist = Whitelist::new(listed);
        whitelist.push(LOOPBACK_ADDRESS.to_string());
        for address in local {
            whitelist.push(address.to_string());
        }

        Ok(whitelist)
    }
}

impl Debug for WhitelistSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        f.debug_struct("WhitelistSource")
            .field("path", &self.path)
            .field("platform", &self.platform)
            .finish_non_exhaustive()
    }
}

/// Owner of the current whitelist snapshot.
///
/// Cloning is cheap; all clones share the same snapshot.
#[derive(Debug, Clone)]
pub struct WhitelistStore {
    source: WhitelistSource,
    current: Arc<RwLock<Arc<Whitelist>>>,
    opened_modified: Option<SystemTime>,
}

impl WhitelistStore {
    /// Perform the initial load.
    ///
    /// # Errors
    ///
    /// Returns the [`ConfigError`] from [`WhitelistSource::load`].
    #[track_caller]
    pub fn open(source: WhitelistSource) -> Result<Self, ConfigError> {
        // Taken before the read: a write racing the load stays newer than this.
        let opened_modified = modified_time_now(source.path());
        let whitelist = source.load()?;
        log_whitelist(&source, &whitelist);

        Ok(Self {
            source,
            current: Arc::new(RwLock::new(Arc::new(whitelist))),
            opened_modified,
        })
    }

    /// Modification time of the source as seen just before the initial load.
    /// The baseline for watching the source.
    pub fn opened_modified(&self) -> Option<SystemTime> {
        self.opened_modified
    }

    pub fn source(&self) -> &WhitelistSource {
        &self.source
    }

    /// The whitelist as of now. Later reloads do not affect the returned value.
    pub fn snapshot(&self) -> Arc<Whitelist> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Re-read the source and swap in the result.
    ///
    /// On error the previous snapshot stays in place.
    ///
    /// # Errors
    ///
    /// Returns the [`ConfigError`] from [`WhitelistSource::load`].
    pub fn reload(&self) -> Result<Arc<Whitelist>, ConfigError> {
        let whitelist = Arc::new(self.source.load()?);

        {
            let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
            *guard = Arc::clone(&whitelist);
        }

        log_whitelist(&self.source, &whitelist);
        Ok(whitelist)
    }
}

fn log_whitelist(source: &WhitelistSource, whitelist: &Whitelist) {
    info!(
        "Whitelist loaded from {} ({} entries): {:?}",
        source.path().display(),
        whitelist.len(),
        whitelist.entries()
    );
}
