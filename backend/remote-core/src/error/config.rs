use std::path::PathBuf;

use common::ErrorLocation;
use thiserror::Error;

/// Fatal configuration problems. Any of these aborts service startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config Read Error: {path}: {source} {location}")]
    ReadError {
        location: ErrorLocation,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config Parse Error: {path}: {reason} {location}")]
    ParseError {
        location: ErrorLocation,
        path: PathBuf,
        reason: String,
    },

    #[error("Config Path Resolution Error: {path}: {source} {location}")]
    PathResolution {
        location: ErrorLocation,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Whitelist Shape Error: {path} should be an array, found {found} {location}")]
    WhitelistNotArray {
        location: ErrorLocation,
        path: PathBuf,
        found: &'static str,
    },

    #[error("Whitelist Entry Error: {path}: entry {index} should be a string, found {found} {location}")]
    WhitelistEntry {
        location: ErrorLocation,
        path: PathBuf,
        index: usize,
        found: &'static str,
    },

    #[error("Config Validation Error: {reason} {location}")]
    ValidationError {
        location: ErrorLocation,
        reason: String,
    },
}
