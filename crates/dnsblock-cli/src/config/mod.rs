//! Configuration management.
//!
//! A TOML file with one table per concern. Every key is optional; a missing
//! file means all defaults.

use directories::ProjectDirs;
use dnsblock_core::UnmatchedLines;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No platform configuration directory could be determined.
    #[error("could not determine config directory")]
    NoConfigDir,

    /// The file exists but could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        /// Config file path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema.
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        /// Config file path.
        path: PathBuf,
        /// Underlying error.
        source: toml::de::Error,
    },

    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// dnsblock configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Rule and output file locations.
    #[serde(default)]
    pub files: FilesConfig,

    /// External resolver budget and alias handling.
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Query-log filtering.
    #[serde(default)]
    pub log_filter: LogFilterConfig,

    /// Zone and RPZ output.
    #[serde(default)]
    pub zone: ZoneConfig,

    /// Advisory scanner.
    #[serde(default)]
    pub advisory: AdvisoryConfig,
}

/// Rule and output file locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilesConfig {
    /// Primary block list, rewritten by `simplify` and `add`.
    #[serde(default = "default_blocked")]
    pub blocked: PathBuf,

    /// Further block lists, only ever read.
    #[serde(default)]
    pub extra_blocked: Vec<PathBuf>,

    /// Allow list. A missing file counts as empty.
    #[serde(default = "default_allowed")]
    pub allowed: PathBuf,

    /// BIND zone stanza output.
    #[serde(default = "default_zones")]
    pub zones: PathBuf,

    /// RPZ master file output.
    #[serde(default = "default_rpz")]
    pub rpz: PathBuf,
}

/// Resolver budget and alias handling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Per-query timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Attempts per query.
    #[serde(default = "default_attempts")]
    pub attempts: usize,

    /// Longest CNAME chain followed.
    #[serde(default = "default_max_alias_hops")]
    pub max_alias_hops: usize,

    /// Propagate allow rules to CNAME targets.
    #[serde(default = "default_true")]
    pub follow_aliases: bool,
}

/// Query-log filtering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFilterConfig {
    /// Lines resolved concurrently; 1 is strictly sequential.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Lines without an `A` query.
    #[serde(default)]
    pub unmatched: UnmatchedLines,

    /// Reverse-DNS cache entries known up front.
    #[serde(default = "default_known_hosts")]
    pub known_hosts: BTreeMap<String, String>,
}

/// Zone and RPZ output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneConfig {
    /// Zone file every stanza points BIND at.
    #[serde(default = "default_zone_file")]
    pub zone_file: String,

    /// RPZ origin, fully qualified.
    #[serde(default = "default_rpz_origin")]
    pub rpz_origin: String,

    /// TTL for RPZ records.
    #[serde(default = "default_rpz_ttl")]
    pub rpz_ttl: u32,
}

/// Advisory scanner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisoryConfig {
    /// Child count above which a node is reported.
    #[serde(default = "default_threshold")]
    pub threshold: usize,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            blocked: default_blocked(),
            extra_blocked: Vec::new(),
            allowed: default_allowed(),
            zones: default_zones(),
            rpz: default_rpz(),
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            attempts: default_attempts(),
            max_alias_hops: default_max_alias_hops(),
            follow_aliases: true,
        }
    }
}

impl Default for LogFilterConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            unmatched: UnmatchedLines::default(),
            known_hosts: default_known_hosts(),
        }
    }
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            zone_file: default_zone_file(),
            rpz_origin: default_rpz_origin(),
            rpz_ttl: default_rpz_ttl(),
        }
    }
}

impl Default for AdvisoryConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
        }
    }
}

impl ResolverConfig {
    /// Per-query timeout.
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl LogFilterConfig {
    /// Parsed `known_hosts` entries.
    pub fn known_hosts(&self) -> Result<Vec<(IpAddr, String)>, ConfigError> {
        self.known_hosts
            .iter()
            .map(|(ip, host)| {
                ip.parse()
                    .map(|ip| (ip, host.clone()))
                    .map_err(|_| ConfigError::Invalid(format!("known_hosts key '{ip}' is not an IP address")))
            })
            .collect()
    }
}

impl Config {
    /// Default config file path in the platform config directory.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let dirs = ProjectDirs::from("org", "dnsblock", "dnsblock").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Load configuration from `path`, or from the default location.
    ///
    /// A missing file yields the defaults. The result is validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };

        let config = if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            Self::from_toml(&content).map_err(|source| ConfigError::Parse { path, source })?
        } else {
            Self::default()
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse configuration text without validating it.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Reject values the tool cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.log_filter.concurrency == 0 {
            return Err(ConfigError::Invalid("log_filter.concurrency must be at least 1".into()));
        }
        if self.resolver.max_alias_hops == 0 {
            return Err(ConfigError::Invalid("resolver.max_alias_hops must be at least 1".into()));
        }
        if self.resolver.timeout_ms == 0 {
            return Err(ConfigError::Invalid("resolver.timeout_ms must be positive".into()));
        }
        if self.resolver.attempts == 0 {
            return Err(ConfigError::Invalid("resolver.attempts must be at least 1".into()));
        }
        if !self.zone.rpz_origin.ends_with('.') {
            return Err(ConfigError::Invalid("zone.rpz_origin must be fully qualified".into()));
        }
        self.log_filter.known_hosts()?;
        Ok(())
    }
}

// Default value functions for serde.
fn default_blocked() -> PathBuf {
    PathBuf::from("hosts_blocked.txt")
}

fn default_allowed() -> PathBuf {
    PathBuf::from("hosts_allowed.txt")
}

fn default_zones() -> PathBuf {
    PathBuf::from("zones.adblock")
}

fn default_rpz() -> PathBuf {
    PathBuf::from("db.rpz.adblock")
}

const fn default_timeout_ms() -> u64 {
    2000
}

const fn default_attempts() -> usize {
    2
}

const fn default_max_alias_hops() -> usize {
    dnsblock_core::alias::DEFAULT_MAX_HOPS
}

const fn default_true() -> bool {
    true
}

const fn default_concurrency() -> usize {
    8
}

fn default_known_hosts() -> BTreeMap<String, String> {
    BTreeMap::from([("127.0.0.1".to_owned(), "localhost".to_owned())])
}

fn default_zone_file() -> String {
    String::from("/etc/bind/adblock/db.adblock")
}

fn default_rpz_origin() -> String {
    String::from("rpz.adblock.")
}

const fn default_rpz_ttl() -> u32 {
    3600
}

const fn default_threshold() -> usize {
    dnsblock_core::advisory::DEFAULT_THRESHOLD
}
