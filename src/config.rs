//! Configuration for the Xanadu benchmark client
//!
//! Centralized configuration with sensible defaults. The benchmark harness
//! hands us flat `key=value` properties; [`Config::from_properties`] turns
//! them into a typed [`Config`].

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::{Result, XanaduError};

// =============================================================================
// Property Names
// =============================================================================

/// Comma-separated registry addresses (required)
pub const REGISTRIES_PROPERTY: &str = "xanadu.registries";

/// Port used for every registry host without an explicit one
pub const PORT_PROPERTY: &str = "xanadu.port";

/// Number of replicas requested when creating store handles
pub const REPLICAS_PROPERTY: &str = "xanadu.replicas";

/// Content store backend: `plain` or `block`
pub const BACKEND_PROPERTY: &str = "xanadu.backend";

/// Block size in bytes for the block backend
pub const BLOCK_SIZE_PROPERTY: &str = "xanadu.blocksize";

/// Whether block checksums are verified on read
pub const CHECKSUM_PROPERTY: &str = "xanadu.checksum";

/// Registry lookup limit passed to store handles
pub const LOOKUP_LIMIT_PROPERTY: &str = "xanadu.lookuplimit";

// =============================================================================
// Defaults
// =============================================================================

/// Registry port used when neither the host nor `xanadu.port` names one
pub const DEFAULT_REGISTRY_PORT: u16 = 4242;

pub const DEFAULT_REPLICAS: usize = 2;

pub const DEFAULT_BLOCK_SIZE: usize = 1024 * 1024; // 1 MB

pub const DEFAULT_LOOKUP_LIMIT: usize = 1;

/// Main configuration for a Xanadu client
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Registry Configuration
    // -------------------------------------------------------------------------
    /// Coordination service addresses, each with its resolved port
    pub registries: Vec<RegistryAddress>,

    /// Port applied to hosts listed without one
    pub registry_port: u16,

    /// Registry lookup limit for store handles
    pub lookup_limit: usize,

    // -------------------------------------------------------------------------
    // Store Configuration
    // -------------------------------------------------------------------------
    /// Replicas requested when creating store handles
    pub replicas: usize,

    /// Which content store backend to use
    pub backend: Backend,

    /// Chunk size for the block backend (bytes)
    pub block_size: usize,

    /// Verify block checksums on read
    pub use_checksum: bool,
}

/// Content store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Each payload stored as a single blob
    Plain,

    /// Payloads chunked into fixed-size blocks plus a manifest
    Block,
}

impl std::str::FromStr for Backend {
    type Err = XanaduError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" => Ok(Backend::Plain),
            "block" => Ok(Backend::Block),
            other => Err(XanaduError::Config(format!(
                "unknown backend '{}' (expected 'plain' or 'block')",
                other
            ))),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Plain => write!(f, "plain"),
            Backend::Block => write!(f, "block"),
        }
    }
}

/// A registry host and the port it is reached on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryAddress {
    pub host: String,
    pub port: u16,
}

impl RegistryAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for RegistryAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            registries: Vec::new(),
            registry_port: DEFAULT_REGISTRY_PORT,
            lookup_limit: DEFAULT_LOOKUP_LIMIT,
            replicas: DEFAULT_REPLICAS,
            backend: Backend::Plain,
            block_size: DEFAULT_BLOCK_SIZE,
            use_checksum: true,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Build a config from harness properties
    ///
    /// `xanadu.registries` is required; everything else falls back to the
    /// defaults above.
    pub fn from_properties(props: &Properties) -> Result<Self> {
        let registry_port = match props.get(PORT_PROPERTY) {
            Some(raw) => parse_number::<u16>(PORT_PROPERTY, raw)?,
            None => DEFAULT_REGISTRY_PORT,
        };

        let hosts = props.get(REGISTRIES_PROPERTY).ok_or_else(|| {
            XanaduError::Config(format!("missing required property '{}'", REGISTRIES_PROPERTY))
        })?;
        let registries = parse_registry_addresses(hosts, registry_port)?;

        let replicas = match props.get(REPLICAS_PROPERTY) {
            Some(raw) => parse_number::<usize>(REPLICAS_PROPERTY, raw)?,
            None => DEFAULT_REPLICAS,
        };

        let backend = match props.get(BACKEND_PROPERTY) {
            Some(raw) => raw.parse()?,
            None => Backend::Plain,
        };

        let block_size = match props.get(BLOCK_SIZE_PROPERTY) {
            Some(raw) => parse_number::<usize>(BLOCK_SIZE_PROPERTY, raw)?,
            None => DEFAULT_BLOCK_SIZE,
        };

        let use_checksum = match props.get(CHECKSUM_PROPERTY) {
            Some(raw) => parse_bool(CHECKSUM_PROPERTY, raw)?,
            None => true,
        };

        let lookup_limit = match props.get(LOOKUP_LIMIT_PROPERTY) {
            Some(raw) => parse_number::<usize>(LOOKUP_LIMIT_PROPERTY, raw)?,
            None => DEFAULT_LOOKUP_LIMIT,
        };

        let config = Self {
            registries,
            registry_port,
            lookup_limit,
            replicas,
            backend,
            block_size,
            use_checksum,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants a store connection relies on
    pub fn validate(&self) -> Result<()> {
        if self.registries.is_empty() {
            return Err(XanaduError::Config(format!(
                "no registry addresses configured ('{}')",
                REGISTRIES_PROPERTY
            )));
        }
        if self.replicas == 0 {
            return Err(XanaduError::Config("replica count must be at least 1".to_string()));
        }
        if self.block_size == 0 {
            return Err(XanaduError::Config("block size must be at least 1 byte".to_string()));
        }
        if self.lookup_limit == 0 {
            return Err(XanaduError::Config("lookup limit must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Add a registry address
    pub fn registry(mut self, host: impl Into<String>, port: u16) -> Self {
        self.config.registries.push(RegistryAddress::new(host, port));
        self
    }

    /// Replace the registry list by parsing a comma-separated host string
    pub fn registries(mut self, hosts: &str) -> Result<Self> {
        self.config.registries = parse_registry_addresses(hosts, self.config.registry_port)?;
        Ok(self)
    }

    /// Set the default registry port (applies to later `registries()` calls)
    pub fn registry_port(mut self, port: u16) -> Self {
        self.config.registry_port = port;
        self
    }

    /// Set the replica count
    pub fn replicas(mut self, replicas: usize) -> Self {
        self.config.replicas = replicas;
        self
    }

    /// Set the content store backend
    pub fn backend(mut self, backend: Backend) -> Self {
        self.config.backend = backend;
        self
    }

    /// Set the block size (in bytes)
    pub fn block_size(mut self, size: usize) -> Self {
        self.config.block_size = size;
        self
    }

    /// Enable or disable block checksums
    pub fn use_checksum(mut self, enabled: bool) -> Self {
        self.config.use_checksum = enabled;
        self
    }

    /// Set the registry lookup limit
    pub fn lookup_limit(mut self, limit: usize) -> Self {
        self.config.lookup_limit = limit;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

// =============================================================================
// Registry Address Parsing
// =============================================================================

/// Parse `host[:port],host[:port],...` into registry addresses
///
/// Accepted forms per entry: `host`, `host:port`, `[v6]`, `[v6]:port`, and a
/// bare IPv6 literal (which never carries a port). Hosts without a port get
/// `default_port`.
pub fn parse_registry_addresses(hosts: &str, default_port: u16) -> Result<Vec<RegistryAddress>> {
    let mut addresses = Vec::new();

    for entry in hosts.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        addresses.push(parse_registry_address(entry, default_port)?);
    }

    if addresses.is_empty() {
        return Err(XanaduError::Config(format!(
            "'{}' lists no registry hosts",
            REGISTRIES_PROPERTY
        )));
    }

    Ok(addresses)
}

fn parse_registry_address(entry: &str, default_port: u16) -> Result<RegistryAddress> {
    // Bracketed IPv6: [addr] or [addr]:port
    if let Some(rest) = entry.strip_prefix('[') {
        let (host, tail) = rest.split_once(']').ok_or_else(|| {
            XanaduError::Config(format!("unterminated IPv6 literal in '{}'", entry))
        })?;
        let port = match tail {
            "" => default_port,
            _ => match tail.strip_prefix(':') {
                Some(port) => parse_number::<u16>(REGISTRIES_PROPERTY, port)?,
                None => {
                    return Err(XanaduError::Config(format!(
                        "unexpected text after IPv6 literal in '{}'",
                        entry
                    )))
                }
            },
        };
        return Ok(RegistryAddress::new(host, port));
    }

    match entry.matches(':').count() {
        0 => Ok(RegistryAddress::new(entry, default_port)),
        1 => {
            let (host, port) = entry.split_once(':').unwrap_or((entry, ""));
            if host.is_empty() {
                return Err(XanaduError::Config(format!("missing host in '{}'", entry)));
            }
            let port = parse_number::<u16>(REGISTRIES_PROPERTY, port)?;
            Ok(RegistryAddress::new(host, port))
        }
        // Bare IPv6 literal
        _ => Ok(RegistryAddress::new(entry, default_port)),
    }
}

fn parse_number<T: std::str::FromStr>(property: &str, raw: &str) -> Result<T> {
    raw.trim().parse::<T>().map_err(|_| {
        XanaduError::Config(format!("invalid value '{}' for '{}'", raw.trim(), property))
    })
}

fn parse_bool(property: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        other => Err(XanaduError::Config(format!(
            "invalid value '{}' for '{}' (expected true/false)",
            other, property
        ))),
    }
}

// =============================================================================
// Properties
// =============================================================================

/// Flat `key=value` property set, as handed over by a benchmark harness
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    values: BTreeMap<String, String>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse Java-style properties text
    ///
    /// One `key=value`, `key: value` or `key value` per line; lines starting
    /// with `#` or `!` and blank lines are skipped. A key without a value maps
    /// to the empty string. Line continuations and escapes are not supported.
    pub fn parse(text: &str) -> Self {
        let mut props = Self::new();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }

            let key_end = line
                .find(|c: char| c == '=' || c == ':' || c.is_whitespace())
                .unwrap_or(line.len());
            let (key, rest) = line.split_at(key_end);

            // Whitespace around the separator is optional, and so is the
            // `=`/`:` itself when whitespace separates key and value
            let rest = rest.trim_start();
            let value = rest
                .strip_prefix(|c: char| c == '=' || c == ':')
                .unwrap_or(rest);
            props.set(key, value.trim());
        }

        props
    }

    /// Load a properties file from disk
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(Self::parse(&text))
    }

    /// Parse a single `key=value` assignment (the `-p` command-line form)
    pub fn parse_assignment(assignment: &str) -> Result<(String, String)> {
        match assignment.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_string(), value.trim().to_string()))
            }
            _ => Err(XanaduError::Config(format!(
                "expected key=value, got '{}'",
                assignment
            ))),
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Overlay `other` on top of `self` (later sources win)
    pub fn merge(&mut self, other: Properties) {
        self.values.extend(other.values);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Properties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut props = Self::new();
        for (key, value) in iter {
            props.set(key, value);
        }
        props
    }
}
