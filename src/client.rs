//! Client Module
//!
//! The benchmark binding for Xanadu: CRUD operations composed from one
//! key-version call and at most one content-store call each.
//!
//! ## Call Sequences
//! ```text
//! read:   lookup_before(key, 0, MAX) ──► content.read(ref) ──► decode
//! insert: encode ──► content.store(bytes) ──► set_value(key, now, URI, ref)
//! update: same as insert
//! delete: insert(key, {})
//! scan:   always Unsupported
//! ```
//!
//! ## Lifecycle
//! `Uninitialized ──init──► Ready ──cleanup──► Closed`
//!
//! A failed `init` leaves the client `Uninitialized`. Operations outside
//! `Ready` fail with `NotInitialized`.

use std::collections::HashSet;
use std::mem;
use std::sync::Arc;

use crate::clock;
use crate::codec::{decode_record, encode_record, Record};
use crate::config::{Config, Properties};
use crate::db::{Db, Status};
use crate::error::{Result, XanaduError};
use crate::store::{StoreConnector, StoreHandles, StoreUri, Timestamp};

/// Namespace all benchmark data is written under
pub const STORE_URI: &str = "YCSB";

/// Where the client's configuration comes from
enum ConfigSource {
    /// Already typed; validated at init
    Typed(Config),

    /// Raw harness properties; parsed at init
    Properties(Properties),
}

/// Client lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Uninitialized,
    Ready,
    Closed,
}

enum ClientState {
    Uninitialized,
    Ready(StoreHandles),
    Closed,
}

/// Xanadu benchmark client
///
/// ## Concurrency
/// Operations take `&self` and hold no lock: the only state is the pair of
/// store handles acquired at `init`. A `Ready` client can be shared across
/// threads; thread safety of the data itself is up to the stores.
pub struct XanaduClient {
    source: ConfigSource,
    connector: Arc<dyn StoreConnector>,
    store_uri: StoreUri,
    state: ClientState,
}

impl XanaduClient {
    /// Create a client from a typed config
    pub fn new(config: Config, connector: Arc<dyn StoreConnector>) -> Self {
        Self::with_source(ConfigSource::Typed(config), connector)
    }

    /// Create a client from harness properties (parsed at `init`)
    pub fn from_properties(properties: Properties, connector: Arc<dyn StoreConnector>) -> Self {
        Self::with_source(ConfigSource::Properties(properties), connector)
    }

    fn with_source(source: ConfigSource, connector: Arc<dyn StoreConnector>) -> Self {
        Self {
            source,
            connector,
            store_uri: StoreUri::new(STORE_URI),
            state: ClientState::Uninitialized,
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        match self.state {
            ClientState::Uninitialized => Lifecycle::Uninitialized,
            ClientState::Ready(_) => Lifecycle::Ready,
            ClientState::Closed => Lifecycle::Closed,
        }
    }

    pub fn store_uri(&self) -> &StoreUri {
        &self.store_uri
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Resolve the config and open both store handles
    ///
    /// Calling this on a `Ready` client is a no-op. A closed client cannot
    /// be reopened.
    pub fn connect(&mut self) -> Result<()> {
        match self.state {
            ClientState::Ready(_) => return Ok(()),
            ClientState::Closed => return Err(XanaduError::NotInitialized),
            ClientState::Uninitialized => {}
        }

        let config = match &self.source {
            ConfigSource::Typed(config) => {
                config.validate()?;
                config.clone()
            }
            ConfigSource::Properties(props) => Config::from_properties(props)?,
        };

        let handles = self.connector.connect(&config)?;
        self.state = ClientState::Ready(handles);

        tracing::info!(
            backend = %config.backend,
            registries = %join_registries(&config),
            replicas = config.replicas,
            "Xanadu client ready"
        );
        Ok(())
    }

    /// Close both store handles
    ///
    /// Both closes are attempted even if the first fails; the first failure
    /// is returned. The client is `Closed` afterwards either way.
    pub fn close(&mut self) -> Result<()> {
        let handles = match mem::replace(&mut self.state, ClientState::Closed) {
            ClientState::Ready(handles) => handles,
            ClientState::Uninitialized | ClientState::Closed => return Ok(()),
        };

        let key_versions = handles.key_versions.close();
        if let Err(ref e) = key_versions {
            tracing::error!(kind = e.kind(), error = %e, "Failed to close key-value store");
        }

        let content = handles.content.close();
        if let Err(ref e) = content {
            tracing::error!(kind = e.kind(), error = %e, "Failed to close content store");
        }

        key_versions.and(content)
    }

    fn handles(&self) -> Result<&StoreHandles> {
        match &self.state {
            ClientState::Ready(handles) => Ok(handles),
            ClientState::Uninitialized | ClientState::Closed => Err(XanaduError::NotInitialized),
        }
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Most recent version of `key`
    ///
    /// A deleted key reads back as the empty record.
    pub fn read_record(&self, key: &str) -> Result<Record> {
        let handles = self.handles()?;

        let entry = handles.key_versions.lookup_before(key, 0, Timestamp::MAX)?;
        let payload = handles.content.read(entry.reference)?;
        let record = decode_record(&payload)?;

        tracing::trace!(key, timestamp = entry.timestamp, reference = %entry.reference, "Read record");
        Ok(record)
    }

    /// Store `record` and publish it as the newest version of `key`
    ///
    /// The key version is only published after the payload is stored. If
    /// publishing fails the payload stays behind unreferenced.
    pub fn insert_record(&self, key: &str, record: &Record) -> Result<()> {
        let handles = self.handles()?;

        let payload = encode_record(record)?;
        let reference = handles.content.store(&payload)?;

        let timestamp = clock::now_nanos();
        if let Err(e) = handles
            .key_versions
            .set_value(key, timestamp, &self.store_uri, reference)
        {
            tracing::warn!(key, reference = %reference, "Key version not published, payload orphaned");
            return Err(e);
        }

        tracing::trace!(key, timestamp, reference = %reference, fields = record.len(), "Wrote record");
        Ok(())
    }

    /// Full rewrite of `key`; there is no partial update
    pub fn update_record(&self, key: &str, record: &Record) -> Result<()> {
        self.insert_record(key, record)
    }

    /// Delete by writing the empty record as the newest version
    pub fn delete_record(&self, key: &str) -> Result<()> {
        self.insert_record(key, &Record::new())
    }

    /// Range scans need ordered key iteration, which the store does not offer
    pub fn scan_records(&self, start_key: &str, record_count: usize) -> Result<Vec<Record>> {
        Err(XanaduError::Unsupported(format!(
            "scan of {} records from '{}': no ordered key iteration",
            record_count, start_key
        )))
    }
}

fn join_registries(config: &Config) -> String {
    config
        .registries
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Reduce a result to a harness status, logging the failure class
fn outcome<T>(op: &'static str, key: &str, result: Result<T>) -> Status {
    match result {
        Ok(_) => Status::Ok,
        Err(XanaduError::Unsupported(ref reason)) => {
            tracing::debug!(op, key, kind = "unsupported", reason = %reason, "Operation unsupported");
            Status::Error
        }
        Err(e) => {
            tracing::warn!(op, key, kind = e.kind(), error = %e, "Operation failed");
            Status::Error
        }
    }
}

// =============================================================================
// Harness Binding
// =============================================================================

impl Db for XanaduClient {
    fn init(&mut self) -> Status {
        match self.connect() {
            Ok(()) => Status::Ok,
            Err(e) => {
                tracing::error!(kind = e.kind(), error = %e, "Failed to create stores");
                Status::Error
            }
        }
    }

    fn cleanup(&mut self) -> Status {
        match self.close() {
            Ok(()) => Status::Ok,
            Err(e) => {
                tracing::error!(kind = e.kind(), error = %e, "Failed to close stores");
                Status::Error
            }
        }
    }

    fn read(
        &self,
        _table: &str,
        key: &str,
        fields: Option<&HashSet<String>>,
        result: &mut Record,
    ) -> Status {
        let record = self.read_record(key).map(|record| match fields {
            Some(names) => record.project(names),
            None => record,
        });

        match record {
            Ok(record) => {
                result.extend(record);
                Status::Ok
            }
            Err(e) => outcome::<()>("read", key, Err(e)),
        }
    }

    fn scan(
        &self,
        _table: &str,
        start_key: &str,
        record_count: usize,
        _fields: Option<&HashSet<String>>,
        _result: &mut Vec<Record>,
    ) -> Status {
        outcome("scan", start_key, self.scan_records(start_key, record_count))
    }

    fn update(&self, _table: &str, key: &str, values: &Record) -> Status {
        outcome("update", key, self.update_record(key, values))
    }

    fn insert(&self, _table: &str, key: &str, values: &Record) -> Status {
        outcome("insert", key, self.insert_record(key, values))
    }

    fn delete(&self, _table: &str, key: &str) -> Status {
        outcome("delete", key, self.delete_record(key))
    }
}
