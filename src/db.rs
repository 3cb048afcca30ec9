//! Benchmark harness contract
//!
//! The interface a workload generator drives. Every call reduces to a
//! binary [`Status`]; the reason for a failure goes to the log, not to the
//! caller.

use std::collections::HashSet;

use crate::codec::Record;

/// Outcome of a harness operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Error,
}

impl Status {
    pub fn is_ok(&self) -> bool {
        matches!(self, Status::Ok)
    }
}

/// A database binding the benchmark harness can drive
///
/// `table` names the logical table the harness thinks it is writing to;
/// bindings are free to ignore it. `fields = None` means all fields.
pub trait Db {
    /// Acquire connections; called once per binding instance
    fn init(&mut self) -> Status;

    /// Release connections; called once when the harness is done
    fn cleanup(&mut self) -> Status;

    /// Read one record into `result`
    fn read(
        &self,
        table: &str,
        key: &str,
        fields: Option<&HashSet<String>>,
        result: &mut Record,
    ) -> Status;

    /// Read `record_count` records starting at `start_key`
    fn scan(
        &self,
        table: &str,
        start_key: &str,
        record_count: usize,
        fields: Option<&HashSet<String>>,
        result: &mut Vec<Record>,
    ) -> Status;

    /// Overwrite the fields of an existing record
    fn update(&self, table: &str, key: &str, values: &Record) -> Status;

    /// Insert a new record
    fn insert(&self, table: &str, key: &str, values: &Record) -> Status;

    /// Delete a record
    fn delete(&self, table: &str, key: &str) -> Status;
}
