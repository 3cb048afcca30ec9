//! # Xanadu YCSB Binding
//!
//! A benchmark client that drives the Xanadu distributed key-value/object
//! store through a uniform CRUD interface:
//! - Records encoded in a self-describing length-prefixed format
//! - Writes versioned by a strictly increasing nanosecond clock
//! - Two-store call sequence: payload first, key version second
//! - Plain (one blob) or block-chunked content backends behind one trait
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Benchmark Harness                         │
//! │               (Db trait: ok / error only)                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                     XanaduClient                             │
//! │         (lifecycle, call sequencing, error logging)          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┼─────────────────────┐
//!          │            │                     │
//!          ▼            ▼                     ▼
//!   ┌────────────┐ ┌─────────────────┐ ┌───────────────┐
//!   │   Codec    │ │ KeyVersionStore │ │ ContentStore  │
//!   │ (Record ↔  │ │ (key → version) │ │ (ref → bytes) │
//!   │   bytes)   │ └─────────────────┘ └───────────────┘
//!   └────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod codec;
pub mod clock;
pub mod store;
pub mod db;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{XanaduError, Result};
pub use config::{Config, Properties};
pub use codec::Record;
pub use db::{Db, Status};
pub use client::XanaduClient;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of the binding
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
