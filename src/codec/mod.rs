//! Record Codec Module
//!
//! Turns a benchmark row (field name → value) into an opaque payload for
//! the content store, and back.
//!
//! ## Payload Format (big-endian)
//! ```text
//! ┌───────────┬──────────────────────────────────────────────────────┐
//! │ Count (4) │ Field 1 │ Field 2 │ ...                 │ Field N    │
//! └───────────┴──────────────────────────────────────────────────────┘
//!
//! Field:
//! ┌─────────────┬─────────────┬──────────────┬───────────────┐
//! │ NameLen (4) │ Name (UTF-8)│ ValueLen (4) │ Value bytes   │
//! └─────────────┴─────────────┴──────────────┴───────────────┘
//! ```
//!
//! Fields are written in ascending name order. An empty payload decodes to
//! the empty record, which is how deletes are represented.

mod record;
mod wire;

pub use record::Record;
pub use wire::{decode_record, encode_record, encoded_len, MAX_FIELD_COUNT, MAX_FIELD_SIZE};
