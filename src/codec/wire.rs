//! Record wire encoding
//!
//! Length-prefixed map format; see the module docs for the layout.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Result, XanaduError};

use super::Record;

/// Size of every length/count prefix
const LEN_SIZE: usize = 4;

/// Largest field name or value a length prefix can describe
pub const MAX_FIELD_SIZE: usize = u32::MAX as usize;

/// Largest field count the count prefix can describe
pub const MAX_FIELD_COUNT: usize = u32::MAX as usize;

/// Exact number of bytes `encode_record` will produce
pub fn encoded_len(record: &Record) -> usize {
    LEN_SIZE
        + record
            .iter()
            .map(|(name, value)| 2 * LEN_SIZE + name.len() + value.len())
            .sum::<usize>()
}

/// Encode a record to bytes
///
/// Format: count (4) + repeated [name_len (4) + name + value_len (4) + value]
pub fn encode_record(record: &Record) -> Result<Bytes> {
    if record.len() > MAX_FIELD_COUNT {
        return Err(XanaduError::Codec(format!(
            "Too many fields: {} (max {})",
            record.len(),
            MAX_FIELD_COUNT
        )));
    }

    let mut buf = BytesMut::with_capacity(encoded_len(record));
    buf.put_u32(record.len() as u32);

    for (name, value) in record {
        if name.len() > MAX_FIELD_SIZE || value.len() > MAX_FIELD_SIZE {
            return Err(XanaduError::Codec(format!(
                "Field '{}' too large: name {} bytes, value {} bytes (max {})",
                name,
                name.len(),
                value.len(),
                MAX_FIELD_SIZE
            )));
        }
        buf.put_u32(name.len() as u32);
        buf.put_slice(name.as_bytes());
        buf.put_u32(value.len() as u32);
        buf.put_slice(value);
    }

    Ok(buf.freeze())
}

/// Decode a record from bytes
///
/// An empty payload is the empty record. Anything that does not parse
/// exactly (short reads, bad UTF-8, duplicate names, trailing bytes) is a
/// `Codec` error.
pub fn decode_record(bytes: &[u8]) -> Result<Record> {
    if bytes.is_empty() {
        return Ok(Record::new());
    }

    let mut buf = bytes;
    let count = read_len(&mut buf, "field count")?;

    // Every field carries at least two length prefixes
    if count > buf.remaining() / (2 * LEN_SIZE) {
        return Err(XanaduError::Codec(format!(
            "Field count {} does not fit in {} remaining bytes",
            count,
            buf.remaining()
        )));
    }

    let mut record = Record::new();
    for index in 0..count {
        let name = read_chunk(&mut buf, "field name", index)?;
        let name = std::str::from_utf8(name)
            .map_err(|e| XanaduError::Codec(format!("Field {}: name is not UTF-8: {}", index, e)))?
            .to_string();

        let value = read_chunk(&mut buf, "field value", index)?.to_vec();

        if record.contains(&name) {
            return Err(XanaduError::Codec(format!("Duplicate field name '{}'", name)));
        }
        record.insert(name, value);
    }

    if buf.has_remaining() {
        return Err(XanaduError::Codec(format!(
            "{} trailing bytes after last field",
            buf.remaining()
        )));
    }

    Ok(record)
}

/// Read a 4-byte big-endian length
fn read_len(buf: &mut &[u8], what: &str) -> Result<usize> {
    if buf.remaining() < LEN_SIZE {
        return Err(XanaduError::Codec(format!(
            "Incomplete {}: expected {} bytes, got {}",
            what,
            LEN_SIZE,
            buf.remaining()
        )));
    }
    Ok(buf.get_u32() as usize)
}

/// Read a length-prefixed chunk, borrowing from the input
fn read_chunk<'a>(buf: &mut &'a [u8], what: &str, index: usize) -> Result<&'a [u8]> {
    let len = read_len(buf, what)?;

    if buf.len() < len {
        return Err(XanaduError::Codec(format!(
            "Field {}: incomplete {} (expected {}, got {})",
            index,
            what,
            len,
            buf.len()
        )));
    }

    let input: &'a [u8] = *buf;
    let (chunk, rest) = input.split_at(len);
    *buf = rest;
    Ok(chunk)
}
