//! Binary Document Codec (§4.A): a TLV, magic-less, version-prefixed
//! serialization of `Document`.
//!
//! ## Field frame
//!
//! `1-byte field-id | 4-byte LE length | payload`. Unknown field-ids are
//! skipped by length, so future fields can be added without breaking old
//! readers.
//!
//! | id | field | payload |
//! |---|---|---|
//! | 1 | FormatVersion | 1 byte, current = 1 |
//! | 2 | Id | string |
//! | 3 | Rev | string |
//! | 4 | Deleted | 1 byte |
//! | 5 | Data | count + repeated (key, type-tag, value) |
//! | 6 | Tags | count + strings |
//! | 7 | Content | string |
//!
//! Strings are 4-byte LE length followed by UTF-8 bytes. `data` value type
//! tags: 0=null, 1=string, 2=int32, 3=float64, 4=bool, 5=list\<string\>,
//! 6=nested dict (4-byte length + recursive encoding of the same
//! count+entries shape).
//!
//! The codec is deterministic: re-encoding a decoded document yields the
//! same bytes, which is what lets the revision engine hash it for a stable
//! content-addressed check (crate `docstore-codec::revision`).

use docstore_core::types::{Document, Value};
use std::collections::BTreeMap;
use thiserror::Error;

pub const CURRENT_FORMAT_VERSION: u8 = 1;

const FIELD_FORMAT_VERSION: u8 = 1;
const FIELD_ID: u8 = 2;
const FIELD_REV: u8 = 3;
const FIELD_DELETED: u8 = 4;
const FIELD_DATA: u8 = 5;
const FIELD_TAGS: u8 = 6;
const FIELD_CONTENT: u8 = 7;

const TAG_NULL: u8 = 0;
const TAG_STRING: u8 = 1;
const TAG_INT32: u8 = 2;
const TAG_FLOAT64: u8 = 3;
const TAG_BOOL: u8 = 4;
const TAG_LIST_STRING: u8 = 5;
const TAG_MAP: u8 = 6;

#[derive(Debug, Error, PartialEq)]
pub enum CodecError {
    #[error("unsupported format version: {0}")]
    UnsupportedVersion(u8),
    #[error("unknown data type tag: {0}")]
    UnknownTypeTag(u8),
    #[error("truncated input at offset {0}")]
    Truncated(usize),
    #[error("invalid UTF-8 in string field")]
    InvalidUtf8,
}

/// Encode a full document, including its revision marker, to the canonical
/// TLV form. `decode(&encode(d)) == d` for any `d` (property 3).
pub fn encode(doc: &Document) -> Vec<u8> {
    encode_inner(doc, true)
}

/// Encode everything except the `Rev` field. This is "the encoded body"
/// the revision engine hashes: the revision cannot depend on itself.
pub fn encode_body(doc: &Document) -> Vec<u8> {
    encode_inner(doc, false)
}

fn encode_inner(doc: &Document, include_rev: bool) -> Vec<u8> {
    let mut out = Vec::new();
    write_field(&mut out, FIELD_FORMAT_VERSION, &[CURRENT_FORMAT_VERSION]);
    write_field(&mut out, FIELD_ID, &encode_string(&doc.id));
    if include_rev {
        write_field(&mut out, FIELD_REV, &encode_string(&doc.rev));
    }
    write_field(&mut out, FIELD_DELETED, &[doc.deleted as u8]);
    write_field(&mut out, FIELD_DATA, &encode_data(&doc.data));
    write_field(&mut out, FIELD_TAGS, &encode_string_list(&doc.tags));
    if let Some(content) = &doc.content {
        write_field(&mut out, FIELD_CONTENT, &encode_string(content));
    }
    out
}

/// Decode a document previously produced by [`encode`].
pub fn decode(bytes: &[u8]) -> Result<Document, CodecError> {
    let mut doc = Document::default();
    let mut pos = 0usize;
    let mut saw_version = false;

    while pos < bytes.len() {
        let field_id = read_u8(bytes, &mut pos)?;
        let len = read_u32(bytes, &mut pos)? as usize;
        let end = pos
            .checked_add(len)
            .filter(|&e| e <= bytes.len())
            .ok_or(CodecError::Truncated(pos))?;
        let payload = &bytes[pos..end];

        match field_id {
            FIELD_FORMAT_VERSION => {
                let version = *payload.first().ok_or(CodecError::Truncated(pos))?;
                if version != CURRENT_FORMAT_VERSION {
                    return Err(CodecError::UnsupportedVersion(version));
                }
                saw_version = true;
            }
            FIELD_ID => doc.id = decode_string(payload)?,
            FIELD_REV => doc.rev = decode_string(payload)?,
            FIELD_DELETED => doc.deleted = payload.first().copied().unwrap_or(0) != 0,
            FIELD_DATA => doc.data = decode_data(payload)?,
            FIELD_TAGS => doc.tags = decode_string_list(payload)?,
            FIELD_CONTENT => doc.content = Some(decode_string(payload)?),
            _ => { /* unknown field-id: skip by length, already advanced below */ }
        }

        pos = end;
    }

    let _ = saw_version; // version is optional on the wire; absence defaults to current.
    Ok(doc)
}

fn write_field(out: &mut Vec<u8>, field_id: u8, payload: &[u8]) {
    out.push(field_id);
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
}

fn encode_string(s: &str) -> Vec<u8> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(4 + bytes.len());
    out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(bytes);
    out
}

fn decode_string(buf: &[u8]) -> Result<String, CodecError> {
    let mut pos = 0usize;
    let len = read_u32(buf, &mut pos)? as usize;
    let end = pos
        .checked_add(len)
        .filter(|&e| e <= buf.len())
        .ok_or(CodecError::Truncated(pos))?;
    String::from_utf8(buf[pos..end].to_vec()).map_err(|_| CodecError::InvalidUtf8)
}

fn encode_string_list(items: &[String]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&(items.len() as u32).to_le_bytes());
    for item in items {
        out.extend_from_slice(&encode_string(item));
    }
    out
}

fn decode_string_list(buf: &[u8]) -> Result<Vec<String>, CodecError> {
    let mut pos = 0usize;
    let count = read_u32(buf, &mut pos)? as usize;
    let mut items = Vec::with_capacity(count);
    for _ in 0..count {
        let len = read_u32(buf, &mut pos)? as usize;
        let end = pos
            .checked_add(len)
            .filter(|&e| e <= buf.len())
            .ok_or(CodecError::Truncated(pos))?;
        items.push(String::from_utf8(buf[pos..end].to_vec()).map_err(|_| CodecError::InvalidUtf8)?);
        pos = end;
    }
    Ok(items)
}

fn encode_data(data: &BTreeMap<String, Value>) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    for (key, value) in data {
        out.extend_from_slice(&encode_string(key));
        encode_value(value, &mut out);
    }
    out
}

fn decode_data(buf: &[u8]) -> Result<BTreeMap<String, Value>, CodecError> {
    let mut pos = 0usize;
    let count = read_u32(buf, &mut pos)? as usize;
    let mut map = BTreeMap::new();
    for _ in 0..count {
        let key = read_prefixed_string(buf, &mut pos)?;
        let value = decode_value(buf, &mut pos)?;
        map.insert(key, value);
    }
    Ok(map)
}

fn encode_value(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Null => out.push(TAG_NULL),
        Value::Str(s) => {
            out.push(TAG_STRING);
            out.extend_from_slice(&encode_string(s));
        }
        Value::Int32(n) => {
            out.push(TAG_INT32);
            out.extend_from_slice(&n.to_le_bytes());
        }
        Value::Float64(f) => {
            out.push(TAG_FLOAT64);
            out.extend_from_slice(&f.to_le_bytes());
        }
        Value::Bool(b) => {
            out.push(TAG_BOOL);
            out.push(*b as u8);
        }
        Value::ListStr(items) => {
            out.push(TAG_LIST_STRING);
            out.extend_from_slice(&encode_string_list(items));
        }
        Value::Map(inner) => {
            out.push(TAG_MAP);
            let encoded = encode_data(inner);
            out.extend_from_slice(&(encoded.len() as u32).to_le_bytes());
            out.extend_from_slice(&encoded);
        }
    }
}

fn decode_value(buf: &[u8], pos: &mut usize) -> Result<Value, CodecError> {
    let tag = read_u8(buf, pos)?;
    match tag {
        TAG_NULL => Ok(Value::Null),
        TAG_STRING => Ok(Value::Str(read_prefixed_string(buf, pos)?)),
        TAG_INT32 => {
            let bytes = read_exact(buf, pos, 4)?;
            Ok(Value::Int32(i32::from_le_bytes(bytes.try_into().unwrap())))
        }
        TAG_FLOAT64 => {
            let bytes = read_exact(buf, pos, 8)?;
            Ok(Value::Float64(f64::from_le_bytes(bytes.try_into().unwrap())))
        }
        TAG_BOOL => {
            let b = read_u8(buf, pos)?;
            Ok(Value::Bool(b != 0))
        }
        TAG_LIST_STRING => {
            let count = read_u32(buf, pos)? as usize;
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                items.push(read_prefixed_string(buf, pos)?);
            }
            Ok(Value::ListStr(items))
        }
        TAG_MAP => {
            let len = read_u32(buf, pos)? as usize;
            let end = pos
                .checked_add(len)
                .filter(|&e| e <= buf.len())
                .ok_or(CodecError::Truncated(*pos))?;
            let inner = decode_data(&buf[*pos..end])?;
            *pos = end;
            Ok(Value::Map(inner))
        }
        other => Err(CodecError::UnknownTypeTag(other)),
    }
}

fn read_u8(buf: &[u8], pos: &mut usize) -> Result<u8, CodecError> {
    let b = *buf.get(*pos).ok_or(CodecError::Truncated(*pos))?;
    *pos += 1;
    Ok(b)
}

fn read_u32(buf: &[u8], pos: &mut usize) -> Result<u32, CodecError> {
    let bytes = read_exact(buf, pos, 4)?;
    Ok(u32::from_le_bytes(bytes.try_into().unwrap()))
}

fn read_exact<'a>(buf: &'a [u8], pos: &mut usize, n: usize) -> Result<&'a [u8], CodecError> {
    let end = pos
        .checked_add(n)
        .filter(|&e| e <= buf.len())
        .ok_or(CodecError::Truncated(*pos))?;
    let slice = &buf[*pos..end];
    *pos = end;
    Ok(slice)
}

fn read_prefixed_string(buf: &[u8], pos: &mut usize) -> Result<String, CodecError> {
    let len = read_u32(buf, pos)? as usize;
    let slice = read_exact(buf, pos, len)?;
    String::from_utf8(slice.to_vec()).map_err(|_| CodecError::InvalidUtf8)
}
