//! Structured-envelope codec (§6.3): the same logical document fields as
//! the core TLV codec, but `data` travels as a generic JSON value rather
//! than the TLV's fixed type-tag set. Useful at integration boundaries that
//! already speak JSON and don't want the binary framing.

use docstore_core::types::{Document, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("invalid envelope JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("data value shape is not representable as a DocStore Value")]
    UnsupportedValueShape,
}

#[derive(Serialize, Deserialize)]
struct EnvelopeDoc {
    id: String,
    #[serde(default)]
    rev: String,
    #[serde(default)]
    deleted: bool,
    #[serde(default = "serde_json::Value::default")]
    data: serde_json::Value,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    content: Option<String>,
}

/// Serializes a document to the envelope's JSON representation.
pub fn encode(doc: &Document) -> Vec<u8> {
    let data = serde_json::Value::Object(
        doc.data.iter().map(|(k, v)| (k.clone(), value_to_json(v))).collect(),
    );
    let envelope = EnvelopeDoc {
        id: doc.id.clone(),
        rev: doc.rev.clone(),
        deleted: doc.deleted,
        data,
        tags: doc.tags.clone(),
        content: doc.content.clone(),
    };
    serde_json::to_vec(&envelope).expect("EnvelopeDoc has no non-serializable fields")
}

/// Parses the envelope's JSON representation back into a document.
pub fn decode(bytes: &[u8]) -> Result<Document, EnvelopeError> {
    let envelope: EnvelopeDoc = serde_json::from_slice(bytes)?;
    let data = match envelope.data {
        serde_json::Value::Object(obj) => obj
            .into_iter()
            .map(|(k, v)| Ok((k, json_to_value(v)?)))
            .collect::<Result<BTreeMap<String, Value>, EnvelopeError>>()?,
        serde_json::Value::Null => BTreeMap::new(),
        _ => return Err(EnvelopeError::UnsupportedValueShape),
    };
    Ok(Document {
        id: envelope.id,
        rev: envelope.rev,
        deleted: envelope.deleted,
        data,
        tags: envelope.tags,
        content: envelope.content,
    })
}

fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Int32(n) => serde_json::Value::from(*n),
        Value::Float64(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Str(s) => serde_json::Value::String(s.clone()),
        Value::ListStr(items) => {
            serde_json::Value::Array(items.iter().cloned().map(serde_json::Value::String).collect())
        }
        Value::Map(map) => {
            serde_json::Value::Object(map.iter().map(|(k, v)| (k.clone(), value_to_json(v))).collect())
        }
    }
}

fn json_to_value(json: serde_json::Value) -> Result<Value, EnvelopeError> {
    match json {
        serde_json::Value::Null => Ok(Value::Null),
        serde_json::Value::Bool(b) => Ok(Value::Bool(b)),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                if let Ok(i32_val) = i32::try_from(i) {
                    return Ok(Value::Int32(i32_val));
                }
            }
            n.as_f64().map(Value::Float64).ok_or(EnvelopeError::UnsupportedValueShape)
        }
        serde_json::Value::String(s) => Ok(Value::Str(s)),
        serde_json::Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                serde_json::Value::String(s) => Ok(s),
                _ => Err(EnvelopeError::UnsupportedValueShape),
            })
            .collect::<Result<Vec<String>, EnvelopeError>>()
            .map(Value::ListStr),
        serde_json::Value::Object(obj) => obj
            .into_iter()
            .map(|(k, v)| Ok((k, json_to_value(v)?)))
            .collect::<Result<BTreeMap<String, Value>, EnvelopeError>>()
            .map(Value::Map),
    }
}
