//! Tagged wire representation of socket values
//!
//! Every direct socket value serializes to a single `{ "type": ..., "data": ... }`
//! record. Binary payloads are gzip-compressed and base64-armored so the
//! whole record stays JSON/text-safe while bounding size.

use crate::error::DecodeError;
use crate::value::{ArrayData, ElementType, TensorData, Value};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// Element of a `tuple` record: a JSON scalar or a nested list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TupleItem {
    Bool(bool),
    Number(f64),
    Str(String),
    List(Vec<TupleItem>),
}

/// Type-tagged wire record for a single value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EncodedValue {
    #[serde(rename = "none")]
    None {
        #[serde(default)]
        data: Option<()>,
    },
    #[serde(rename = "bool")]
    Bool { data: bool },
    #[serde(rename = "string")]
    String { data: String },
    #[serde(rename = "tuple")]
    Tuple { data: Vec<TupleItem> },
    #[serde(rename = "binary_tensor")]
    BinaryTensor {
        data: String,
        shape: Vec<usize>,
        dtype: String,
        device: String,
    },
    #[serde(rename = "binary_array")]
    BinaryArray {
        data: String,
        shape: Vec<usize>,
        dtype: String,
    },
    #[serde(rename = "other")]
    Other { data: String },
}

/// Encodes a value into its tagged wire record.
///
/// Numeric scalars are promoted to 1-element tuples. Tuple elements with
/// no scalar wire shape (tensors, nested opaques) degrade to their string
/// rendering, the same documented-lossy path as the `other` tag.
pub fn encode(value: &Value) -> EncodedValue {
    match value {
        Value::None => EncodedValue::None { data: None },
        Value::Bool(b) => EncodedValue::Bool { data: *b },
        Value::Str(s) => EncodedValue::String { data: s.clone() },
        Value::Number(n) => EncodedValue::Tuple {
            data: vec![TupleItem::Number(*n)],
        },
        Value::Tuple(items) => EncodedValue::Tuple {
            data: items.iter().map(tuple_item).collect(),
        },
        Value::Tensor(t) => EncodedValue::BinaryTensor {
            data: armor(&t.bytes),
            shape: t.shape.clone(),
            dtype: t.dtype.name().to_string(),
            device: t.device.clone(),
        },
        Value::Array(a) => EncodedValue::BinaryArray {
            data: armor(&a.bytes),
            shape: a.shape.clone(),
            dtype: a.dtype.name().to_string(),
        },
        Value::Opaque(s) => EncodedValue::Other { data: s.clone() },
    }
}

/// Decodes a tagged wire record back into a value.
///
/// Bit-exact for binary payloads. `other` records get a best-effort
/// reparse and fall back to [`Value::Opaque`].
pub fn decode(record: &EncodedValue) -> Result<Value, DecodeError> {
    match record {
        EncodedValue::None { .. } => Ok(Value::None),
        EncodedValue::Bool { data } => Ok(Value::Bool(*data)),
        EncodedValue::String { data } => Ok(Value::Str(data.clone())),
        EncodedValue::Tuple { data } => {
            Ok(Value::Tuple(data.iter().map(item_value).collect()))
        }
        EncodedValue::BinaryTensor {
            data,
            shape,
            dtype,
            device,
        } => {
            let bytes = unarmor(data)?;
            let dtype = ElementType::parse(dtype)?;
            Ok(Value::Tensor(TensorData::new(
                shape.clone(),
                dtype,
                bytes,
                device.clone(),
            )?))
        }
        EncodedValue::BinaryArray { data, shape, dtype } => {
            let bytes = unarmor(data)?;
            let dtype = ElementType::parse(dtype)?;
            Ok(Value::Array(ArrayData::new(shape.clone(), dtype, bytes)?))
        }
        EncodedValue::Other { data } => Ok(reparse_opaque(data)),
    }
}

/// Decodes a raw JSON record.
///
/// Tries the tagged form first; if that fails and the record is a bare
/// JSON array, coerces it to a tuple (compatibility fallback for old
/// producers) before giving up with a [`DecodeError::Malformed`].
pub fn decode_record(raw: &serde_json::Value) -> Result<Value, DecodeError> {
    match serde_json::from_value::<EncodedValue>(raw.clone()) {
        Ok(record) => decode(&record),
        Err(err) => {
            if let serde_json::Value::Array(items) = raw {
                if let Ok(items) = serde_json::from_value::<Vec<TupleItem>>(
                    serde_json::Value::Array(items.clone()),
                ) {
                    log::debug!("coerced bare list record to tuple");
                    return Ok(Value::Tuple(items.iter().map(item_value).collect()));
                }
            }
            Err(DecodeError::Malformed(err.to_string()))
        }
    }
}

fn tuple_item(value: &Value) -> TupleItem {
    match value {
        Value::Bool(b) => TupleItem::Bool(*b),
        Value::Number(n) => TupleItem::Number(*n),
        Value::Str(s) => TupleItem::Str(s.clone()),
        Value::Tuple(items) => TupleItem::List(items.iter().map(tuple_item).collect()),
        other => TupleItem::Str(other.to_string()),
    }
}

fn item_value(item: &TupleItem) -> Value {
    match item {
        TupleItem::Bool(b) => Value::Bool(*b),
        TupleItem::Number(n) => Value::Number(*n),
        TupleItem::Str(s) => Value::Str(s.clone()),
        TupleItem::List(items) => Value::Tuple(items.iter().map(item_value).collect()),
    }
}

fn reparse_opaque(data: &str) -> Value {
    match serde_json::from_str::<TupleItem>(data) {
        Ok(item) => item_value(&item),
        Err(_) => Value::Opaque(data.to_string()),
    }
}

fn armor(bytes: &[u8]) -> String {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    // writing into a Vec-backed stream cannot fail
    encoder.write_all(bytes).expect("gzip into Vec");
    let compressed = encoder.finish().expect("gzip into Vec");
    STANDARD.encode(compressed)
}

fn unarmor(data: &str) -> Result<Vec<u8>, DecodeError> {
    let compressed = STANDARD.decode(data)?;
    let mut bytes = Vec::new();
    GzDecoder::new(compressed.as_slice()).read_to_end(&mut bytes)?;
    Ok(bytes)
}
