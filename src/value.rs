//! Core value types that flow between sockets

use crate::error::DecodeError;
use std::fmt;

/// Element type of a binary tensor/array payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    F32,
    F64,
    I32,
    I64,
    U8,
    Bool,
}

impl ElementType {
    /// Byte width of a single element.
    pub fn size_of(&self) -> usize {
        match self {
            ElementType::F32 | ElementType::I32 => 4,
            ElementType::F64 | ElementType::I64 => 8,
            ElementType::U8 | ElementType::Bool => 1,
        }
    }

    /// Canonical wire name for this element type.
    pub fn name(&self) -> &'static str {
        match self {
            ElementType::F32 => "float32",
            ElementType::F64 => "float64",
            ElementType::I32 => "int32",
            ElementType::I64 => "int64",
            ElementType::U8 => "uint8",
            ElementType::Bool => "bool",
        }
    }

    /// Parses a wire dtype string. Tolerates the `torch.`-prefixed
    /// spelling some producers emit for tensor payloads.
    pub fn parse(name: &str) -> Result<Self, DecodeError> {
        let canonical = name.strip_prefix("torch.").unwrap_or(name);
        match canonical {
            "float32" => Ok(ElementType::F32),
            "float64" => Ok(ElementType::F64),
            "int32" => Ok(ElementType::I32),
            "int64" => Ok(ElementType::I64),
            "uint8" => Ok(ElementType::U8),
            "bool" => Ok(ElementType::Bool),
            _ => Err(DecodeError::UnknownDtype(name.to_string())),
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Raw tensor payload: bytes plus the shape/dtype metadata required to
/// reinterpret them, and an informational device tag.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorData {
    pub shape: Vec<usize>,
    pub dtype: ElementType,
    pub bytes: Vec<u8>,
    /// Where the producer held the tensor (e.g. "cpu"). Informational
    /// only; decoding never consults it.
    pub device: String,
}

impl TensorData {
    pub fn new(
        shape: Vec<usize>,
        dtype: ElementType,
        bytes: Vec<u8>,
        device: impl Into<String>,
    ) -> Result<Self, DecodeError> {
        check_payload(&shape, dtype, bytes.len())?;
        Ok(Self {
            shape,
            dtype,
            bytes,
            device: device.into(),
        })
    }
}

/// Raw array payload: like [`TensorData`] but with no device tag.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayData {
    pub shape: Vec<usize>,
    pub dtype: ElementType,
    pub bytes: Vec<u8>,
}

impl ArrayData {
    pub fn new(shape: Vec<usize>, dtype: ElementType, bytes: Vec<u8>) -> Result<Self, DecodeError> {
        check_payload(&shape, dtype, bytes.len())?;
        Ok(Self {
            shape,
            dtype,
            bytes,
        })
    }
}

fn check_payload(shape: &[usize], dtype: ElementType, actual: usize) -> Result<(), DecodeError> {
    let expected = shape.iter().product::<usize>() * dtype.size_of();
    if expected != actual {
        return Err(DecodeError::PayloadMismatch {
            dtype: dtype.name().to_string(),
            shape: shape.to_vec(),
            expected,
            actual,
        });
    }
    Ok(())
}

/// A socket value. Closed sum over every kind the wire format can carry,
/// with [`Value::Opaque`] as the explicitly lossy fallback.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Str(String),
    /// Numeric scalar. Promoted to a 1-element tuple on encode so all
    /// numeric parameters share one wire shape.
    Number(f64),
    Tuple(Vec<Value>),
    Tensor(TensorData),
    Array(ArrayData),
    /// String rendering of a value no other variant can carry.
    /// Round-trips best-effort and may be lossy.
    Opaque(String),
}

impl Value {
    /// Short kind name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Str(_) => "string",
            Value::Number(_) => "number",
            Value::Tuple(_) => "tuple",
            Value::Tensor(_) => "tensor",
            Value::Array(_) => "array",
            Value::Opaque(_) => "opaque",
        }
    }

    /// Extracts a scalar from either a bare number or a 1-element tuple,
    /// the two shapes a numeric parameter can take after a round-trip.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Tuple(items) => match items.as_slice() {
                [Value::Number(n)] => Some(*n),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "none"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Tuple(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
            Value::Tensor(t) => write!(f, "tensor<{}>{:?}@{}", t.dtype, t.shape, t.device),
            Value::Array(a) => write!(f, "array<{}>{:?}", a.dtype, a.shape),
            Value::Opaque(s) => write!(f, "opaque({s})"),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}
