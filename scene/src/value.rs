//! Plug values.

use std::fmt;
use std::sync::Arc;

use crate::types::DataType;

/// Native string storage for string attributes.
///
/// Cheap to clone; the text is shared.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct StringData(Arc<str>);

impl StringData {
    pub fn new(text: &str) -> Self {
        Self(Arc::from(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for StringData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StringData({:?})", &*self.0)
    }
}

impl fmt::Display for StringData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Value held by a plug.
#[derive(Debug, Clone, PartialEq)]
pub enum PlugValue {
    Bool(bool),
    Int(i32),
    Float(f64),
    Double2([f64; 2]),
    Double3([f64; 3]),
    Double4([f64; 4]),
    Int2([i32; 2]),
    Int3([i32; 3]),
    String(StringData),
    Matrix([f64; 16]),
    /// Values of a compound's children, in child order.
    Compound(Vec<PlugValue>),
}

impl PlugValue {
    pub const IDENTITY: PlugValue = PlugValue::Matrix([
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ]);

    /// Short name of the value's shape, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Double2(_) => "double2",
            Self::Double3(_) => "double3",
            Self::Double4(_) => "double4",
            Self::Int2(_) => "int2",
            Self::Int3(_) => "int3",
            Self::String(_) => "string",
            Self::Matrix(_) => "matrix",
            Self::Compound(_) => "compound",
        }
    }

    /// Whether this value has the shape a plug of `data_type` stores.
    pub fn fits(&self, data_type: DataType) -> bool {
        match (self, data_type) {
            (Self::Bool(_), DataType::Bool) => true,
            (Self::Int(_), DataType::Int | DataType::Enum) => true,
            (
                Self::Float(_),
                DataType::Float | DataType::Distance | DataType::Angle | DataType::Time,
            ) => true,
            (Self::Double2(_), DataType::Float2) => true,
            (Self::Double3(_), DataType::Float3 | DataType::Point | DataType::Color) => true,
            (Self::Double4(_), DataType::Float4) => true,
            (Self::Int2(_), DataType::Int2) => true,
            (Self::Int3(_), DataType::Int3) => true,
            (Self::String(_), DataType::String) => true,
            (Self::Matrix(_), DataType::Matrix) => true,
            _ => false,
        }
    }

    /// Zero value for scalar types; `None` for types that need an explicit value.
    pub fn zero_for(data_type: DataType) -> Option<Self> {
        match data_type {
            DataType::Bool => Some(Self::Bool(false)),
            DataType::Int | DataType::Enum => Some(Self::Int(0)),
            DataType::Float | DataType::Distance | DataType::Angle | DataType::Time => {
                Some(Self::Float(0.0))
            }
            DataType::String => Some(Self::String(StringData::new(""))),
            DataType::Matrix => Some(Self::IDENTITY),
            _ => None,
        }
    }

    /// Numeric components as `f64`, for bounds checks.
    pub fn components(&self) -> Option<Vec<f64>> {
        match self {
            Self::Bool(v) => Some(vec![f64::from(u8::from(*v))]),
            Self::Int(v) => Some(vec![f64::from(*v)]),
            Self::Float(v) => Some(vec![*v]),
            Self::Double2(v) => Some(v.to_vec()),
            Self::Double3(v) => Some(v.to_vec()),
            Self::Double4(v) => Some(v.to_vec()),
            Self::Int2(v) => Some(v.iter().map(|c| f64::from(*c)).collect()),
            Self::Int3(v) => Some(v.iter().map(|c| f64::from(*c)).collect()),
            _ => None,
        }
    }

    /// Splits a vector value into per-child scalars.
    pub fn split(&self) -> Option<Vec<PlugValue>> {
        match self {
            Self::Double2(v) => Some(v.iter().map(|c| Self::Float(*c)).collect()),
            Self::Double3(v) => Some(v.iter().map(|c| Self::Float(*c)).collect()),
            Self::Double4(v) => Some(v.iter().map(|c| Self::Float(*c)).collect()),
            Self::Int2(v) => Some(v.iter().map(|c| Self::Int(*c)).collect()),
            Self::Int3(v) => Some(v.iter().map(|c| Self::Int(*c)).collect()),
            Self::Compound(children) => Some(children.clone()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v.as_str()),
            _ => None,
        }
    }
}

impl From<bool> for PlugValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for PlugValue {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for PlugValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<[f64; 2]> for PlugValue {
    fn from(value: [f64; 2]) -> Self {
        Self::Double2(value)
    }
}

impl From<[f64; 3]> for PlugValue {
    fn from(value: [f64; 3]) -> Self {
        Self::Double3(value)
    }
}

impl From<[f64; 4]> for PlugValue {
    fn from(value: [f64; 4]) -> Self {
        Self::Double4(value)
    }
}

impl From<[i32; 2]> for PlugValue {
    fn from(value: [i32; 2]) -> Self {
        Self::Int2(value)
    }
}

impl From<[i32; 3]> for PlugValue {
    fn from(value: [i32; 3]) -> Self {
        Self::Int3(value)
    }
}

impl From<StringData> for PlugValue {
    fn from(value: StringData) -> Self {
        Self::String(value)
    }
}

impl From<&str> for PlugValue {
    fn from(value: &str) -> Self {
        Self::String(StringData::new(value))
    }
}
