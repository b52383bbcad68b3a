//! Variant values returned by scene delegates.
//!
//! [`Value`] is a closed set of the element types the render index knows how
//! to upload. Each non-empty value describes its per-element layout with a
//! [`TupleType`] and can be flattened to bytes for staging.

use crate::token::Token;

/// Scalar component type of a buffer element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    /// 32-bit signed integer.
    Int32,
    /// 32-bit float.
    Float32,
    /// 64-bit float.
    Float64,
}

impl ComponentType {
    /// Size in bytes of one component.
    pub fn size(&self) -> usize {
        match self {
            Self::Int32 | Self::Float32 => 4,
            Self::Float64 => 8,
        }
    }
}

/// Layout of one buffer element: a component type repeated `count` times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TupleType {
    /// Component type.
    pub component: ComponentType,
    /// Number of components per element.
    pub count: usize,
}

impl TupleType {
    /// Create a tuple type.
    pub const fn new(component: ComponentType, count: usize) -> Self {
        Self { component, count }
    }

    /// Size in bytes of one element.
    pub fn size(&self) -> usize {
        self.component.size() * self.count
    }
}

/// A value fetched from the scene.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// No value authored.
    #[default]
    Empty,
    Bool(bool),
    Int(i32),
    Float(f32),
    Double(f64),
    Token(Token),
    IntArray(Vec<i32>),
    FloatArray(Vec<f32>),
    Vec2fArray(Vec<[f32; 2]>),
    Vec3fArray(Vec<[f32; 3]>),
    Vec4fArray(Vec<[f32; 4]>),
    Matrix4d([f64; 16]),
}

impl Value {
    /// Whether no value is held.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Number of elements: array length, 1 for scalars, 0 when empty.
    pub fn len(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::IntArray(v) => v.len(),
            Self::FloatArray(v) => v.len(),
            Self::Vec2fArray(v) => v.len(),
            Self::Vec3fArray(v) => v.len(),
            Self::Vec4fArray(v) => v.len(),
            Self::Bool(_)
            | Self::Int(_)
            | Self::Float(_)
            | Self::Double(_)
            | Self::Token(_)
            | Self::Matrix4d(_) => 1,
        }
    }

    /// Per-element layout, or `None` for values with no buffer representation.
    pub fn tuple_type(&self) -> Option<TupleType> {
        use ComponentType::*;
        match self {
            Self::Empty | Self::Token(_) => None,
            Self::Bool(_) | Self::Int(_) | Self::IntArray(_) => Some(TupleType::new(Int32, 1)),
            Self::Float(_) | Self::FloatArray(_) => Some(TupleType::new(Float32, 1)),
            Self::Double(_) => Some(TupleType::new(Float64, 1)),
            Self::Vec2fArray(_) => Some(TupleType::new(Float32, 2)),
            Self::Vec3fArray(_) => Some(TupleType::new(Float32, 3)),
            Self::Vec4fArray(_) => Some(TupleType::new(Float32, 4)),
            Self::Matrix4d(_) => Some(TupleType::new(Float64, 16)),
        }
    }

    /// Flatten the value into bytes, or `None` if it has no buffer layout.
    pub fn to_bytes(&self) -> Option<Vec<u8>> {
        let bytes = match self {
            Self::Empty | Self::Token(_) => return None,
            Self::Bool(b) => bytemuck::bytes_of(&i32::from(*b)).to_vec(),
            Self::Int(v) => bytemuck::bytes_of(v).to_vec(),
            Self::Float(v) => bytemuck::bytes_of(v).to_vec(),
            Self::Double(v) => bytemuck::bytes_of(v).to_vec(),
            Self::IntArray(v) => bytemuck::cast_slice(v).to_vec(),
            Self::FloatArray(v) => bytemuck::cast_slice(v).to_vec(),
            Self::Vec2fArray(v) => bytemuck::cast_slice(v).to_vec(),
            Self::Vec3fArray(v) => bytemuck::cast_slice(v).to_vec(),
            Self::Vec4fArray(v) => bytemuck::cast_slice(v).to_vec(),
            Self::Matrix4d(m) => bytemuck::cast_slice(m).to_vec(),
        };
        Some(bytes)
    }

    /// Borrow a float array.
    pub fn as_float_array(&self) -> Option<&[f32]> {
        match self {
            Self::FloatArray(v) => Some(v),
            _ => None,
        }
    }

    /// Borrow a `vec3f` array.
    pub fn as_vec3f_array(&self) -> Option<&[[f32; 3]]> {
        match self {
            Self::Vec3fArray(v) => Some(v),
            _ => None,
        }
    }

    /// Name of the held variant, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Double(_) => "double",
            Self::Token(_) => "token",
            Self::IntArray(_) => "int[]",
            Self::FloatArray(_) => "float[]",
            Self::Vec2fArray(_) => "float2[]",
            Self::Vec3fArray(_) => "float3[]",
            Self::Vec4fArray(_) => "float4[]",
            Self::Matrix4d(_) => "matrix4d",
        }
    }
}

impl From<Vec<[f32; 3]>> for Value {
    fn from(v: Vec<[f32; 3]>) -> Self {
        Self::Vec3fArray(v)
    }
}

impl From<Vec<f32>> for Value {
    fn from(v: Vec<f32>) -> Self {
        Self::FloatArray(v)
    }
}

impl From<Vec<i32>> for Value {
    fn from(v: Vec<i32>) -> Self {
        Self::IntArray(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec3_array_layout() {
        let value = Value::from(vec![[0.0, 1.0, 2.0], [3.0, 4.0, 5.0]]);
        assert_eq!(value.len(), 2);
        let tuple = value.tuple_type().unwrap();
        assert_eq!(tuple, TupleType::new(ComponentType::Float32, 3));
        assert_eq!(tuple.size(), 12);
        assert_eq!(value.to_bytes().unwrap().len(), 24);
    }

    #[test]
    fn empty_and_token_have_no_bytes() {
        assert!(Value::Empty.is_empty());
        assert_eq!(Value::Empty.len(), 0);
        assert!(Value::Token(Token::new("x")).to_bytes().is_none());
    }

    #[test]
    fn matrix_is_one_element() {
        let m = Value::Matrix4d([0.0; 16]);
        assert_eq!(m.len(), 1);
        assert_eq!(m.tuple_type().unwrap().size(), 128);
    }
}
