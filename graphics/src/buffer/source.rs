//! Deferred producers of buffer data.

use std::fmt;
use std::sync::Arc;

use hydrant_core::{Token, TupleType, Value};

use super::spec::BufferSpec;
use crate::error::{GraphicsError, Result};

/// A named computation that produces the bytes of one buffer.
///
/// Sources are enqueued against a [`BufferArrayRange`](super::BufferArrayRange)
/// during sync and resolved later by
/// [`ResourceRegistry::commit`](crate::resource_registry::ResourceRegistry::commit).
pub trait BufferSource: Send + Sync + fmt::Debug {
    /// Name of the buffer this source writes.
    fn name(&self) -> &Token;

    /// Layout of one element.
    fn tuple_type(&self) -> TupleType;

    /// Number of elements the source produces.
    fn num_elements(&self) -> usize;

    /// Add the specs of the buffers this source writes.
    fn add_buffer_specs(&self, specs: &mut Vec<BufferSpec>) {
        BufferSpec::push_unique(specs, BufferSpec::new(self.name().clone(), self.tuple_type()));
    }

    /// Produce the buffer bytes.
    fn resolve(&self) -> Result<Vec<u8>>;
}

/// Shared handle to a buffer source.
pub type BufferSourceHandle = Arc<dyn BufferSource>;

/// Buffer source wrapping a value fetched from the scene delegate.
#[derive(Debug, Clone)]
pub struct ValueBufferSource {
    name: Token,
    value: Value,
    tuple_type: TupleType,
    num_elements: usize,
}

impl ValueBufferSource {
    /// One element per array entry.
    pub fn new(name: Token, value: Value) -> Result<Self> {
        let tuple_type = Self::layout(&name, &value)?;
        let num_elements = value.len();
        Ok(Self {
            name,
            value,
            tuple_type,
            num_elements,
        })
    }

    /// A single element holding the whole value, for constant ranges.
    pub fn constant(name: Token, value: Value) -> Result<Self> {
        let element = Self::layout(&name, &value)?;
        let tuple_type = TupleType::new(element.component, element.count * value.len().max(1));
        Ok(Self {
            name,
            value,
            tuple_type,
            num_elements: 1,
        })
    }

    fn layout(name: &Token, value: &Value) -> Result<TupleType> {
        value
            .tuple_type()
            .ok_or_else(|| GraphicsError::UnsupportedValue {
                name: name.clone(),
                type_name: value.type_name(),
            })
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Convert into a shared handle.
    pub fn into_handle(self) -> BufferSourceHandle {
        Arc::new(self)
    }
}

impl BufferSource for ValueBufferSource {
    fn name(&self) -> &Token {
        &self.name
    }

    fn tuple_type(&self) -> TupleType {
        self.tuple_type
    }

    fn num_elements(&self) -> usize {
        self.num_elements
    }

    fn resolve(&self) -> Result<Vec<u8>> {
        self.value
            .to_bytes()
            .ok_or_else(|| GraphicsError::UnsupportedValue {
                name: self.name.clone(),
                type_name: self.value.type_name(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hydrant_core::{ComponentType, tokens};

    #[test]
    fn value_source_layout() {
        let source =
            ValueBufferSource::new(tokens::POINTS, Value::from(vec![[0.0f32; 3]; 4])).unwrap();
        assert_eq!(source.num_elements(), 4);
        assert_eq!(source.tuple_type(), TupleType::new(ComponentType::Float32, 3));
        assert_eq!(source.resolve().unwrap().len(), 48);

        let mut specs = Vec::new();
        source.add_buffer_specs(&mut specs);
        assert_eq!(specs, vec![BufferSpec::new(tokens::POINTS, source.tuple_type())]);
    }

    #[test]
    fn constant_source_is_one_element() {
        let source =
            ValueBufferSource::constant(Token::new("color"), Value::from(vec![1.0f32, 0.5, 0.25]))
                .unwrap();
        assert_eq!(source.num_elements(), 1);
        assert_eq!(source.tuple_type().count, 3);
    }

    #[test]
    fn token_value_is_unsupported() {
        let err = ValueBufferSource::new(Token::new("purpose"), Value::Token(Token::new("render")))
            .unwrap_err();
        assert!(matches!(err, GraphicsError::UnsupportedValue { type_name: "token", .. }));
    }
}
