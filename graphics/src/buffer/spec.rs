//! Buffer layout descriptions.

use hydrant_core::{Token, TupleType};

use super::source::BufferSourceHandle;

/// Name and per-element layout of one buffer in a range.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BufferSpec {
    /// Buffer name, usually the primvar name.
    pub name: Token,
    /// Element layout.
    pub tuple_type: TupleType,
}

impl BufferSpec {
    pub fn new(name: Token, tuple_type: TupleType) -> Self {
        Self { name, tuple_type }
    }

    /// Append `spec` unless a spec with the same name is already listed.
    ///
    /// A name listed with a different layout keeps the first layout.
    pub fn push_unique(specs: &mut Vec<BufferSpec>, spec: BufferSpec) {
        match specs.iter().find(|s| s.name == spec.name) {
            Some(existing) if existing.tuple_type != spec.tuple_type => {
                log::warn!(
                    "buffer {} declared as {:?} and {:?}",
                    spec.name,
                    existing.tuple_type,
                    spec.tuple_type
                );
            }
            Some(_) => {}
            None => specs.push(spec),
        }
    }
}

/// Union of the specs implied by `sources`.
pub fn add_buffer_specs(specs: &mut Vec<BufferSpec>, sources: &[BufferSourceHandle]) {
    for source in sources {
        source.add_buffer_specs(specs);
    }
}
