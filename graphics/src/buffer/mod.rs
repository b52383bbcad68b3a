//! Buffer specs, buffer sources and buffer array ranges.
//!
//! - [`BufferSpec`] - name and element layout of one buffer
//! - [`BufferSource`] - deferred producer of buffer bytes
//! - [`BufferArrayRange`] - an allocation holding one resource per spec
//! - [`BufferArrayRangeContainer`] - slot table shared by an rprim's draw items

mod range;
mod source;
mod spec;

pub use range::{BufferArrayRange, BufferArrayRangeContainer, BufferResource};
pub use source::{BufferSource, BufferSourceHandle, ValueBufferSource};
pub use spec::{BufferSpec, add_buffer_specs};
