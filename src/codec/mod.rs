//! Byte-level building blocks shared by the packet codecs.
//!
//! - [`FixedBuffer`] - a fixed-capacity byte container with in-place edits
//! - [`FieldTree`] - linked fields addressing regions of a buffer
//! - [`length`] - MQTT remaining-length encoding
//!
//! Nothing in this module allocates.

pub mod buffer;
pub mod error;
pub mod field;
pub mod length;

pub use buffer::FixedBuffer;
pub use error::Error;
pub use field::{FieldId, FieldTree};
