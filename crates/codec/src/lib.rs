//! `bookstore-codec`: dual-format (JSON / XML) payload marshaling.
//!
//! Every body crossing the HTTP boundary is represented as a [`Payload`]: an
//! ordered tree of named values. The two wire encodings are symmetric except
//! for one thing: XML needs a root element name on encode, and decode strips
//! that root again so callers only ever see its children.

pub mod error;
pub mod format;
pub mod json;
pub mod payload;
pub mod xml;

pub use error::CodecError;
pub use format::Format;
pub use payload::{Payload, Value};

/// Encode `payload` into `format`.
///
/// `root` names the XML document element and is ignored for JSON.
pub fn encode(payload: &Payload, root: &str, format: Format) -> Result<Vec<u8>, CodecError> {
    match format {
        Format::Json => json::encode(payload),
        Format::Xml => xml::encode(payload, root),
    }
}

/// Decode raw bytes in `format` into a payload tree.
pub fn decode(bytes: &[u8], format: Format) -> Result<Payload, CodecError> {
    match format {
        Format::Json => json::decode(bytes),
        Format::Xml => xml::decode(bytes),
    }
}
