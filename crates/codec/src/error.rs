use thiserror::Error;

use crate::Format;

/// Boxed parser failure carried by [`CodecError::Decoding`].
pub type ParseFailure = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum CodecError {
    /// The wire body could not be parsed. The parser's own error is kept as
    /// the source.
    #[error("malformed {format} body: {source}")]
    Decoding {
        format: Format,
        #[source]
        source: ParseFailure,
    },

    /// The payload holds a value the wire format cannot represent.
    #[error("cannot encode payload as {format}: {reason}")]
    Encoding { format: Format, reason: String },
}

impl CodecError {
    pub fn decoding(format: Format, source: impl Into<ParseFailure>) -> Self {
        Self::Decoding {
            format,
            source: source.into(),
        }
    }

    pub fn encoding(format: Format, reason: impl Into<String>) -> Self {
        Self::Encoding {
            format,
            reason: reason.into(),
        }
    }

    pub fn format(&self) -> Format {
        match self {
            Self::Decoding { format, .. } | Self::Encoding { format, .. } => *format,
        }
    }
}

/// Structural problem found after the bytes themselves parsed fine.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct MalformedDocument(pub String);
