//! Error types for the wirefmt codecs

use thiserror::Error;

/// Result type alias for codec operations
pub type Result<T> = std::result::Result<T, Error>;

/// Every failure a codec can report.
///
/// All variants are recoverable by the caller: a decoder that fails on one
/// record leaves the caller free to skip it and carry on with the next one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Buffer shorter than a required fixed region
    #[error("truncated {what}: need {needed} bytes, have {available}")]
    TruncatedInput {
        what: &'static str,
        needed: usize,
        available: usize,
    },

    /// A DHCP option declares more value bytes than remain in the buffer
    #[error("truncated option {code}: declared length {declared}, {remaining} bytes remain")]
    TruncatedOption {
        code: u8,
        declared: usize,
        remaining: usize,
    },

    /// A netlink attribute length is below the header size or past the buffer end
    #[error("invalid attribute length {len} with {remaining} bytes remaining")]
    InvalidAttribute { len: usize, remaining: usize },

    /// Attribute offset lookup for a netlink message type that has no sub-header
    #[error("unsupported netlink message type {0}")]
    UnsupportedMessageType(u16),

    /// A typed builder was handed out-of-range arguments
    #[error("invalid construction: {0}")]
    InvalidConstruction(String),

    /// A fixed-region field makes the rest of the record undecodable
    #[error("invalid {what}: {reason}")]
    InvalidField { what: &'static str, reason: String },
}

impl Error {
    /// Create a truncated-input error
    pub fn truncated(what: &'static str, needed: usize, available: usize) -> Self {
        Error::TruncatedInput {
            what,
            needed,
            available,
        }
    }

    /// Create an invalid-field error
    pub fn invalid_field<S: Into<String>>(what: &'static str, reason: S) -> Self {
        Error::InvalidField {
            what,
            reason: reason.into(),
        }
    }

    /// Create an invalid-construction error
    pub fn invalid_construction<S: Into<String>>(msg: S) -> Self {
        Error::InvalidConstruction(msg.into())
    }

    /// True for every variant that means "the buffer ran out" or
    /// "a declared length does not fit".
    pub fn is_truncated(&self) -> bool {
        matches!(
            self,
            Error::TruncatedInput { .. }
                | Error::TruncatedOption { .. }
                | Error::InvalidAttribute { .. }
        )
    }
}
