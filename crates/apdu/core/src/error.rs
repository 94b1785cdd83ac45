//! Core error type for the APDU codec
//!
//! Response parsing and hex conversion return [`Error`]; TLV and transport
//! failures keep their own types, [`crate::TlvError`] and
//! [`crate::TransportError`].

/// Result alias for this crate
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Core error type for codec operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// Response is too short to carry a status word
    #[error("Incomplete response: {0} bytes, at least 2 required")]
    IncompleteResponse(usize),

    /// Text is not valid hexadecimal
    #[error("Invalid hex string: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            Error::IncompleteResponse(1).to_string(),
            "Incomplete response: 1 bytes, at least 2 required"
        );
        let err: Error = hex::decode("ABC").unwrap_err().into();
        assert!(err.to_string().starts_with("Invalid hex string"));
    }
}
