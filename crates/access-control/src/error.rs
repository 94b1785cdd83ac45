use gpac_apdu_core::{StatusWord, TlvError, TransportError};
use thiserror::Error;

use crate::rules::{FileId, SeType};

/// Result type for access-control operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for access-control operations
#[derive(Debug, Error)]
pub enum Error {
    /// File content is not valid BER-TLV
    #[error("Malformed TLV: {0}")]
    MalformedTlv(#[from] TlvError),

    /// The card refused to open a logical channel
    #[error("Failed to open channel: {0}")]
    ChannelOpenError(String),

    /// An APDU could not be exchanged
    #[error("Transmission failed: {0}")]
    TransmissionError(#[from] TransportError),

    /// Operation not allowed in the current channel state
    #[error("Invalid channel state: {0}")]
    InvalidChannelState(&'static str),

    /// The DODF references more than one access-control main file
    #[error("More than one ACMF referenced by the DODF")]
    MultipleAcmfFiles,

    /// No rule retriever registered for the secure element type
    #[error("Unsupported secure element type: {0}")]
    UnsupportedSeType(SeType),

    /// SELECT or READ BINARY answered with a non-success status word
    #[error("File {file} not accessible: {status} ({})", .status.description())]
    FileNotAccessible {
        /// File being accessed
        file: FileId,
        /// Status word returned by the card
        status: StatusWord,
    },

    /// File content decoded but has an unexpected shape
    #[error("Unexpected structure: {0}")]
    UnexpectedStructure(&'static str),

    /// AID of invalid length
    #[error("Invalid AID length: {0} (expected 1 to 16 bytes)")]
    InvalidAid(usize),

    /// A rule references a condition file that was never read
    #[error("Missing access condition for file {0}")]
    MissingCondition(FileId),

    /// Application registry lookup failed
    #[error("Registry error: {0}")]
    Registry(String),

    /// Signature verification or hashing failed
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Codec error from the APDU layer
    #[error(transparent)]
    Apdu(#[from] gpac_apdu_core::Error),
}

impl Error {
    /// Whether the error comes from the channel or the transport
    ///
    /// Such errors abort a rule retrieval. Everything else found while walking
    /// the file chain resolves to an empty rule set.
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::ChannelOpenError(_) | Self::TransmissionError(_) | Self::InvalidChannelState(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_classification() {
        assert!(Error::ChannelOpenError("6A 82".into()).is_transport());
        assert!(Error::TransmissionError(TransportError::Timeout).is_transport());
        assert!(Error::InvalidChannelState("closed").is_transport());

        assert!(!Error::MultipleAcmfFiles.is_transport());
        assert!(!Error::UnexpectedStructure("ODF").is_transport());
        assert!(!Error::MalformedTlv(TlvError::Empty).is_transport());
    }

    #[test]
    fn test_file_error_message() {
        let err = Error::FileNotAccessible {
            file: FileId::new([0x50, 0x31]),
            status: StatusWord::new(0x6A, 0x82),
        };
        assert_eq!(
            err.to_string(),
            "File 5031 not accessible: 6A 82 (File or application not found)"
        );
    }
}
