//! Core types for the APDU side of GlobalPlatform access control
//!
//! This crate provides the byte-level building blocks used to talk to a UICC
//! and to interpret what it stores, according to ISO/IEC 7816-4:
//!
//! - Creating APDU commands and parsing responses ([`Command`], [`Response`])
//! - Status word interpretation ([`StatusWord`])
//! - A BER-TLV tree codec restricted to single-byte tags and short-form lengths ([`tlv`])
//! - Whitespace-insensitive hexadecimal conversion ([`encoding`])
//! - The raw transport abstraction ([`CardTransport`])
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

// Re-export bytes for convenience
pub use bytes::{Bytes, BytesMut};

pub mod command;
pub mod encoding;
pub mod response;
pub mod tlv;
pub mod transport;

mod error;
pub use error::{Error, Result};

pub use command::{Command, ExpectedLength};
pub use response::Response;
pub use response::status::StatusWord;
pub use tlv::{TlvError, TlvNode, TlvValue};
pub use transport::{CardTransport, TransportError};

/// Prelude module containing commonly used traits and types
pub mod prelude {
    pub use crate::{
        Bytes, BytesMut, Command, Error, Response, Result,
        encoding::{hex_decode, hex_encode},
        response::status::{StatusWord, common as status},
        tlv::{TlvNode, TlvValue},
        transport::{CardTransport, TransportError},
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reexports() {
        let cmd = Command::new(0x00, 0xA4, 0x00, 0x04);
        assert_eq!(cmd.class(), 0x00);
        assert_eq!(cmd.instruction(), 0xA4);
        assert_eq!(cmd.p1(), 0x00);
        assert_eq!(cmd.p2(), 0x04);

        let resp = Response::success(Bytes::from_static(&[0x01, 0x02, 0x03]));
        assert!(resp.is_success());
        assert_eq!(resp.payload().as_ref(), &[0x01, 0x02, 0x03]);
        assert_eq!(resp.status(), StatusWord::new(0x90, 0x00));
    }
}
