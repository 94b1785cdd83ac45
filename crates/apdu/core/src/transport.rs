//! Raw APDU transport
//!
//! A transport moves bytes to and from a card. It knows nothing about logical
//! channels, files or access rules.

use std::fmt;

use bytes::Bytes;
use tracing::{debug, trace};

/// Transport error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Connection error
    #[error("Failed to connect to device")]
    Connection,

    /// Transmission error
    #[error("Failed to transmit data")]
    Transmission,

    /// Device error
    #[error("Device error")]
    Device,

    /// Timeout error
    #[error("Operation timed out")]
    Timeout,

    /// Other error with message
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Create a general other error
    pub fn other<S: Into<String>>(message: S) -> Self {
        Self::Other(message.into())
    }
}

/// Trait for basic card transports
///
/// Implementations exchange complete APDUs with a card and return the complete
/// response including the status word.
pub trait CardTransport: Send + fmt::Debug {
    /// Send raw APDU bytes to card and return response bytes
    fn transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError> {
        trace!(command = %hex::encode_upper(command), "Transmitting raw command");
        let result = self.do_transmit_raw(command);
        match &result {
            Ok(response) => {
                trace!(response = %hex::encode_upper(response), "Received raw response")
            }
            Err(e) => debug!(error = %e, "Transport error during transmission"),
        }
        result
    }

    /// Internal implementation of transmit_raw
    ///
    /// This is the method that concrete implementations should override.
    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError>;

    /// Check if the transport is connected to a card
    fn is_connected(&self) -> bool;

    /// Reset the transport connection
    fn reset(&mut self) -> Result<(), TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct EchoTransport {
        sent: Vec<Bytes>,
        connected: bool,
    }

    impl CardTransport for EchoTransport {
        fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError> {
            if !self.connected {
                return Err(TransportError::Connection);
            }
            self.sent.push(Bytes::copy_from_slice(command));
            Ok(Bytes::from_static(&[0x90, 0x00]))
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        fn reset(&mut self) -> Result<(), TransportError> {
            self.connected = true;
            self.sent.clear();
            Ok(())
        }
    }

    #[test]
    fn test_transmit_goes_through_do_transmit() {
        let mut transport = EchoTransport::default();
        assert_eq!(
            transport.transmit_raw(&[0x00, 0x70, 0x00, 0x00, 0x01]),
            Err(TransportError::Connection)
        );

        transport.reset().unwrap();
        assert!(transport.is_connected());
        let response = transport.transmit_raw(&[0x00, 0x70, 0x00, 0x00, 0x01]).unwrap();
        assert_eq!(response.as_ref(), &[0x90, 0x00]);
        assert_eq!(transport.sent.len(), 1);
    }
}
