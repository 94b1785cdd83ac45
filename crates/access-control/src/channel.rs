//! Logical channel handling
//!
//! [`SecureElementConnector`] is what the host platform provides: open a
//! channel to an applet, exchange APDUs on it, close it. [`ChannelClient`]
//! wraps one channel and enforces the `Closed -> Open -> Closed` lifecycle.
//! [`LogicalChannelConnector`] implements the connector on top of a raw
//! [`CardTransport`] using MANAGE CHANNEL.

use std::fmt;

use async_trait::async_trait;
use gpac_apdu_core::{CardTransport, Command, Response, TransportError};
use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

use crate::commands;
use crate::error::{Error, Result};
use crate::rules::Aid;

/// Access to logical channels on a secure element
#[async_trait]
pub trait SecureElementConnector: Send + Sync {
    /// Open a logical channel to the applet `aid`, returning the channel number
    async fn open_channel(&self, aid: &Aid) -> Result<u8>;

    /// Send one APDU on `channel` and wait for the response
    ///
    /// Non-success status words are returned as data, not as errors.
    async fn exchange_apdu(&self, channel: u8, command: &Command) -> Result<Response>;

    /// Close `channel`
    async fn close_channel(&self, channel: u8) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChannelState {
    Closed,
    Open(u8),
}

/// One logical channel session over a connector
pub struct ChannelClient<'a, C: ?Sized> {
    connector: &'a C,
    state: ChannelState,
}

impl<C: ?Sized> fmt::Debug for ChannelClient<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelClient").field("state", &self.state).finish()
    }
}

impl<'a, C> ChannelClient<'a, C>
where
    C: SecureElementConnector + ?Sized,
{
    /// Create a client in the closed state
    pub const fn new(connector: &'a C) -> Self {
        Self {
            connector,
            state: ChannelState::Closed,
        }
    }

    /// Channel number while open
    pub const fn channel(&self) -> Option<u8> {
        match self.state {
            ChannelState::Open(channel) => Some(channel),
            ChannelState::Closed => None,
        }
    }

    /// Whether a channel is open
    pub const fn is_open(&self) -> bool {
        matches!(self.state, ChannelState::Open(_))
    }

    /// Open a channel to `aid`
    pub async fn open(&mut self, aid: &Aid) -> Result<u8> {
        if self.is_open() {
            return Err(Error::InvalidChannelState("channel already open"));
        }

        let channel = self.connector.open_channel(aid).await.map_err(|e| match e {
            Error::ChannelOpenError(_) => e,
            other => Error::ChannelOpenError(other.to_string()),
        })?;

        debug!(%aid, channel, "Opened logical channel");
        self.state = ChannelState::Open(channel);
        Ok(channel)
    }

    /// Exchange one APDU on the open channel
    pub async fn exchange(&mut self, command: &Command) -> Result<Response> {
        let ChannelState::Open(channel) = self.state else {
            return Err(Error::InvalidChannelState("channel is closed"));
        };

        trace!(channel, command = %hex::encode_upper(command.to_bytes()), "Sending APDU");
        let response = self
            .connector
            .exchange_apdu(channel, command)
            .await
            .map_err(|e| {
                if e.is_transport() {
                    e
                } else {
                    Error::TransmissionError(TransportError::other(e.to_string()))
                }
            })?;
        trace!(
            channel,
            status = %response.status(),
            payload = %hex::encode_upper(response.payload()),
            "Received APDU response"
        );

        Ok(response)
    }

    /// Close the channel if open; closing a closed client does nothing
    pub async fn close(&mut self) -> Result<()> {
        let ChannelState::Open(channel) = self.state else {
            return Ok(());
        };

        self.state = ChannelState::Closed;
        self.connector.close_channel(channel).await?;
        debug!(channel, "Closed logical channel");
        Ok(())
    }
}

/// Connector that opens logical channels over a raw APDU transport
pub struct LogicalChannelConnector<T> {
    transport: Mutex<T>,
}

impl<T: fmt::Debug> fmt::Debug for LogicalChannelConnector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogicalChannelConnector").finish_non_exhaustive()
    }
}

impl<T: CardTransport> LogicalChannelConnector<T> {
    /// Wrap a transport
    pub fn new(transport: T) -> Self {
        Self {
            transport: Mutex::new(transport),
        }
    }

    /// Give the transport back
    pub fn into_inner(self) -> T {
        self.transport.into_inner()
    }

    fn transmit(transport: &mut T, command: &Command) -> Result<Response> {
        let raw = transport.transmit_raw(&command.to_bytes())?;
        Response::from_bytes(&raw)
            .map_err(|e| Error::TransmissionError(TransportError::other(e.to_string())))
    }

    /// Best-effort MANAGE CHANNEL close for a channel whose SELECT failed
    fn close_after_failed_select(transport: &mut T, channel: u8) {
        if let Err(e) = Self::transmit(transport, &commands::close_channel(channel)) {
            warn!(channel, error = %e, "Failed to close channel after failed SELECT");
        }
    }
}

#[async_trait]
impl<T: CardTransport> SecureElementConnector for LogicalChannelConnector<T> {
    async fn open_channel(&self, aid: &Aid) -> Result<u8> {
        let mut transport = self.transport.lock().await;

        let response = Self::transmit(&mut transport, &commands::open_channel())?;
        let channel = match response.payload().as_ref() {
            [channel] if response.is_success() => *channel,
            _ => {
                return Err(Error::ChannelOpenError(format!(
                    "MANAGE CHANNEL returned {}",
                    response.status()
                )));
            }
        };

        let select = commands::select_aid(aid);
        let selected = commands::channel_class(select.cla, channel)
            .and_then(|cla| Self::transmit(&mut transport, &select.with_class(cla)));
        let response = match selected {
            Ok(response) => response,
            Err(e) => {
                Self::close_after_failed_select(&mut transport, channel);
                return Err(Error::ChannelOpenError(format!("SELECT {aid} failed: {e}")));
            }
        };

        let status = response.status();
        if !(status.is_success() || status.is_warning() || status.sw1 == 0x61) {
            Self::close_after_failed_select(&mut transport, channel);
            return Err(Error::ChannelOpenError(format!(
                "SELECT {aid} returned {status} ({})",
                status.description()
            )));
        }

        Ok(channel)
    }

    async fn exchange_apdu(&self, channel: u8, command: &Command) -> Result<Response> {
        let cla = commands::channel_class(command.cla, channel)?;
        let mut transport = self.transport.lock().await;
        Self::transmit(&mut transport, &command.clone().with_class(cla))
    }

    async fn close_channel(&self, channel: u8) -> Result<()> {
        // The basic channel is never closed
        if channel == 0 {
            return Ok(());
        }

        let mut transport = self.transport.lock().await;
        let response = Self::transmit(&mut transport, &commands::close_channel(channel))?;
        if !response.is_success() {
            warn!(channel, status = %response.status(), "MANAGE CHANNEL close rejected");
        }
        Ok(())
    }
}
