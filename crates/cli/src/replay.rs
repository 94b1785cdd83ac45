//! Card transport that replays a recorded APDU session

use std::collections::VecDeque;
use std::path::Path;

use figment::Figment;
use figment::providers::{Format, Toml};
use gpac_apdu_core::encoding::{hex_decode, hex_encode};
use gpac_apdu_core::{Bytes, CardTransport, TransportError};
use serde::Deserialize;
use tracing::trace;

/// One recorded command and the card's answer, both hex encoded
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Exchange {
    pub(crate) command: String,
    pub(crate) response: String,
}

/// Recorded session as stored on disk
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct Transcript {
    #[serde(rename = "exchange", default)]
    pub(crate) exchanges: Vec<Exchange>,
}

impl Transcript {
    /// Load a transcript from a TOML file
    pub(crate) fn load(path: &Path) -> eyre::Result<Self> {
        if !path.exists() {
            eyre::bail!("transcript {} not found", path.display());
        }
        Ok(Figment::new().merge(Toml::file(path)).extract()?)
    }
}

/// Answers each command with the next recorded response
///
/// Commands must arrive in recorded order; anything else is a transmission
/// error, as is running past the end of the transcript.
#[derive(Debug)]
pub(crate) struct ReplayTransport {
    exchanges: VecDeque<(Bytes, Bytes)>,
}

impl ReplayTransport {
    pub(crate) fn new(transcript: Transcript) -> eyre::Result<Self> {
        let exchanges = transcript
            .exchanges
            .into_iter()
            .enumerate()
            .map(|(i, exchange)| {
                let command = hex_decode(&exchange.command)
                    .map_err(|e| eyre::eyre!("exchange {i}: invalid command: {e}"))?;
                let response = hex_decode(&exchange.response)
                    .map_err(|e| eyre::eyre!("exchange {i}: invalid response: {e}"))?;
                if response.len() < 2 {
                    eyre::bail!("exchange {i}: response without status word");
                }
                Ok((Bytes::from(command), Bytes::from(response)))
            })
            .collect::<eyre::Result<_>>()?;

        Ok(Self { exchanges })
    }

    /// Number of recorded exchanges not yet replayed
    pub(crate) fn remaining(&self) -> usize {
        self.exchanges.len()
    }
}

impl CardTransport for ReplayTransport {
    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError> {
        let Some((expected, response)) = self.exchanges.pop_front() else {
            return Err(TransportError::other(format!(
                "transcript exhausted at {}",
                hex_encode(command)
            )));
        };

        if expected.as_ref() != command {
            return Err(TransportError::other(format!(
                "expected {}, got {}",
                hex_encode(&expected),
                hex_encode(command)
            )));
        }

        trace!(remaining = self.exchanges.len(), "Replayed exchange");
        Ok(response)
    }

    fn is_connected(&self) -> bool {
        true
    }

    fn reset(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    fn transcript(pairs: &[(&str, &str)]) -> Transcript {
        Transcript {
            exchanges: pairs
                .iter()
                .map(|(command, response)| Exchange {
                    command: command.to_string(),
                    response: response.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_replays_in_order() {
        let pairs = [("00 70 00 00 01", "01 90 00"), ("00708001", "9000")];
        let mut transport = ReplayTransport::new(transcript(&pairs)).unwrap();
        assert_eq!(transport.remaining(), 2);

        let response = transport.transmit_raw(&hex!("0070000001")).unwrap();
        assert_eq!(response.as_ref(), &hex!("019000"));
        let response = transport.transmit_raw(&hex!("00708001")).unwrap();
        assert_eq!(response.as_ref(), &hex!("9000"));

        assert!(matches!(
            transport.transmit_raw(&hex!("00708001")),
            Err(TransportError::Other(_))
        ));
    }

    #[test]
    fn test_unexpected_command() {
        let mut transport = ReplayTransport::new(transcript(&[("0070000001", "019000")])).unwrap();
        assert!(transport.transmit_raw(&hex!("00708001")).is_err());
    }

    #[test]
    fn test_rejects_bad_transcript() {
        assert!(ReplayTransport::new(transcript(&[("zz", "9000")])).is_err());
        assert!(ReplayTransport::new(transcript(&[("0070000001", "90")])).is_err());
    }
}
