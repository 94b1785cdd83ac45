//! Common test utilities: a simulated UICC and GPD file fixtures
#![allow(dead_code, unreachable_pub)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use gpac_access_control::apdu::{Bytes, CardTransport, TransportError};
use gpac_access_control::{Aid, CertificateHash, LogicalChannelConnector};
use hex_literal::hex;

pub const PKCS15_AID: [u8; 12] = hex!("A000000063504B43532D3135");

pub const AID_1: [u8; 6] = hex!("A00000015101");
pub const AID_2: [u8; 6] = hex!("A00000015102");
pub const AID_3: [u8; 6] = hex!("A00000015103");
pub const AID_4: [u8; 6] = hex!("A00000015104");
pub const AID_5: [u8; 6] = hex!("A00000015105");
pub const AID_6: [u8; 6] = hex!("A00000015106");

pub const HASH_1: [u8; 20] = hex!("1111111111111111111111111111111111111111");
pub const HASH_2: [u8; 20] = hex!("2222222222222222222222222222222222222222");
pub const HASH_3: [u8; 20] = hex!("3333333333333333333333333333333333333333");

pub const REFRESH_TAG: [u8; 8] = hex!("0102030405060708");

pub const ODF: [u8; 2] = hex!("5031");
pub const DODF: [u8; 2] = hex!("5207");
pub const ACMF: [u8; 2] = hex!("4200");
pub const ACRULES: [u8; 2] = hex!("4300");

pub fn aid(bytes: [u8; 6]) -> Aid {
    Aid::new(bytes.to_vec()).unwrap()
}

pub fn hash(bytes: [u8; 20]) -> CertificateHash {
    CertificateHash::new(bytes.to_vec())
}

/// ODF pointing at the DODF
pub fn odf() -> Vec<u8> {
    hex!("A706 3004 04025207").to_vec()
}

/// DODF with one GPD access-control entry pointing at the ACMF
pub fn dodf() -> Vec<u8> {
    hex!(
        "A129 3000 300F 0C0D 4750205345204163632043746C"
        "A114 3012 060A 2A864886FC6B81480101 3004 04024200"
    )
    .to_vec()
}

/// ACMF with `tag` pointing at the ACRules
pub fn acmf(tag: [u8; 8]) -> Vec<u8> {
    let mut data = hex!("3010 0408").to_vec();
    data.extend_from_slice(&tag);
    data.extend_from_slice(&hex!("3004 04024300"));
    data
}

/// ACRules entry for a specific applet
pub fn aid_rule(aid: [u8; 6], condition: [u8; 2]) -> Vec<u8> {
    let mut data = hex!("3010 A008 0406").to_vec();
    data.extend_from_slice(&aid);
    data.extend_from_slice(&hex!("3004 0402"));
    data.extend_from_slice(&condition);
    data
}

/// ACRules entry for all applets
pub fn all_applets_rule(condition: [u8; 2]) -> Vec<u8> {
    let mut data = hex!("3008 8200 3004 0402").to_vec();
    data.extend_from_slice(&condition);
    data
}

/// ACCondition entry granting one certificate hash
pub fn hash_condition(hash: [u8; 20]) -> Vec<u8> {
    let mut data = hex!("3016 0414").to_vec();
    data.extend_from_slice(&hash);
    data
}

/// Card laid out as the first GPD example
///
/// AID_1 is denied, AID_2 and AID_3 share a one-hash condition, every applet
/// is open to every application.
pub fn gpd_example_1() -> SimulatedCard {
    let rules = [
        aid_rule(AID_1, hex!("4310")),
        aid_rule(AID_2, hex!("4311")),
        aid_rule(AID_3, hex!("4311")),
        all_applets_rule(hex!("4312")),
    ]
    .concat();

    SimulatedCard::with_gpd_chain(rules)
        .with_file(hex!("4310"), Vec::new())
        .with_file(hex!("4311"), hash_condition(HASH_1))
        .with_file(hex!("4312"), hex!("3000").to_vec())
}

/// Card laid out as the second GPD example
///
/// AID_1 is open to every application, AID_2 to HASH_1, AID_3 to HASH_1..3,
/// and AID_4, AID_5 and every other applet are denied.
pub fn gpd_example_2() -> SimulatedCard {
    let rules = [
        aid_rule(AID_1, hex!("4310")),
        aid_rule(AID_2, hex!("4311")),
        aid_rule(AID_3, hex!("4312")),
        aid_rule(AID_4, hex!("4313")),
        aid_rule(AID_5, hex!("4313")),
        all_applets_rule(hex!("4313")),
    ]
    .concat();

    SimulatedCard::with_gpd_chain(rules)
        .with_file(hex!("4310"), hex!("3000").to_vec())
        .with_file(hex!("4311"), hash_condition(HASH_1))
        .with_file(
            hex!("4312"),
            [hash_condition(HASH_1), hash_condition(HASH_2), hash_condition(HASH_3)].concat(),
        )
        .with_file(hex!("4313"), Vec::new())
}

#[derive(Debug, Default)]
struct CardState {
    files: HashMap<[u8; 2], Vec<u8>>,
    reported_sizes: HashMap<[u8; 2], usize>,
    selected: Option<[u8; 2]>,
    open_channels: Vec<u8>,
    refuse_channels: bool,
    fail_after: Option<usize>,
    log: Vec<Vec<u8>>,
}

/// UICC simulation with a PKCS#15 application and a flat set of EFs
///
/// Clones share the same card, so a test can keep one handle for inspection
/// while the connector owns another.
#[derive(Debug, Clone, Default)]
pub struct SimulatedCard(Arc<Mutex<CardState>>);

impl SimulatedCard {
    /// Card with the ODF, DODF and ACMF in place and `rules` as ACRules
    pub fn with_gpd_chain(rules: Vec<u8>) -> Self {
        Self::default()
            .with_file(ODF, odf())
            .with_file(DODF, dodf())
            .with_file(ACMF, acmf(REFRESH_TAG))
            .with_file(ACRULES, rules)
    }

    pub fn with_file(self, id: [u8; 2], content: Vec<u8>) -> Self {
        self.set_file(id, content);
        self
    }

    /// Make the FCP report `size` instead of the real content length
    pub fn with_reported_size(self, id: [u8; 2], size: usize) -> Self {
        self.0.lock().unwrap().reported_sizes.insert(id, size);
        self
    }

    /// Answer MANAGE CHANNEL with "no channel available"
    pub fn refusing_channels(self) -> Self {
        self.0.lock().unwrap().refuse_channels = true;
        self
    }

    /// Fail every transmission after the first `count`
    pub fn failing_after(self, count: usize) -> Self {
        self.0.lock().unwrap().fail_after = Some(count);
        self
    }

    pub fn set_file(&self, id: [u8; 2], content: Vec<u8>) {
        self.0.lock().unwrap().files.insert(id, content);
    }

    pub fn connector(&self) -> Arc<LogicalChannelConnector<Self>> {
        Arc::new(LogicalChannelConnector::new(self.clone()))
    }

    /// Every command received so far, upper-case hex
    pub fn sent(&self) -> Vec<String> {
        self.0.lock().unwrap().log.iter().map(hex::encode_upper).collect()
    }

    pub fn clear_log(&self) {
        self.0.lock().unwrap().log.clear();
    }

    pub fn open_channels(&self) -> Vec<u8> {
        self.0.lock().unwrap().open_channels.clone()
    }

    /// Commands a full GPD traversal sends on channel 1, up to the ACMF
    pub fn expected_prefix(&self) -> Vec<String> {
        let mut expected = vec![
            "0070000001".to_string(),
            format!("01A404000C{}00", hex::encode_upper(PKCS15_AID)),
        ];
        for id in [ODF, DODF, ACMF] {
            expected.extend(self.expected_read(id));
        }
        expected
    }

    /// SELECT and, for a non-empty file, READ BINARY of `id` on channel 1
    pub fn expected_read(&self, id: [u8; 2]) -> Vec<String> {
        let state = self.0.lock().unwrap();
        let size = state
            .reported_sizes
            .get(&id)
            .copied()
            .unwrap_or_else(|| state.files[&id].len());

        let mut expected = vec![format!("01A4000402{}00", hex::encode_upper(id))];
        if size > 0 {
            expected.push(format!("01B00000{size:02X}"));
        }
        expected
    }
}

impl CardState {
    fn respond(&mut self, command: &[u8]) -> Vec<u8> {
        match command {
            [_, 0x70, 0x00, 0x00, 0x01] => {
                if self.refuse_channels {
                    return hex!("6A81").to_vec();
                }
                let channel = (1..=19u8).find(|c| !self.open_channels.contains(c));
                match channel {
                    Some(channel) => {
                        self.open_channels.push(channel);
                        vec![channel, 0x90, 0x00]
                    }
                    None => hex!("6A81").to_vec(),
                }
            }
            [_, 0x70, 0x80, channel] => {
                self.open_channels.retain(|c| c != channel);
                hex!("9000").to_vec()
            }
            [_, 0xA4, 0x04, 0x00, lc, rest @ ..] if rest.len() > usize::from(*lc) => {
                self.selected = None;
                if rest[..usize::from(*lc)] == PKCS15_AID {
                    hex!("9000").to_vec()
                } else {
                    hex!("6A82").to_vec()
                }
            }
            [_, 0xA4, 0x00, 0x04, 0x02, hi, lo, 0x00] => {
                let id = [*hi, *lo];
                let Some(content) = self.files.get(&id) else {
                    self.selected = None;
                    return hex!("6A82").to_vec();
                };
                let size = self.reported_sizes.get(&id).copied().unwrap_or(content.len());
                self.selected = Some(id);
                let [size_hi, size_lo] = (size as u16).to_be_bytes();
                vec![0x62, 0x04, 0x80, 0x02, size_hi, size_lo, 0x90, 0x00]
            }
            [_, 0xB0, p1, p2, le] => {
                let Some(content) = self.selected.and_then(|id| self.files.get(&id)) else {
                    return hex!("6986").to_vec();
                };
                let offset = (usize::from(p1 & 0x7F) << 8) | usize::from(*p2);
                let le = if *le == 0 { 256 } else { usize::from(*le) };
                if offset > content.len() {
                    return hex!("6B00").to_vec();
                }

                let end = (offset + le).min(content.len());
                let mut reply = content[offset..end].to_vec();
                if offset + le > content.len() {
                    reply.extend_from_slice(&hex!("6282"));
                } else {
                    reply.extend_from_slice(&hex!("9000"));
                }
                reply
            }
            _ => hex!("6D00").to_vec(),
        }
    }
}

impl CardTransport for SimulatedCard {
    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError> {
        let mut state = self.0.lock().unwrap();
        state.log.push(command.to_vec());
        if state.fail_after.is_some_and(|count| state.log.len() > count) {
            return Err(TransportError::Transmission);
        }

        // Logical channel bits do not matter to this card
        let mut command = command.to_vec();
        if let Some(cla) = command.first_mut() {
            *cla = 0x00;
        }
        Ok(Bytes::from(state.respond(&command)))
    }

    fn is_connected(&self) -> bool {
        true
    }

    fn reset(&mut self) -> Result<(), TransportError> {
        let mut state = self.0.lock().unwrap();
        state.open_channels.clear();
        state.selected = None;
        Ok(())
    }
}
