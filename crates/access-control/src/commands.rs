//! APDU builders for the commands used while reading access rules

use gpac_apdu_core::Command;

use crate::constants::{cla, ins, manage_channel, select};
use crate::error::{Error, Result};
use crate::rules::{Aid, FileId};

/// SELECT an EF under the current DF by file identifier, asking for the FCP
pub fn select_file(file: FileId) -> Command {
    Command::new_with_data_and_le(
        cla::ISO7816,
        ins::SELECT,
        select::P1_BY_FILE_ID,
        select::P2_RETURN_FCP,
        file.as_bytes().to_vec(),
        0x00,
    )
}

/// SELECT an application by AID
pub fn select_aid(aid: &Aid) -> Command {
    Command::new_with_data_and_le(
        cla::ISO7816,
        ins::SELECT,
        select::P1_BY_NAME,
        select::P2_FIRST_OCCURRENCE,
        aid.as_bytes().to_vec(),
        0x00,
    )
}

/// READ BINARY `le` bytes from `offset` of the selected EF
///
/// The offset goes into P1/P2 with bit 8 of P1 clear, so it must not exceed `0x7FFF`.
pub const fn read_binary(offset: u16, le: u8) -> Command {
    let [p1, p2] = offset.to_be_bytes();
    Command::new_with_le(cla::ISO7816, ins::READ_BINARY, p1 & 0x7F, p2, le)
}

/// MANAGE CHANNEL open, letting the card pick the channel number
pub const fn open_channel() -> Command {
    Command::new_with_le(cla::ISO7816, ins::MANAGE_CHANNEL, manage_channel::P1_OPEN, 0x00, 0x01)
}

/// MANAGE CHANNEL close for `channel`
pub const fn close_channel(channel: u8) -> Command {
    Command::new(cla::ISO7816, ins::MANAGE_CHANNEL, manage_channel::P1_CLOSE, channel)
}

/// Encode a logical channel number into a class byte
///
/// Channels 0 to 3 use the first interindustry encoding, channels 4 to 19 the
/// further interindustry encoding.
pub fn channel_class(cla: u8, channel: u8) -> Result<u8> {
    match channel {
        0..=3 => Ok((cla & 0xBC) | channel),
        4..=manage_channel::MAX_CHANNEL => Ok((cla & 0xB0) | 0x40 | (channel - 4)),
        _ => Err(Error::InvalidChannelState("logical channel number out of range")),
    }
}
