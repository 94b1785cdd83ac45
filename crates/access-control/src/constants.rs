//! Constants for PKCS#15 file access and GPD access-control structures

/// Command classes
pub mod cla {
    /// ISO 7816 inter-industry class
    pub const ISO7816: u8 = 0x00;
}

/// Instruction codes
pub mod ins {
    /// SELECT
    pub const SELECT: u8 = 0xA4;
    /// READ BINARY
    pub const READ_BINARY: u8 = 0xB0;
    /// MANAGE CHANNEL
    pub const MANAGE_CHANNEL: u8 = 0x70;
}

/// SELECT parameters
pub mod select {
    /// P1: select EF under the current DF by file identifier
    pub const P1_BY_FILE_ID: u8 = 0x00;
    /// P1: select by DF name (AID)
    pub const P1_BY_NAME: u8 = 0x04;
    /// P2: return the FCP template
    pub const P2_RETURN_FCP: u8 = 0x04;
    /// P2: first or only occurrence, return FCI
    pub const P2_FIRST_OCCURRENCE: u8 = 0x00;
}

/// MANAGE CHANNEL parameters
pub mod manage_channel {
    /// P1: open a channel
    pub const P1_OPEN: u8 = 0x00;
    /// P1: close a channel
    pub const P1_CLOSE: u8 = 0x80;
    /// Highest logical channel number
    pub const MAX_CHANNEL: u8 = 19;
}

/// Well-known identifiers
pub mod ids {
    /// PKCS#15 application AID
    pub const PKCS15_AID: [u8; 12] = [
        0xA0, 0x00, 0x00, 0x00, 0x63, 0x50, 0x4B, 0x43, 0x53, 0x2D, 0x31, 0x35,
    ];
    /// Object Directory File
    pub const ODF_FILE_ID: [u8; 2] = [0x50, 0x31];
    /// GPD Secure Element access control OID 1.2.840.114283.200.1.1
    pub const GPD_AC_OID: [u8; 10] = [0x2A, 0x86, 0x48, 0x86, 0xFC, 0x6B, 0x81, 0x48, 0x01, 0x01];
}

/// TLV tags found in the file chain
pub mod tags {
    /// FCP template
    pub const FCP: u8 = 0x62;
    /// FCI template
    pub const FCI: u8 = 0x6F;
    /// Number of data bytes in the file (inside FCP)
    pub const FILE_SIZE: u8 = 0x80;
    /// SEQUENCE
    pub const SEQUENCE: u8 = 0x30;
    /// OCTET STRING
    pub const OCTET_STRING: u8 = 0x04;
    /// OBJECT IDENTIFIER
    pub const OID: u8 = 0x06;
    /// ODF entry pointing to the DODF
    pub const ODF_DODF: u8 = 0xA7;
    /// DODF oidDO entry and its type attributes
    pub const DODF_OID_DO: u8 = 0xA1;
    /// ACRules target: specific AID
    pub const TARGET_AID: u8 = 0xA0;
    /// ACRules target: default application
    pub const TARGET_DEFAULT: u8 = 0x81;
    /// ACRules target: all other applets
    pub const TARGET_ALL: u8 = 0x82;
}

/// File sizes and limits
pub mod limits {
    /// Default READ BINARY chunk
    pub const DEFAULT_READ_CHUNK: u8 = 0xFF;
    /// Highest offset addressable through P1/P2 without short EF selection
    pub const MAX_READ_OFFSET: usize = 0x7FFF;
    /// Length of the ACMF refresh tag
    pub const REFRESH_TAG_LEN: usize = 8;
    /// Longest AID allowed by ISO 7816-4
    pub const MAX_AID_LEN: usize = 16;
}
