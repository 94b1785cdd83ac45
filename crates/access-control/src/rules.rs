//! Identifiers and access rules
//!
//! Rules are built once per retrieval and never mutated afterwards. A
//! [`RuleSet`] is a cheap handle that can be shared between concurrent
//! decisions.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use bytes::Bytes;
use derive_more::Display;
use gpac_apdu_core::encoding::{hex_decode, hex_encode};
use serde::{Deserialize, Serialize};

use crate::constants::limits::{MAX_AID_LEN, REFRESH_TAG_LEN};
use crate::error::{Error, Result};

/// Application identifier of a card applet (1 to 16 bytes)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Aid(Bytes);

impl Aid {
    /// Create an AID, checking its length
    pub fn new(bytes: impl Into<Bytes>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() || bytes.len() > MAX_AID_LEN {
            return Err(Error::InvalidAid(bytes.len()));
        }
        Ok(Self(bytes))
    }

    /// Create an AID from a constant, checking its length at compile time
    pub const fn from_static(bytes: &'static [u8]) -> Self {
        assert!(!bytes.is_empty() && bytes.len() <= MAX_AID_LEN, "AID must be 1 to 16 bytes");
        Self(Bytes::from_static(bytes))
    }

    /// Raw AID bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Aid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex_encode(&self.0))
    }
}

impl FromStr for Aid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(hex_decode(s)?)
    }
}

impl TryFrom<String> for Aid {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Aid> for String {
    fn from(aid: Aid) -> Self {
        aid.to_string()
    }
}

/// Hash of an application's signing certificate, usually SHA-1
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CertificateHash(Bytes);

impl CertificateHash {
    /// Wrap hash bytes
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Raw hash bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for CertificateHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex_encode(&self.0))
    }
}

impl FromStr for CertificateHash {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(Self::new(hex_decode(s)?))
    }
}

/// Two-byte elementary file identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FileId([u8; 2]);

impl FileId {
    /// Create from the two identifier bytes
    pub const fn new(id: [u8; 2]) -> Self {
        Self(id)
    }

    /// Resolve a PKCS#15 path to the file identifier it ends with
    pub fn from_path(path: &[u8]) -> Result<Self> {
        match path {
            [.., hi, lo] => Ok(Self([*hi, *lo])),
            _ => Err(Error::UnexpectedStructure("file path shorter than two bytes")),
        }
    }

    /// Identifier bytes
    pub const fn as_bytes(&self) -> [u8; 2] {
        self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}{:02X}", self.0[0], self.0[1])
    }
}

impl FromStr for FileId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = hex_decode(s)?;
        <[u8; 2]>::try_from(bytes.as_slice())
            .map(Self)
            .map_err(|_| Error::Config(format!("file id must be two bytes, got {}", bytes.len())))
    }
}

impl TryFrom<String> for FileId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<FileId> for String {
    fn from(id: FileId) -> Self {
        id.to_string()
    }
}

/// Tag stored in the ACMF that changes whenever the rules change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RefreshTag([u8; REFRESH_TAG_LEN]);

impl RefreshTag {
    /// Create from the raw tag
    pub const fn new(tag: [u8; REFRESH_TAG_LEN]) -> Self {
        Self(tag)
    }
}

impl TryFrom<&[u8]> for RefreshTag {
    type Error = Error;

    fn try_from(value: &[u8]) -> Result<Self> {
        <[u8; REFRESH_TAG_LEN]>::try_from(value)
            .map(Self)
            .map_err(|_| Error::UnexpectedStructure("refresh tag is not eight bytes"))
    }
}

impl fmt::Display for RefreshTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex_encode(self.0))
    }
}

/// Kind of secure element a rule retriever serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeType {
    /// SIM / UICC
    #[display("uicc")]
    Uicc,
    /// Embedded secure element
    #[display("ese")]
    Ese,
}

impl FromStr for SeType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "uicc" => Ok(Self::Uicc),
            "ese" => Ok(Self::Ese),
            other => Err(Error::Config(format!("unknown secure element type `{other}`"))),
        }
    }
}

/// Which applets a rule applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppletSelector {
    /// One applet, by exact AID
    Specific(Aid),
    /// Every applet
    AllApplets,
}

impl AppletSelector {
    /// Whether `aid` is covered
    pub fn matches(&self, aid: &Aid) -> bool {
        match self {
            Self::Specific(expected) => expected == aid,
            Self::AllApplets => true,
        }
    }
}

impl fmt::Display for AppletSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Specific(aid) => fmt::Display::fmt(aid, f),
            Self::AllApplets => f.write_str("all applets"),
        }
    }
}

/// Which applications a rule applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplicationSelector {
    /// Applications signed with one of these certificates, in file order
    Hashes(Vec<CertificateHash>),
    /// Every application
    AllowAll,
    /// No application
    DenyAll,
}

impl ApplicationSelector {
    /// Build a hash selector, dropping repeated hashes but keeping first-seen order
    pub fn hashes(hashes: impl IntoIterator<Item = CertificateHash>) -> Self {
        let mut unique: Vec<CertificateHash> = Vec::new();
        for hash in hashes {
            if !unique.contains(&hash) {
                unique.push(hash);
            }
        }
        Self::Hashes(unique)
    }
}

impl fmt::Display for ApplicationSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllowAll => f.write_str("allow all"),
            Self::DenyAll => f.write_str("deny all"),
            Self::Hashes(hashes) => {
                let joined: Vec<String> = hashes.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", joined.join(", "))
            }
        }
    }
}

/// One access rule: applets on the left, applications on the right
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRule {
    /// Applets the rule covers
    pub applet: AppletSelector,
    /// Applications the rule covers
    pub application: ApplicationSelector,
}

impl AccessRule {
    /// Create a rule
    pub const fn new(applet: AppletSelector, application: ApplicationSelector) -> Self {
        Self {
            applet,
            application,
        }
    }
}

impl fmt::Display for AccessRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.applet, self.application)
    }
}

/// Ordered, immutable list of access rules
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RuleSet(Arc<[AccessRule]>);

impl RuleSet {
    /// Rule set without any rule, denying everything
    pub fn empty() -> Self {
        Self::default()
    }

    /// Rules in file order
    pub fn rules(&self) -> &[AccessRule] {
        &self.0
    }

    /// Iterate over the rules in file order
    pub fn iter(&self) -> std::slice::Iter<'_, AccessRule> {
        self.0.iter()
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no rules
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<AccessRule>> for RuleSet {
    fn from(rules: Vec<AccessRule>) -> Self {
        Self(rules.into())
    }
}

impl FromIterator<AccessRule> for RuleSet {
    fn from_iter<I: IntoIterator<Item = AccessRule>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a AccessRule;
    type IntoIter = std::slice::Iter<'a, AccessRule>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
