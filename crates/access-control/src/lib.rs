//! GlobalPlatform Device Secure Element Access Control
//!
//! Reads the access rules a UICC publishes in its PKCS#15 application and
//! decides whether an application, identified by its developer certificate, may
//! communicate with a given applet.
//!
//! The pieces, from the card up:
//!
//! - [`channel`]: logical channel lifecycle over a [`SecureElementConnector`]
//! - [`walker`]: the ODF -> DODF -> ACMF -> ACRules -> ACCondition traversal
//! - [`parser`] and [`builder`]: file decoding and rule assembly
//! - [`manager`]: the [`GpAccessRulesManager`] rule retriever
//! - [`decision`]: the access decision over a [`RuleSet`]
//! - [`enforcer`]: certificate checks and per secure element dispatch
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

pub mod builder;
pub mod channel;
pub mod commands;
pub mod config;
pub mod constants;
pub mod crypto;
pub mod decision;
pub mod enforcer;
pub mod manager;
pub mod parser;
pub mod rules;
pub mod walker;

mod error;
pub use error::{Error, Result};

pub use builder::RuleBuilder;
pub use channel::{ChannelClient, LogicalChannelConnector, SecureElementConnector};
pub use config::AccessControlConfig;
pub use crypto::{CryptoProvider, RustCryptoProvider};
pub use decision::is_access_allowed;
pub use enforcer::{AccessControlEnforcer, ApplicationRegistry, Manifest};
pub use manager::{GpAccessRulesManager, RuleRetriever};
pub use rules::{
    AccessRule, Aid, AppletSelector, ApplicationSelector, CertificateHash, FileId, RefreshTag,
    RuleSet, SeType,
};
pub use walker::{FileWalker, WalkOutcome};

// Re-export the APDU layer
pub use gpac_apdu_core as apdu;
