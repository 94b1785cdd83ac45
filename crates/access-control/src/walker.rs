//! Traversal of the PKCS#15 file chain ODF -> DODF -> ACMF -> ACRules -> ACCondition
//!
//! Every stage SELECTs an EF by file identifier, takes the file size from the
//! returned FCP and reads the whole file with READ BINARY before handing the
//! bytes to [`crate::parser`].

use bytes::{Bytes, BytesMut};
use gpac_apdu_core::StatusWord;
use tracing::{Level, debug, info, trace, warn};

use crate::builder::RuleBuilder;
use crate::channel::{ChannelClient, SecureElementConnector};
use crate::commands;
use crate::config::AccessControlConfig;
use crate::constants::limits::MAX_READ_OFFSET;
use crate::error::{Error, Result};
use crate::parser;
use crate::rules::{FileId, RefreshTag, RuleSet};

/// Result of a traversal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkOutcome {
    /// Rules read from the card
    Rules {
        /// Refresh tag of the ACMF the rules were read under
        refresh_tag: RefreshTag,
        /// The rules in ACRules order
        rules: RuleSet,
    },
    /// The ACMF carries the refresh tag the caller already knows
    Unchanged(RefreshTag),
    /// The DODF has no GPD access-control entry
    NotSupported,
}

/// Reads the access-control files over an open channel
#[derive(Debug)]
pub struct FileWalker<'c, 'a, C: ?Sized> {
    client: &'c mut ChannelClient<'a, C>,
    odf: FileId,
    max_chunk: u8,
}

impl<'c, 'a, C> FileWalker<'c, 'a, C>
where
    C: SecureElementConnector + ?Sized,
{
    /// Create a walker over an open channel
    pub const fn new(client: &'c mut ChannelClient<'a, C>, config: &AccessControlConfig) -> Self {
        Self {
            client,
            odf: config.odf_file_id,
            max_chunk: config.max_read_chunk,
        }
    }

    /// Run the whole traversal
    ///
    /// With `known` set to the refresh tag of a previous traversal, the walk stops
    /// after the ACMF when the tag is unchanged.
    pub async fn walk(&mut self, known: Option<RefreshTag>) -> Result<WalkOutcome> {
        let dodf_file = parser::parse_odf(&self.read_file(self.odf).await?)?;
        debug!(odf = %self.odf, dodf = %dodf_file, "Read ODF");

        let mut builder = RuleBuilder::new();
        for acmf in parser::parse_dodf(&self.read_file(dodf_file).await?)? {
            builder.register_acmf(acmf)?;
        }
        let Some(acmf_file) = builder.acmf() else {
            debug!(dodf = %dodf_file, "No GPD access-control entry in DODF");
            return Ok(WalkOutcome::NotSupported);
        };

        let acmf = parser::parse_acmf(&self.read_file(acmf_file).await?)?;
        debug!(
            acmf = %acmf_file,
            refresh_tag = %acmf.refresh_tag,
            rules = %acmf.rules_file,
            "Read ACMF"
        );
        if known == Some(acmf.refresh_tag) {
            debug!(refresh_tag = %acmf.refresh_tag, "Refresh tag unchanged");
            return Ok(WalkOutcome::Unchanged(acmf.refresh_tag));
        }
        builder.set_refresh_tag(acmf.refresh_tag);

        let acrules = self.read_file(acmf.rules_file).await?;
        for (applet, condition) in parser::parse_acrules(&acrules)? {
            builder.add_rule_entry(applet, condition);
        }

        for file in builder.condition_files() {
            let application = parser::parse_condition(&self.read_file(file).await?)?;
            debug!(condition = %file, %application, "Read ACCondition");
            builder.add_condition(file, application);
        }

        let rules = builder.build()?;
        debug!(count = rules.len(), "Built access rules");
        Ok(WalkOutcome::Rules {
            refresh_tag: acmf.refresh_tag,
            rules,
        })
    }

    /// SELECT `file` and read its whole content
    pub async fn read_file(&mut self, file: FileId) -> Result<Bytes> {
        let response = self.client.exchange(&commands::select_file(file)).await?;
        log_status(file, "SELECT", response.status());
        if !response.is_success() {
            return Err(Error::FileNotAccessible {
                file,
                status: response.status(),
            });
        }

        let size = parser::file_size(response.payload())?;
        trace!(%file, size, "Selected file");
        if size == 0 {
            return Ok(Bytes::new());
        }
        if size > MAX_READ_OFFSET + usize::from(self.max_chunk) {
            return Err(Error::UnexpectedStructure("file too large for READ BINARY"));
        }

        self.read_binary(file, size).await
    }

    async fn read_binary(&mut self, file: FileId, size: usize) -> Result<Bytes> {
        let mut data = BytesMut::with_capacity(size);

        while data.len() < size {
            let offset = data.len();
            if offset > MAX_READ_OFFSET {
                return Err(Error::UnexpectedStructure("file too large for READ BINARY"));
            }

            let le = (size - offset).min(usize::from(self.max_chunk)) as u8;
            let mut response = self
                .client
                .exchange(&commands::read_binary(offset as u16, le))
                .await?;

            if let Some(correct) = response.status().correct_le() {
                trace!(%file, offset, le, correct, "Retrying READ BINARY with corrected length");
                response = self
                    .client
                    .exchange(&commands::read_binary(offset as u16, correct))
                    .await?;
            }

            let status = response.status();
            log_status(file, "READ BINARY", status);
            if !(status.is_success() || status.is_end_of_file()) {
                return Err(Error::FileNotAccessible { file, status });
            }

            data.extend_from_slice(response.payload());
            if status.is_end_of_file() || response.payload().is_empty() {
                break;
            }
        }

        data.truncate(size);
        Ok(data.freeze())
    }
}

/// Log a file access status word at the level it suggests
fn log_status(file: FileId, operation: &'static str, status: StatusWord) {
    let level = status.tracing_level();
    let description = status.description();
    if level == Level::DEBUG {
        debug!(%file, operation, %status, description, "File access status");
    } else if level == Level::INFO {
        info!(%file, operation, %status, description, "File access status");
    } else {
        warn!(%file, operation, %status, description, "File access status");
    }
}
