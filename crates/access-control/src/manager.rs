//! GPD rule retrieval from a UICC

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::channel::{ChannelClient, SecureElementConnector};
use crate::config::AccessControlConfig;
use crate::error::Result;
use crate::rules::{RefreshTag, RuleSet};
use crate::walker::{FileWalker, WalkOutcome};

/// Source of access rules for one kind of secure element
#[async_trait]
pub trait RuleRetriever: Send + Sync {
    /// Prepare the retriever, typically by reading the rules once
    async fn init(&self) -> Result<()> {
        self.get_access_rules().await.map(|_| ())
    }

    /// Current access rules
    ///
    /// Channel and transport failures are errors. Cards without usable GPD
    /// data yield an empty rule set.
    async fn get_access_rules(&self) -> Result<RuleSet>;
}

/// Reads GPD access rules from the PKCS#15 application of a UICC
///
/// The last rule set is remembered together with the ACMF refresh tag it was
/// read under. As long as the card reports the same tag, only the ODF, DODF
/// and ACMF are read again.
pub struct GpAccessRulesManager<C: ?Sized> {
    connector: Arc<C>,
    config: AccessControlConfig,
    snapshot: Mutex<Option<(RefreshTag, RuleSet)>>,
}

impl<C: ?Sized> fmt::Debug for GpAccessRulesManager<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpAccessRulesManager")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<C> GpAccessRulesManager<C>
where
    C: SecureElementConnector + ?Sized,
{
    /// Create a manager with the default configuration
    pub fn new(connector: Arc<C>) -> Self {
        Self::with_config(connector, AccessControlConfig::default())
    }

    /// Create a manager with a custom configuration
    pub fn with_config(connector: Arc<C>, config: AccessControlConfig) -> Self {
        Self {
            connector,
            config,
            snapshot: Mutex::new(None),
        }
    }

    /// Configuration in use
    pub const fn config(&self) -> &AccessControlConfig {
        &self.config
    }

    /// Refresh tag of the remembered rule set
    pub async fn refresh_tag(&self) -> Option<RefreshTag> {
        self.snapshot.lock().await.as_ref().map(|(tag, _)| *tag)
    }

    /// Forget the remembered rule set so the next retrieval reads every file
    pub async fn invalidate(&self) {
        self.snapshot.lock().await.take();
    }

    async fn retrieve(&self) -> Result<RuleSet> {
        // Held for the whole retrieval so only one channel is used at a time
        let mut snapshot = self.snapshot.lock().await;
        let known = snapshot.as_ref().map(|(tag, _)| *tag);

        let mut client = ChannelClient::new(self.connector.as_ref());
        client.open(&self.config.pkcs15_aid).await?;

        let outcome = FileWalker::new(&mut client, &self.config).walk(known).await;

        if let Err(e) = client.close().await {
            warn!(error = %e, "Failed to close access-control channel");
        }

        match outcome {
            Ok(WalkOutcome::Rules { refresh_tag, rules }) => {
                info!(%refresh_tag, count = rules.len(), "Loaded GPD access rules");
                *snapshot = Some((refresh_tag, rules.clone()));
                Ok(rules)
            }
            Ok(WalkOutcome::Unchanged(refresh_tag)) => {
                debug!(%refresh_tag, "Access rules unchanged");
                Ok(snapshot.as_ref().map(|(_, rules)| rules.clone()).unwrap_or_default())
            }
            Ok(WalkOutcome::NotSupported) => {
                info!("Card does not provide GPD access rules");
                snapshot.take();
                Ok(RuleSet::empty())
            }
            Err(e) if e.is_transport() => Err(e),
            Err(e) => {
                warn!(error = %e, "Unusable GPD access-control data, denying all access");
                snapshot.take();
                Ok(RuleSet::empty())
            }
        }
    }
}

#[async_trait]
impl<C> RuleRetriever for GpAccessRulesManager<C>
where
    C: SecureElementConnector + ?Sized,
{
    async fn get_access_rules(&self) -> Result<RuleSet> {
        self.retrieve().await
    }
}
