//! Application-level access decisions
//!
//! An application is identified by the SHA-1 hash of its developer certificate.
//! Before that hash is trusted, the GUID in the application manifest must carry
//! a valid signature made with the certificate's key.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::crypto::CryptoProvider;
use crate::decision;
use crate::error::{Error, Result};
use crate::manager::RuleRetriever;
use crate::rules::{Aid, SeType};

/// Identity data carried by an application manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Application GUID, hex encoded
    pub guid: String,
    /// Signature over the GUID bytes, hex encoded
    pub guid_sig: String,
}

/// Installed applications known to the host
#[async_trait]
pub trait ApplicationRegistry: Send + Sync {
    /// Manifest URL of the application with local id `app_id`
    async fn manifest_url(&self, app_id: u32) -> Result<Option<String>>;

    /// Manifest published at `manifest_url`
    async fn manifest(&self, manifest_url: &str) -> Result<Option<Manifest>>;

    /// DER encoded developer certificate public key shipped with the application
    async fn developer_certificate(&self, manifest_url: &str) -> Result<Option<Vec<u8>>>;
}

/// Decides whether an application may talk to an applet on a secure element
pub struct AccessControlEnforcer {
    registry: Arc<dyn ApplicationRegistry>,
    crypto: Arc<dyn CryptoProvider>,
    retrievers: HashMap<SeType, Arc<dyn RuleRetriever>>,
}

impl fmt::Debug for AccessControlEnforcer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessControlEnforcer")
            .field("se_types", &self.retrievers.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl AccessControlEnforcer {
    /// Create an enforcer with one rule retriever per secure element type
    pub fn new(
        registry: Arc<dyn ApplicationRegistry>,
        crypto: Arc<dyn CryptoProvider>,
        retrievers: HashMap<SeType, Arc<dyn RuleRetriever>>,
    ) -> Self {
        Self {
            registry,
            crypto,
            retrievers,
        }
    }

    /// Initialise every registered retriever
    ///
    /// Failures are logged; a retriever that failed here is retried on the next
    /// decision.
    pub async fn init(&self) {
        for (se_type, retriever) in &self.retrievers {
            match retriever.init().await {
                Ok(()) => info!(%se_type, "Access-control rules initialised"),
                Err(e) => warn!(%se_type, error = %e, "Failed to initialise access-control rules"),
            }
        }
    }

    /// Whether application `app_id` may access applet `aid` on `se_type`
    ///
    /// Every failure along the way denies access.
    #[instrument(skip(self, aid), fields(%aid))]
    pub async fn is_access_allowed(&self, app_id: u32, se_type: SeType, aid: &Aid) -> bool {
        match self.check(app_id, se_type, aid).await {
            Ok(allowed) => {
                debug!(allowed, "Access decision");
                allowed
            }
            Err(e) => {
                warn!(error = %e, "Access denied");
                false
            }
        }
    }

    async fn check(&self, app_id: u32, se_type: SeType, aid: &Aid) -> Result<bool> {
        let Some(manifest_url) = self.registry.manifest_url(app_id).await? else {
            return Err(Error::Registry(format!("unknown application {app_id}")));
        };

        let Some(certificate) = self.registry.developer_certificate(&manifest_url).await? else {
            return Err(Error::Registry(format!("no developer certificate for {manifest_url}")));
        };

        let Some(manifest) = self.registry.manifest(&manifest_url).await? else {
            return Err(Error::Registry(format!("no manifest at {manifest_url}")));
        };

        let guid = hex::decode(manifest.guid.trim())
            .map_err(|e| Error::Registry(format!("invalid manifest guid: {e}")))?;
        let signature = hex::decode(manifest.guid_sig.trim())
            .map_err(|e| Error::Registry(format!("invalid manifest guid_sig: {e}")))?;

        if !self.crypto.verify_signature(&certificate, &signature, &guid)? {
            return Err(Error::Crypto(format!("GUID signature mismatch for {manifest_url}")));
        }

        let hash = self.crypto.sha1(&certificate);
        let retriever = self
            .retrievers
            .get(&se_type)
            .ok_or(Error::UnsupportedSeType(se_type))?;

        let rules = retriever.get_access_rules().await?;
        Ok(decision::is_access_allowed(&rules, &hash, aid))
    }
}
