//! Access decisions against a recorded card

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use figment::Figment;
use figment::providers::{Format, Toml};
use gpac_access_control::{
    AccessControlEnforcer, Aid, ApplicationRegistry, CertificateHash, Manifest, RuleRetriever,
    RustCryptoProvider, SeType, is_access_allowed,
};
use tracing::debug;

use crate::config::Config;

/// Application id under which the single local application is registered
const LOCAL_APP_ID: u32 = 1;

fn verdict(allowed: bool) -> &'static str {
    if allowed { "allowed" } else { "denied" }
}

/// Decide for a certificate hash given directly
pub(crate) async fn check_command(
    config: &Config,
    script: &Path,
    aid: &Aid,
    hash: &CertificateHash,
) -> eyre::Result<()> {
    let rules = super::load_rules(config, script).await?;
    let allowed = is_access_allowed(&rules, hash, aid);
    println!("{hash} -> {aid}: {}", verdict(allowed));
    Ok(())
}

/// Registry holding one application read from local files
#[derive(Debug)]
struct LocalRegistry {
    url: String,
    manifest: Manifest,
    certificate: Vec<u8>,
}

impl LocalRegistry {
    fn load(manifest: &Path, certificate: &Path) -> eyre::Result<Self> {
        if !manifest.exists() {
            eyre::bail!("manifest {} not found", manifest.display());
        }
        let url = format!("file://{}", manifest.display());
        let manifest = Figment::new().merge(Toml::file(manifest)).extract()?;
        let certificate = std::fs::read(certificate)?;
        debug!(%url, certificate_len = certificate.len(), "Loaded local application");

        Ok(Self {
            url,
            manifest,
            certificate,
        })
    }
}

#[async_trait]
impl ApplicationRegistry for LocalRegistry {
    async fn manifest_url(&self, app_id: u32) -> gpac_access_control::Result<Option<String>> {
        Ok((app_id == LOCAL_APP_ID).then(|| self.url.clone()))
    }

    async fn manifest(&self, manifest_url: &str) -> gpac_access_control::Result<Option<Manifest>> {
        Ok((manifest_url == self.url).then(|| self.manifest.clone()))
    }

    async fn developer_certificate(
        &self,
        manifest_url: &str,
    ) -> gpac_access_control::Result<Option<Vec<u8>>> {
        Ok((manifest_url == self.url).then(|| self.certificate.clone()))
    }
}

/// Files describing the application for `enforce`
#[derive(Debug, Clone)]
pub(crate) struct ApplicationFiles {
    /// TOML manifest with `guid` and `guid_sig`
    pub(crate) manifest: PathBuf,
    /// DER encoded developer public key
    pub(crate) certificate: PathBuf,
}

/// Full enforcement: signature check, certificate hash and rule lookup
pub(crate) async fn enforce_command(
    config: &Config,
    script: &Path,
    app: &ApplicationFiles,
    se_type: SeType,
    aid: &Aid,
) -> eyre::Result<()> {
    let registry = LocalRegistry::load(&app.manifest, &app.certificate)?;
    let (manager, _) = super::replay_manager(config, script)?;
    let retriever: Arc<dyn RuleRetriever> = Arc::new(manager);

    let enforcer = AccessControlEnforcer::new(
        Arc::new(registry),
        Arc::new(RustCryptoProvider),
        HashMap::from([(SeType::Uicc, retriever)]),
    );

    let allowed = enforcer.is_access_allowed(LOCAL_APP_ID, se_type, aid).await;
    println!("{} on {se_type} -> {aid}: {}", app.manifest.display(), verdict(allowed));
    Ok(())
}
