//! Command handlers

use std::path::Path;
use std::sync::Arc;

use gpac_access_control::{GpAccessRulesManager, LogicalChannelConnector, RuleRetriever, RuleSet};
use tracing::{info, warn};

use crate::config::Config;
use crate::replay::{ReplayTransport, Transcript};

mod decisions;
mod rules;

pub(crate) use decisions::{ApplicationFiles, check_command, enforce_command};
pub(crate) use rules::rules_command;

type ReplayManager = GpAccessRulesManager<LogicalChannelConnector<ReplayTransport>>;

/// Rule manager reading from the transcript at `script`
fn replay_manager(
    config: &Config,
    script: &Path,
) -> eyre::Result<(ReplayManager, Arc<LogicalChannelConnector<ReplayTransport>>)> {
    let transport = ReplayTransport::new(Transcript::load(script)?)?;
    info!(script = %script.display(), exchanges = transport.remaining(), "Loaded transcript");

    let connector = Arc::new(LogicalChannelConnector::new(transport));
    let manager =
        GpAccessRulesManager::with_config(Arc::clone(&connector), config.access_control.clone());
    Ok((manager, connector))
}

/// Warn about recorded exchanges the retrieval never reached
fn report_unused(connector: Arc<LogicalChannelConnector<ReplayTransport>>) {
    if let Ok(connector) = Arc::try_unwrap(connector) {
        let remaining = connector.into_inner().remaining();
        if remaining > 0 {
            warn!(remaining, "Transcript has exchanges that were not replayed");
        }
    }
}

/// Read the rules recorded in `script`
pub(crate) async fn load_rules(config: &Config, script: &Path) -> eyre::Result<RuleSet> {
    let (manager, connector) = replay_manager(config, script)?;
    let rules = manager.get_access_rules().await?;
    drop(manager);
    report_unused(connector);
    Ok(rules)
}
