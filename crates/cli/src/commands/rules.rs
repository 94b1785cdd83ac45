//! Print the access rules of a recorded card

use std::path::Path;

use crate::config::Config;

/// Read the rules from `script` and print them in file order
pub(crate) async fn rules_command(config: &Config, script: &Path) -> eyre::Result<()> {
    let rules = super::load_rules(config, script).await?;

    if rules.is_empty() {
        println!("No access rules: every application is denied");
        return Ok(());
    }

    println!("{} access rule(s):", rules.len());
    for (index, rule) in rules.iter().enumerate() {
        println!("  [{index}] {rule}");
    }
    Ok(())
}
