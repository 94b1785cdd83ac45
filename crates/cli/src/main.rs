//! `gpac`: inspect GPD access rules from recorded card sessions

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use gpac_access_control::{Aid, CertificateHash, SeType};
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod replay;

use commands::*;

#[derive(Parser)]
#[command(version, about = "Read GlobalPlatform access rules and evaluate access decisions")]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = "gpac.toml")]
    config: PathBuf,

    /// Debug level output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the access rules found on the card
    Rules {
        /// Recorded APDU transcript (TOML)
        #[arg(short, long)]
        script: PathBuf,
    },

    /// Decide whether a certificate hash may access an applet
    Check {
        /// Recorded APDU transcript (TOML)
        #[arg(short, long)]
        script: PathBuf,

        /// Applet AID in hex
        #[arg(long)]
        aid: Aid,

        /// Certificate hash in hex
        #[arg(long)]
        hash: CertificateHash,
    },

    /// Verify an application's manifest signature, then decide
    Enforce {
        /// Recorded APDU transcript (TOML)
        #[arg(short, long)]
        script: PathBuf,

        /// Application manifest (TOML with `guid` and `guid_sig`)
        #[arg(long)]
        manifest: PathBuf,

        /// DER encoded developer public key
        #[arg(long)]
        certificate: PathBuf,

        /// Secure element holding the applet
        #[arg(long, default_value = "uicc")]
        se_type: SeType,

        /// Applet AID in hex
        #[arg(long)]
        aid: Aid,
    },
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let config = config::load_config(&cli.config)?;
    debug!(?config, "Loaded configuration");

    match &cli.command {
        Commands::Rules { script } => rules_command(&config, script).await?,
        Commands::Check { script, aid, hash } => check_command(&config, script, aid, hash).await?,
        Commands::Enforce {
            script,
            manifest,
            certificate,
            se_type,
            aid,
        } => {
            let app = ApplicationFiles {
                manifest: manifest.clone(),
                certificate: certificate.clone(),
            };
            enforce_command(&config, script, &app, *se_type, aid).await?
        }
    }

    Ok(())
}

fn setup_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_env_filter(EnvFilter::from_default_env())
        .with_ansi(true)
        .init();
}
