//! cephroll: rolling upgrades and slow reweights for a Ceph cluster.
//!
//! Every node runs the same command; ordering comes from the sorted roster
//! and the hand-off markers, not from a scheduler.
//!
//! # Usage
//!
//! ```text
//! cephroll roll mon jewel --from hammer
//! cephroll reweight osd.3 0.8 --step 0.05 --timeout 7200
//! cephroll check-status --file /var/lib/nagios/cephstatus.json
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cephroll_core::{OperationKind, OsdId};

mod commands;
mod context;

use context::Context;

#[derive(Parser)]
#[command(
    name = "cephroll",
    about = "Coordinated rolling upgrades and slow OSD reweights",
    version,
    propagate_version = true
)]
struct Cli {
    /// Configuration file (default: /etc/cephroll/cephroll.toml if present).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// This node's identity in the roster. Overrides node.name and the hostname.
    #[arg(long, global = true)]
    node: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Take this node's turn in a cluster-wide rolling upgrade.
    Roll {
        /// Daemon family: mon or osd.
        kind: OperationKind,
        /// Target release, e.g. jewel.
        version: String,
        /// Currently installed release. Checked against the upgrade paths.
        #[arg(long)]
        from: Option<String>,
        /// Package source to derive the current release from
        /// (e.g. cloud:trusty-liberty).
        #[arg(long, conflicts_with = "from")]
        source: Option<String>,
    },
    /// Move an OSD's CRUSH weight to a target in small steps.
    Reweight {
        /// OSD id, as 3 or osd.3.
        osd: OsdId,
        /// Target CRUSH weight.
        target: f64,
        /// Largest change per step.
        #[arg(long)]
        step: f64,
        /// Overall budget in seconds.
        #[arg(long, default_value = "3600")]
        timeout: u64,
        /// Budget in seconds for each wait on cluster health.
        #[arg(long, default_value = "600")]
        step_timeout: u64,
    },
    /// Classify current cluster health.
    Health,
    /// Monitoring check over `ceph status`. Exits 0/1/2/3.
    CheckStatus {
        /// Read a status document written by a collector instead of
        /// querying the cluster.
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// List supported release upgrades.
    UpgradePaths {
        /// Also resolve the release a package source provides.
        #[arg(long)]
        source: Option<String>,
    },
    /// Show hand-off markers for every roster member.
    Markers {
        kind: OperationKind,
        version: String,
    },
    /// Print the effective configuration.
    Config,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,cephroll=debug"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let ctx = Context::load(cli.config.as_deref(), cli.node)?;

    let code = match cli.command {
        Command::Roll {
            kind,
            version,
            from,
            source,
        } => commands::roll::run(&ctx, kind, &version, from, source.as_deref()).await?,
        Command::Reweight {
            osd,
            target,
            step,
            timeout,
            step_timeout,
        } => commands::reweight::run(&ctx, osd, target, step, timeout, step_timeout).await?,
        Command::Health => commands::health::run(&ctx).await?,
        Command::CheckStatus { file } => commands::status::run(&ctx, file.as_deref()).await,
        Command::UpgradePaths { source } => commands::paths::run(&ctx, source.as_deref()),
        Command::Markers { kind, version } => commands::markers::run(&ctx, kind, &version).await?,
        Command::Config => {
            print!("{}", ctx.config.to_toml_string()?);
            0
        }
    };

    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
