use std::sync::Arc;

use tracing::{error, info};

use cephroll_core::OperationKind;
use cephroll_core::release::resolve_ceph_release;
use cephroll_rollout::{RollingUpgradeCoordinator, TerminalStatus};

use crate::context::Context;

pub async fn run(
    ctx: &Context,
    kind: OperationKind,
    version: &str,
    from: Option<String>,
    source: Option<&str>,
) -> anyhow::Result<i32> {
    let from = match (from, source) {
        (Some(from), _) => Some(from),
        (None, Some(source)) => {
            let release = resolve_ceph_release(source)
                .ok_or_else(|| anyhow::anyhow!("no known ceph release for source {source:?}"))?;
            info!(%source, %release, "resolved current release from package source");
            Some(release.to_string())
        }
        (None, None) => None,
    };

    let node = ctx.node()?;
    let coordinator = RollingUpgradeCoordinator::new(
        node,
        ctx.client(),
        ctx.store()?,
        Arc::new(ctx.upgrade_action()?),
        ctx.clock.clone(),
    )
    .with_config(ctx.config.rolling.clone())
    .with_upgrade_paths(ctx.config.upgrade_paths())
    .with_health_gate(ctx.health_gate());

    let result = match &from {
        Some(from) => coordinator.roll_cluster_from(from, version, kind).await,
        None => coordinator.roll_cluster(version, kind).await,
    };
    let status = TerminalStatus::from_result(&result, TerminalStatus::Done);
    match &result {
        Ok(report) => super::print_json(report)?,
        Err(e) => error!(node = %coordinator.node(), error = %e, "rolling upgrade {status}"),
    }
    info!(node = %coordinator.node(), %kind, %version, %status, "rolling upgrade finished");
    Ok(status.exit_code())
}
