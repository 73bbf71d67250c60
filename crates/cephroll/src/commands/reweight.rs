use std::time::Duration;

use tracing::{error, info};

use cephroll_core::OsdId;
use cephroll_rollout::{SlowReweightController, TerminalStatus};

use crate::context::Context;

pub async fn run(
    ctx: &Context,
    osd: OsdId,
    target: f64,
    step: f64,
    timeout_secs: u64,
    step_timeout_secs: u64,
) -> anyhow::Result<i32> {
    let controller = SlowReweightController::new(ctx.client(), ctx.clock.clone())
        .with_gate(ctx.health_gate())
        .with_config(&ctx.config.reweight);

    let result = controller
        .reweight_slowly(
            osd,
            target,
            step,
            Duration::from_secs(timeout_secs),
            Duration::from_secs(step_timeout_secs),
        )
        .await;
    let status = TerminalStatus::from_result(&result, TerminalStatus::Converged);
    match &result {
        Ok(report) => super::print_json(report)?,
        Err(e) => error!(%osd, error = %e, "reweight {status}"),
    }
    info!(%osd, target, %status, "reweight finished");
    Ok(status.exit_code())
}
