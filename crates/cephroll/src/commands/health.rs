use tracing::error;

use crate::context::Context;

/// Exit 0 when idle, 1 while data is moving, 2 when the cluster is unstable.
pub async fn run(ctx: &Context) -> anyhow::Result<i32> {
    match ctx.health_gate().classify().await {
        Ok(state) => {
            println!("{state}");
            Ok(if state.is_busy() { 1 } else { 0 })
        }
        Err(cephroll_health::HealthError::Unstable { summary }) => {
            println!("unstable: {}", summary.join("; "));
            Ok(2)
        }
        Err(e) => {
            error!(error = %e, "health query failed");
            Err(e.into())
        }
    }
}
