use std::path::Path;
use std::time::Duration;

use cephroll_cluster::ClusterInfoClient;
use cephroll_health::{StatusThresholds, StatusVerdict, check_status, check_status_file};

use crate::context::Context;

/// Print the verdict and return its monitoring exit code. Never fails:
/// anything that prevents a judgement is UNKNOWN.
pub async fn run(ctx: &Context, file: Option<&Path>) -> i32 {
    let thresholds = StatusThresholds::from(&ctx.config.status);
    let verdict = match file {
        Some(path) => check_status_file(
            path,
            Duration::from_secs(ctx.config.status.max_file_age_secs),
            &thresholds,
        ),
        None => match ctx.client().cluster_status().await {
            Ok(status) => check_status(&status, &thresholds),
            Err(e) => StatusVerdict::Unknown(format!("UNKNOWN: {e}")),
        },
    };
    println!("{verdict}");
    verdict.exit_code()
}
