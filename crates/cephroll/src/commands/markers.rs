use serde::Serialize;

use cephroll_cluster::ClusterInfoClient;
use cephroll_core::{HandoffKey, Marker, NodeIdentity, OperationKind, sorted_roster};
use cephroll_state::HandoffStore;

use crate::context::Context;

#[derive(Serialize)]
struct MarkerRow {
    node: NodeIdentity,
    start: Option<f64>,
    done: Option<f64>,
}

/// Print each roster member's start and done markers, in upgrade order.
pub async fn run(ctx: &Context, kind: OperationKind, version: &str) -> anyhow::Result<i32> {
    let store = ctx.store()?;
    let roster = sorted_roster(ctx.client().roster(kind).await?);

    let mut rows = Vec::with_capacity(roster.len());
    for node in roster {
        let key = HandoffKey::new(kind, node.clone(), version);
        rows.push(MarkerRow {
            start: store.marker_timestamp(&key, Marker::Start).await?,
            done: store.marker_timestamp(&key, Marker::Done).await?,
            node,
        });
    }
    super::print_json(&rows)?;
    Ok(0)
}
