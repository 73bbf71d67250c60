//! Cluster service data model and JSON parsing.
//!
//! Parsers are pure functions over the text the `ceph` CLI prints with
//! `--format=json`, so they can be tested against captured output.

use std::fmt;

use serde::{Deserialize, Serialize};

use cephroll_core::{NodeIdentity, OsdId};

use crate::error::{ClusterError, ClusterResult};

/// Overall cluster health as reported by the monitors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverallStatus {
    Ok,
    Warn,
    Err,
}

impl OverallStatus {
    pub fn parse(raw: &str) -> ClusterResult<Self> {
        match raw {
            "HEALTH_OK" => Ok(OverallStatus::Ok),
            "HEALTH_WARN" => Ok(OverallStatus::Warn),
            "HEALTH_ERR" => Ok(OverallStatus::Err),
            other => Err(ClusterError::UnknownStatus(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OverallStatus::Ok => "HEALTH_OK",
            OverallStatus::Warn => "HEALTH_WARN",
            OverallStatus::Err => "HEALTH_ERR",
        }
    }
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Health summary: overall status plus human-readable summary lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterHealth {
    pub overall: OverallStatus,
    pub summary: Vec<String>,
}

/// Placement-group counts grouped by state name (e.g. `active+clean`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PgStats {
    pub by_state: Vec<PgStateCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PgStateCount {
    pub name: String,
    pub count: u64,
}

/// The subset of `ceph status` used by the status check.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterStatus {
    pub health: Option<StatusHealth>,
    pub has_monmap: bool,
    pub has_osdmap: bool,
    pub pgmap: Option<PgMapRatios>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusHealth {
    /// Raw status string; the status check reports it verbatim.
    pub overall_status: String,
    pub summary: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PgMapRatios {
    pub degraded_ratio: Option<f64>,
    pub misplaced_ratio: Option<f64>,
}

// ── Raw JSON shapes ────────────────────────────────────────────────

#[derive(Deserialize)]
struct RawHealth {
    overall_status: Option<String>,
    /// Newer releases report `status` and keep a deprecated `overall_status`.
    status: Option<String>,
    #[serde(default)]
    summary: Vec<RawSummary>,
}

#[derive(Deserialize)]
struct RawSummary {
    summary: String,
}

#[derive(Deserialize)]
struct RawPgStat {
    #[serde(default)]
    num_pg_by_state: Vec<RawPgState>,
}

#[derive(Deserialize)]
struct RawPgState {
    name: String,
    #[serde(default)]
    num: u64,
}

#[derive(Deserialize)]
struct RawOsdTree {
    #[serde(default)]
    nodes: Vec<RawTreeNode>,
}

#[derive(Deserialize)]
struct RawTreeNode {
    id: i64,
    name: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    children: Vec<i64>,
    crush_weight: Option<f64>,
}

#[derive(Deserialize)]
struct RawMonDump {
    #[serde(default)]
    mons: Vec<RawMon>,
}

#[derive(Deserialize)]
struct RawMon {
    name: String,
}

fn parse_json<T: serde::de::DeserializeOwned>(command: &str, text: &str) -> ClusterResult<T> {
    serde_json::from_str(text).map_err(|e| ClusterError::Parse {
        command: command.to_string(),
        reason: e.to_string(),
    })
}

fn malformed(command: &str, reason: &str) -> ClusterError {
    ClusterError::Parse {
        command: command.to_string(),
        reason: reason.to_string(),
    }
}

// ── Parsers ────────────────────────────────────────────────────────

/// Parse `ceph health --format=json`.
pub fn parse_health(text: &str) -> ClusterResult<ClusterHealth> {
    const CMD: &str = "ceph health";
    let raw: RawHealth = parse_json(CMD, text)?;
    let status = raw
        .status
        .or(raw.overall_status)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| malformed(CMD, "missing overall_status"))?;
    Ok(ClusterHealth {
        overall: OverallStatus::parse(&status)?,
        summary: raw.summary.into_iter().map(|s| s.summary).collect(),
    })
}

/// Parse `ceph pg stat --format=json`.
pub fn parse_pg_stat(text: &str) -> ClusterResult<PgStats> {
    let raw: RawPgStat = parse_json("ceph pg stat", text)?;
    Ok(PgStats {
        by_state: raw
            .num_pg_by_state
            .into_iter()
            .map(|s| PgStateCount {
                name: s.name,
                count: s.num,
            })
            .collect(),
    })
}

/// CRUSH weight of `osd` from `ceph osd tree --format=json`.
pub fn parse_osd_weight(text: &str, osd: OsdId) -> ClusterResult<f64> {
    const CMD: &str = "ceph osd tree";
    let tree: RawOsdTree = parse_json(CMD, text)?;
    let name = osd.to_string();
    let node = tree
        .nodes
        .iter()
        .find(|n| n.kind == "osd" && n.name == name)
        .ok_or_else(|| ClusterError::OsdNotFound(name.clone()))?;
    node.crush_weight
        .ok_or_else(|| malformed(CMD, &format!("{name} has no crush_weight")))
}

/// OSD upgrade roster: names of the children of the first tree node
/// (the hosts under the root bucket). Unsorted.
pub fn parse_osd_roster(text: &str) -> ClusterResult<Vec<NodeIdentity>> {
    let tree: RawOsdTree = parse_json("ceph osd tree", text)?;
    let Some(root) = tree.nodes.first() else {
        return Ok(Vec::new());
    };
    Ok(tree
        .nodes
        .iter()
        .filter(|n| root.children.contains(&n.id))
        .map(|n| NodeIdentity::new(n.name.clone()))
        .collect())
}

/// Monitor roster from `ceph mon dump --format=json`. Unsorted.
pub fn parse_mon_roster(text: &str) -> ClusterResult<Vec<NodeIdentity>> {
    let dump: RawMonDump = parse_json("ceph mon dump", text)?;
    Ok(dump
        .mons
        .into_iter()
        .map(|m| NodeIdentity::new(m.name))
        .collect())
}

/// Parse `ceph status --format=json`. Missing sections are recorded, not
/// rejected; the status check decides what to make of them.
pub fn parse_status(text: &str) -> ClusterResult<ClusterStatus> {
    let value: serde_json::Value = parse_json("ceph status", text)?;
    let Some(obj) = value.as_object() else {
        return Err(malformed("ceph status", "expected a JSON object"));
    };

    let health = obj.get("health").map(|h| StatusHealth {
        overall_status: h
            .get("status")
            .or_else(|| h.get("overall_status"))
            .and_then(|s| s.as_str())
            .unwrap_or_default()
            .to_string(),
        summary: h
            .get("summary")
            .and_then(|s| s.as_array())
            .map(|lines| {
                lines
                    .iter()
                    .filter_map(|l| l.get("summary").and_then(|s| s.as_str()))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
    });

    let pgmap = obj.get("pgmap").map(|p| PgMapRatios {
        degraded_ratio: p.get("degraded_ratio").and_then(|v| v.as_f64()),
        misplaced_ratio: p.get("misplaced_ratio").and_then(|v| v.as_f64()),
    });

    Ok(ClusterStatus {
        health,
        has_monmap: obj.contains_key("monmap"),
        has_osdmap: obj.contains_key("osdmap"),
        pgmap,
    })
}

/// Whether `ceph osd crush reweight` output acknowledges the change.
pub fn reweight_acknowledged(output: &str, osd: OsdId, weight: &str) -> bool {
    let expected = format!(
        "reweighted item id {id} name '{osd}' to {weight}",
        id = osd.num()
    );
    output.match_indices(&expected).any(|(at, _)| {
        output[at + expected.len()..]
            .chars()
            .next()
            .is_none_or(char::is_whitespace)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const OSD_TREE: &str = r#"{
        "nodes": [
            {"id": -1, "name": "default", "type": "root", "type_id": 10, "children": [-3, -2]},
            {"id": -2, "name": "stor-b", "type": "host", "type_id": 1, "children": [1]},
            {"id": 1, "name": "osd.1", "type": "osd", "type_id": 0, "crush_weight": 0.545, "status": "up"},
            {"id": -3, "name": "stor-a", "type": "host", "type_id": 1, "children": [0]},
            {"id": 0, "name": "osd.0", "type": "osd", "type_id": 0, "crush_weight": 1.0, "status": "up"}
        ],
        "stray": []
    }"#;

    #[test]
    fn parses_health_summary() {
        let health = parse_health(
            r#"{"overall_status": "HEALTH_WARN",
                "summary": [{"severity": "HEALTH_WARN", "summary": "clock skew detected on mon.b"}]}"#,
        )
        .unwrap();
        assert_eq!(health.overall, OverallStatus::Warn);
        assert_eq!(health.summary, vec!["clock skew detected on mon.b".to_string()]);
    }

    #[test]
    fn accepts_newer_status_field() {
        let health = parse_health(
            r#"{"status": "HEALTH_OK", "overall_status": "HEALTH_WARN", "checks": {}}"#,
        )
        .unwrap();
        assert_eq!(health.overall, OverallStatus::Ok);
        assert!(health.summary.is_empty());
    }

    #[test]
    fn rejects_malformed_health() {
        assert!(matches!(
            parse_health(r#"{"summary": []}"#),
            Err(ClusterError::Parse { .. })
        ));
        assert!(matches!(
            parse_health(r#"{"overall_status": "HEALTH_MAYBE"}"#),
            Err(ClusterError::UnknownStatus(_))
        ));
        assert!(parse_health("not json").is_err());
    }

    #[test]
    fn parses_pg_stat() {
        let stats = parse_pg_stat(
            r#"{"num_pg_by_state": [
                {"name": "active+clean", "num": 180},
                {"name": "active+remapped+backfilling", "num": 12}
            ], "num_pgs": 192}"#,
        )
        .unwrap();
        assert_eq!(stats.by_state.len(), 2);
        assert_eq!(stats.by_state[1].name, "active+remapped+backfilling");
        assert_eq!(stats.by_state[1].count, 12);
    }

    #[test]
    fn finds_osd_weight() {
        assert_eq!(parse_osd_weight(OSD_TREE, OsdId(1)).unwrap(), 0.545);
        assert!(matches!(
            parse_osd_weight(OSD_TREE, OsdId(9)),
            Err(ClusterError::OsdNotFound(_))
        ));
    }

    #[test]
    fn osd_roster_is_hosts_under_root() {
        let mut roster = parse_osd_roster(OSD_TREE).unwrap();
        roster.sort();
        assert_eq!(roster, vec![NodeIdentity::from("stor-a"), NodeIdentity::from("stor-b")]);
        assert!(parse_osd_roster(r#"{"nodes": []}"#).unwrap().is_empty());
    }

    #[test]
    fn parses_mon_roster() {
        let roster = parse_mon_roster(
            r#"{"epoch": 3, "fsid": "x", "mons": [
                {"rank": 0, "name": "mon-c", "addr": "10.0.0.3:6789/0"},
                {"rank": 1, "name": "mon-a", "addr": "10.0.0.1:6789/0"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(roster, vec![NodeIdentity::from("mon-c"), NodeIdentity::from("mon-a")]);
    }

    #[test]
    fn parses_status_sections() {
        let status = parse_status(
            r#"{
                "health": {"overall_status": "HEALTH_WARN",
                           "summary": [{"summary": "12 pgs backfilling"}]},
                "monmap": {}, "osdmap": {},
                "pgmap": {"degraded_ratio": 0.02, "misplaced_ratio": 0.15}
            }"#,
        )
        .unwrap();
        let health = status.health.unwrap();
        assert_eq!(health.overall_status, "HEALTH_WARN");
        assert_eq!(health.summary, vec!["12 pgs backfilling".to_string()]);
        assert!(status.has_monmap && status.has_osdmap);
        assert_eq!(status.pgmap.unwrap().misplaced_ratio, Some(0.15));
    }

    #[test]
    fn status_records_missing_sections() {
        let status = parse_status(r#"{"health": {"overall_status": "HEALTH_OK"}}"#).unwrap();
        assert!(!status.has_monmap);
        assert!(status.pgmap.is_none());
    }

    #[test]
    fn reweight_ack_matching() {
        let out = "reweighted item id 3 name 'osd.3' to 0.7 in crush map\n";
        assert!(reweight_acknowledged(out, OsdId(3), "0.7"));
        assert!(!reweight_acknowledged(out, OsdId(3), "0.8"));
        assert!(!reweight_acknowledged(out, OsdId(4), "0.7"));
        assert!(reweight_acknowledged(out.trim_end(), OsdId(3), "0.7"));
    }

    #[test]
    fn reweight_ack_rejects_longer_weight() {
        let out = "reweighted item id 3 name 'osd.3' to 0.75 in crush map\n";
        assert!(!reweight_acknowledged(out, OsdId(3), "0.7"));
        assert!(reweight_acknowledged(out, OsdId(3), "0.75"));

        let out = "reweighted item id 13 name 'osd.13' to 0.7 in crush map";
        assert!(!reweight_acknowledged(out, OsdId(1), "0.7"));
    }
}
