//! Shared types used across cephroll crates.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of a cluster member: a hostname, or an OSD id rendered as a string.
///
/// Ordering is plain lexicographic byte order over the name, which is what
/// every participant uses to derive the same upgrade order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeIdentity(String);

impl NodeIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeIdentity {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeIdentity {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Which daemon family an operation applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Mon,
    Osd,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Mon => "mon",
            OperationKind::Osd => "osd",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown operation kind: {0} (expected mon or osd)")]
pub struct UnknownKind(pub String);

impl FromStr for OperationKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mon" => Ok(OperationKind::Mon),
            "osd" => Ok(OperationKind::Osd),
            other => Err(UnknownKind(other.to_string())),
        }
    }
}

/// Numeric OSD id. Parses from `3` or `osd.3`; displays as `osd.3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OsdId(pub u32);

impl OsdId {
    pub fn num(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for OsdId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "osd.{}", self.0)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid osd id: {0} (expected N or osd.N)")]
pub struct InvalidOsdId(pub String);

impl FromStr for OsdId {
    type Err = InvalidOsdId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix("osd.").unwrap_or(trimmed);
        digits
            .parse::<u32>()
            .map(OsdId)
            .map_err(|_| InvalidOsdId(s.to_string()))
    }
}

/// Which of the two hand-off markers a key refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Start,
    Done,
}

impl Marker {
    pub fn suffix(&self) -> &'static str {
        match self {
            Marker::Start => "start",
            Marker::Done => "done",
        }
    }
}

/// Identifies one node's participation in one upgrade.
///
/// Rendered into store keys as `{kind}_{node}_{version}_{start|done}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandoffKey {
    pub kind: OperationKind,
    pub node: NodeIdentity,
    pub version: String,
}

impl HandoffKey {
    pub fn new(kind: OperationKind, node: NodeIdentity, version: &str) -> Self {
        Self {
            kind,
            node,
            version: version.to_string(),
        }
    }

    /// Store key for the given marker.
    pub fn marker(&self, marker: Marker) -> String {
        format!(
            "{}_{}_{}_{}",
            self.kind,
            self.node,
            self.version,
            marker.suffix()
        )
    }

    pub fn start_key(&self) -> String {
        self.marker(Marker::Start)
    }

    pub fn done_key(&self) -> String {
        self.marker(Marker::Done)
    }
}

/// Build a roster from an unsorted member list.
///
/// Sorted lexicographically with duplicates removed, so that every node
/// computes the same order from the same membership.
pub fn sorted_roster<I>(members: I) -> Vec<NodeIdentity>
where
    I: IntoIterator<Item = NodeIdentity>,
{
    let mut roster: Vec<NodeIdentity> = members.into_iter().collect();
    roster.sort();
    roster.dedup();
    roster
}

/// Position of `node` in a sorted roster, by identity equality.
pub fn roster_position(roster: &[NodeIdentity], node: &NodeIdentity) -> Option<usize> {
    roster.iter().position(|n| n == node)
}

/// Render a timestamp marker value (fractional Unix seconds).
pub fn format_timestamp(epoch_secs: f64) -> String {
    format!("{epoch_secs:.6}")
}

/// Parse a timestamp marker value. Accepts integer or fractional seconds.
pub fn parse_timestamp(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<NodeIdentity> {
        names.iter().map(|n| NodeIdentity::from(*n)).collect()
    }

    #[test]
    fn roster_is_independent_of_arrival_order() {
        let a = sorted_roster(ids(&["c", "a", "b"]));
        let b = sorted_roster(ids(&["b", "c", "a"]));
        assert_eq!(a, b);
        assert_eq!(a, ids(&["a", "b", "c"]));
        assert_eq!(roster_position(&a, &"b".into()), Some(1));
    }

    #[test]
    fn roster_uses_lexicographic_order() {
        let roster = sorted_roster(ids(&["osd-10", "osd-9", "osd-1"]));
        assert_eq!(roster, ids(&["osd-1", "osd-10", "osd-9"]));
    }

    #[test]
    fn roster_collapses_duplicates() {
        let roster = sorted_roster(ids(&["b", "a", "b"]));
        assert_eq!(roster, ids(&["a", "b"]));
    }

    #[test]
    fn missing_node_has_no_position() {
        let roster = sorted_roster(ids(&["a", "b"]));
        assert_eq!(roster_position(&roster, &"z".into()), None);
    }

    #[test]
    fn handoff_key_format() {
        let key = HandoffKey::new(OperationKind::Osd, "host-a".into(), "jewel");
        assert_eq!(key.start_key(), "osd_host-a_jewel_start");
        assert_eq!(key.done_key(), "osd_host-a_jewel_done");
    }

    #[test]
    fn operation_kind_parses() {
        assert_eq!("mon".parse::<OperationKind>(), Ok(OperationKind::Mon));
        assert_eq!(" OSD ".parse::<OperationKind>(), Ok(OperationKind::Osd));
        assert!("mds".parse::<OperationKind>().is_err());
    }

    #[test]
    fn osd_id_parses_both_forms() {
        assert_eq!("3".parse::<OsdId>(), Ok(OsdId(3)));
        assert_eq!("osd.12".parse::<OsdId>(), Ok(OsdId(12)));
        assert!("osd.x".parse::<OsdId>().is_err());
        assert!("-1".parse::<OsdId>().is_err());
        assert_eq!(OsdId(7).to_string(), "osd.7");
    }

    #[test]
    fn timestamps_parse_both_forms() {
        assert_eq!(parse_timestamp("1500000000"), Some(1_500_000_000.0));
        assert_eq!(parse_timestamp(&format_timestamp(12.5)), Some(12.5));
        assert_eq!(parse_timestamp("yesterday"), None);
    }
}
