//! Monitoring status check over a full `ceph status` document.
//!
//! Verdicts follow the usual monitoring-plugin convention so the binary can
//! hand them straight to a check runner as exit codes.

use std::fmt;
use std::path::Path;
use std::time::{Duration, SystemTime};

use tracing::debug;

use cephroll_cluster::{ClusterStatus, model};
use cephroll_core::config::StatusConfig;

use crate::patterns::is_operational;

/// Outcome of a status check, carrying the line to print.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusVerdict {
    Ok(String),
    Warning(String),
    Critical(String),
    Unknown(String),
}

impl StatusVerdict {
    /// Monitoring-plugin exit code: 0 OK, 1 WARNING, 2 CRITICAL, 3 UNKNOWN.
    pub fn exit_code(&self) -> i32 {
        match self {
            StatusVerdict::Ok(_) => 0,
            StatusVerdict::Warning(_) => 1,
            StatusVerdict::Critical(_) => 2,
            StatusVerdict::Unknown(_) => 3,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            StatusVerdict::Ok(m)
            | StatusVerdict::Warning(m)
            | StatusVerdict::Critical(m)
            | StatusVerdict::Unknown(m) => m,
        }
    }
}

impl fmt::Display for StatusVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Object ratios above which a WARN cluster is reported critical.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusThresholds {
    pub degraded: f64,
    pub misplaced: f64,
}

impl Default for StatusThresholds {
    fn default() -> Self {
        Self {
            degraded: 0.1,
            misplaced: 0.1,
        }
    }
}

impl From<&StatusConfig> for StatusThresholds {
    fn from(config: &StatusConfig) -> Self {
        Self {
            degraded: config.degraded_thresh,
            misplaced: config.misplaced_thresh,
        }
    }
}

/// Judge a parsed status document.
///
/// HEALTH_ERR is always critical. On WARN, summary lines that only describe
/// ordinary data movement are tolerated as long as the degraded and
/// misplaced ratios stay within their thresholds.
pub fn check_status(status: &ClusterStatus, thresholds: &StatusThresholds) -> StatusVerdict {
    let (Some(health), Some(pgmap), true, true) = (
        status.health.as_ref(),
        status.pgmap.as_ref(),
        status.has_monmap,
        status.has_osdmap,
    ) else {
        return StatusVerdict::Unknown("UNKNOWN: status data is incomplete".into());
    };

    let overall = health.overall_status.as_str();
    if overall == "HEALTH_OK" {
        return StatusVerdict::Ok("All OK".into());
    }

    let degraded = pgmap.degraded_ratio.unwrap_or(0.0);
    let misplaced = pgmap.misplaced_ratio.unwrap_or(0.0);

    let unexpected: Vec<&str> = health
        .summary
        .iter()
        .map(String::as_str)
        .filter(|line| !is_operational(line))
        .collect();
    let over_threshold = degraded > thresholds.degraded || misplaced > thresholds.misplaced;
    debug!(
        %overall,
        unexpected = unexpected.len(),
        degraded,
        misplaced,
        "evaluating cluster status"
    );

    if overall == "HEALTH_ERR" || !unexpected.is_empty() || over_threshold {
        let mut detail = vec![overall];
        detail.extend(health.summary.iter().map(String::as_str));
        return StatusVerdict::Critical(format!(
            "CRITICAL: ceph health: \"{}\"",
            detail.join(" ")
        ));
    }

    if overall == "HEALTH_WARN" {
        return StatusVerdict::Warning(format!(
            "WARNING: ceph misplaced {:.2}%, degraded {:.2}%",
            misplaced * 100.0,
            degraded * 100.0
        ));
    }

    StatusVerdict::Unknown(format!("UNKNOWN: unrecognised health status {overall:?}"))
}

/// Judge a status document written to disk by a periodic collector.
///
/// A file older than `max_age`, unreadable, or not a status document is
/// `Unknown` rather than an error: the check itself must always answer.
pub fn check_status_file(
    path: &Path,
    max_age: Duration,
    thresholds: &StatusThresholds,
) -> StatusVerdict {
    let modified = match std::fs::metadata(path).and_then(|m| m.modified()) {
        Ok(t) => t,
        Err(e) => {
            return StatusVerdict::Unknown(format!(
                "UNKNOWN: cannot stat {}: {e}",
                path.display()
            ));
        }
    };
    let age = SystemTime::now()
        .duration_since(modified)
        .unwrap_or_default();
    if age > max_age {
        return StatusVerdict::Unknown(format!(
            "UNKNOWN: status file {} is {}s old (limit {}s)",
            path.display(),
            age.as_secs(),
            max_age.as_secs()
        ));
    }

    let text = match std::fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) => {
            return StatusVerdict::Unknown(format!(
                "UNKNOWN: cannot read {}: {e}",
                path.display()
            ));
        }
    };
    match model::parse_status(&text) {
        Ok(status) => check_status(&status, thresholds),
        Err(e) => StatusVerdict::Unknown(format!("UNKNOWN: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cephroll_cluster::{PgMapRatios, StatusHealth};

    fn status(overall: &str, summary: &[&str], degraded: f64, misplaced: f64) -> ClusterStatus {
        ClusterStatus {
            health: Some(StatusHealth {
                overall_status: overall.into(),
                summary: summary.iter().map(|s| s.to_string()).collect(),
            }),
            has_monmap: true,
            has_osdmap: true,
            pgmap: Some(PgMapRatios {
                degraded_ratio: Some(degraded),
                misplaced_ratio: Some(misplaced),
            }),
        }
    }

    #[test]
    fn healthy_cluster_is_ok() {
        let verdict = check_status(&status("HEALTH_OK", &[], 0.0, 0.0), &StatusThresholds::default());
        assert_eq!(verdict, StatusVerdict::Ok("All OK".into()));
        assert_eq!(verdict.exit_code(), 0);
    }

    #[test]
    fn operational_warn_within_thresholds_is_warning() {
        let s = status(
            "HEALTH_WARN",
            &["12 pgs backfill_wait", "recovery 200/9000 objects misplaced"],
            0.01,
            0.022,
        );
        let verdict = check_status(&s, &StatusThresholds::default());
        assert_eq!(verdict.exit_code(), 1);
        assert_eq!(verdict.message(), "WARNING: ceph misplaced 2.20%, degraded 1.00%");
    }

    #[test]
    fn unexpected_line_is_critical() {
        let s = status("HEALTH_WARN", &["1 mons down, quorum 0,1 a,b"], 0.0, 0.0);
        let verdict = check_status(&s, &StatusThresholds::default());
        assert_eq!(
            verdict,
            StatusVerdict::Critical(
                "CRITICAL: ceph health: \"HEALTH_WARN 1 mons down, quorum 0,1 a,b\"".into()
            )
        );
    }

    #[test]
    fn ratio_over_threshold_is_critical() {
        let s = status("HEALTH_WARN", &["40 pgs degraded"], 0.25, 0.0);
        assert_eq!(check_status(&s, &StatusThresholds::default()).exit_code(), 2);

        let lenient = StatusThresholds { degraded: 0.5, misplaced: 0.5 };
        assert_eq!(check_status(&s, &lenient).exit_code(), 1);
    }

    #[test]
    fn health_err_is_always_critical() {
        let s = status("HEALTH_ERR", &["3 pgs degraded"], 0.0, 0.0);
        assert_eq!(check_status(&s, &StatusThresholds::default()).exit_code(), 2);
    }

    #[test]
    fn missing_sections_are_unknown() {
        let mut s = status("HEALTH_OK", &[], 0.0, 0.0);
        s.has_osdmap = false;
        assert_eq!(check_status(&s, &StatusThresholds::default()).exit_code(), 3);
        assert_eq!(
            check_status(&ClusterStatus::default(), &StatusThresholds::default()).exit_code(),
            3
        );
    }

    #[test]
    fn fresh_status_file_is_checked() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cephstatus.json");
        std::fs::write(
            &path,
            r#"{"health": {"overall_status": "HEALTH_OK", "summary": []},
                "monmap": {}, "osdmap": {}, "pgmap": {}}"#,
        )
        .unwrap();
        let verdict =
            check_status_file(&path, Duration::from_secs(3600), &StatusThresholds::default());
        assert_eq!(verdict.exit_code(), 0);
    }

    #[test]
    fn stale_or_missing_file_is_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cephstatus.json");
        let file = std::fs::File::create(&path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(7200))
            .unwrap();
        drop(file);
        let stale =
            check_status_file(&path, Duration::from_secs(3600), &StatusThresholds::default());
        assert!(stale.message().contains("old"), "{stale}");
        assert_eq!(stale.exit_code(), 3);

        let missing = check_status_file(
            &dir.path().join("absent.json"),
            Duration::from_secs(3600),
            &StatusThresholds::default(),
        );
        assert_eq!(missing.exit_code(), 3);
    }

    #[test]
    fn garbage_file_is_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cephstatus.json");
        std::fs::write(&path, "not json").unwrap();
        let verdict =
            check_status_file(&path, Duration::from_secs(3600), &StatusThresholds::default());
        assert_eq!(verdict.exit_code(), 3);
    }
}
