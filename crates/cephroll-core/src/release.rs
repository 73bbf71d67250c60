//! Ceph release upgrade paths and Cloud Archive codename resolution.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Supported single-hop release upgrades, `from -> to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UpgradePaths(BTreeMap<String, String>);

impl Default for UpgradePaths {
    fn default() -> Self {
        let mut paths = BTreeMap::new();
        paths.insert("firefly".to_string(), "hammer".to_string());
        paths.insert("hammer".to_string(), "jewel".to_string());
        Self(paths)
    }
}

impl UpgradePaths {
    /// Merge additional paths over the defaults.
    pub fn with_overrides(mut self, extra: &BTreeMap<String, String>) -> Self {
        for (from, to) in extra {
            self.0.insert(from.clone(), to.clone());
        }
        self
    }

    /// Whether `from -> to` is a supported upgrade.
    pub fn is_valid(&self, from: &str, to: &str) -> bool {
        self.0.get(from).is_some_and(|next| next == to)
    }

    /// The release that follows `from`, if any.
    pub fn next(&self, from: &str) -> Option<&str> {
        self.0.get(from).map(String::as_str)
    }

    /// Human-readable `from -> to` lines.
    pub fn lines(&self) -> Vec<String> {
        self.0
            .iter()
            .map(|(from, to)| format!("{from} -> {to}"))
            .collect()
    }
}

/// Map an Ubuntu Cloud Archive OpenStack codename to its Ceph release.
pub fn ceph_release_for_openstack(codename: &str) -> Option<&'static str> {
    match codename {
        "icehouse" | "juno" => Some("firefly"),
        "kilo" | "liberty" => Some("hammer"),
        "mitaka" => Some("jewel"),
        _ => None,
    }
}

/// Resolve a Ceph release from a package source string.
///
/// Understands `cloud:<series>-<openstack>[/<pocket>]` sources and bare
/// OpenStack codenames. `distro` and unknown sources resolve to `None`.
pub fn resolve_ceph_release(source: &str) -> Option<&'static str> {
    let source = source.trim();
    let codename = match source.strip_prefix("cloud:") {
        Some(rest) => {
            let rest = rest.split('/').next().unwrap_or(rest);
            rest.rsplit('-').next().unwrap_or(rest)
        }
        None => source,
    };
    ceph_release_for_openstack(codename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_paths() {
        let paths = UpgradePaths::default();
        assert!(paths.is_valid("firefly", "hammer"));
        assert!(paths.is_valid("hammer", "jewel"));
        assert!(!paths.is_valid("firefly", "jewel"));
        assert!(!paths.is_valid("jewel", "hammer"));
        assert_eq!(paths.next("hammer"), Some("jewel"));
        assert_eq!(
            paths.lines(),
            vec!["firefly -> hammer".to_string(), "hammer -> jewel".to_string()]
        );
    }

    #[test]
    fn overrides_extend_paths() {
        let mut extra = BTreeMap::new();
        extra.insert("jewel".to_string(), "luminous".to_string());
        let paths = UpgradePaths::default().with_overrides(&extra);
        assert!(paths.is_valid("jewel", "luminous"));
        assert!(paths.is_valid("hammer", "jewel"));
    }

    #[test]
    fn resolves_cloud_archive_sources() {
        assert_eq!(resolve_ceph_release("cloud:trusty-mitaka"), Some("jewel"));
        assert_eq!(
            resolve_ceph_release("cloud:trusty-liberty/updates"),
            Some("hammer")
        );
        assert_eq!(resolve_ceph_release("juno"), Some("firefly"));
        assert_eq!(resolve_ceph_release("distro"), None);
        assert_eq!(resolve_ceph_release("cloud:xenial-ocata"), None);
    }
}
