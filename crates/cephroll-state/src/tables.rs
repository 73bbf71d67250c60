//! redb table definitions for the hand-off store.

use redb::TableDefinition;

/// Coordination markers keyed by `{kind}_{node}_{version}_{start|done}`,
/// valued by the timestamp the marker was written.
pub const MARKERS: TableDefinition<&str, &str> = TableDefinition::new("markers");
