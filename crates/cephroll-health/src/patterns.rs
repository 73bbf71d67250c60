//! Status-line patterns for data movement.

use std::sync::LazyLock;

use regex::Regex;

/// PG states and summary lines that mean data is moving right now.
static DATA_MOVEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"backfill|degraded|recovery_wait|recovering|stuck unclean|recovery \d+/\d+ objects (?:degraded|misplaced)",
    )
    .expect("data movement pattern is valid")
});

/// Summary lines that describe routine operational work rather than a fault.
static OPERATIONAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:\d+ pgs (?:backfill_wait|backfilling|degraded|recovery_wait|stuck unclean)|recovery \d+/\d+ objects (?:degraded|misplaced))",
    )
    .expect("operational pattern is valid")
});

/// Whether a PG state name or health line indicates active data movement.
pub fn is_data_movement(line: &str) -> bool {
    DATA_MOVEMENT.is_match(line)
}

/// Whether a health summary line is a known operational task.
pub fn is_operational(line: &str) -> bool {
    OPERATIONAL.is_match(line)
}
