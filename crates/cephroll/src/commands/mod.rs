pub mod health;
pub mod markers;
pub mod paths;
pub mod reweight;
pub mod roll;
pub mod status;

use serde::Serialize;

/// Print a report to stdout as pretty JSON.
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
