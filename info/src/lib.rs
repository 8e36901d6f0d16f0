//! Build information stamped into every log line.

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const REVISION: Option<&str> = option_env!("JOURNAL_REVISION");

pub const BUILD_TIMESTAMP: Option<&str> = option_env!("JOURNAL_BUILD_TIMESTAMP");

/// Describes the build in one line, for `--version`-style output.
pub fn describe() -> String {
    match (REVISION, BUILD_TIMESTAMP) {
        (Some(revision), Some(timestamp)) => format!("{} ({}, built {})", VERSION, revision, timestamp),
        (Some(revision), None) => format!("{} ({})", VERSION, revision),
        _ => VERSION.to_owned(),
    }
}
