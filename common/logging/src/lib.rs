//! Two `slog` loggers: the default structured logger used throughout the
//! process, and a "plain" logger reserved for forwarding the validator
//! child's own stdout so its formatted output stays legible in aggregated
//! logs instead of being wrapped in another layer of decoration.
//!
//! Grounded on the teacher's `slog` + `slog-term` + `slog-async` drain chain
//! (`account_manager` and `beacon_node/client` both depend on exactly this
//! trio for their logger construction).

use slog::{o, Drain, Level, Logger, OwnedKVList, Record};
use std::fmt::Write as _;

/// Parses a log level string, silently mapping anything unrecognised to
/// `info` per the CLI contract.
pub fn parse_level(raw: &str) -> Level {
    match raw.to_ascii_lowercase().as_str() {
        "debug" => Level::Debug,
        "warn" | "warning" => Level::Warning,
        "error" => Level::Error,
        _ => Level::Info,
    }
}

/// Resolves the effective log level: CLI flag, then `LOG_LEVEL` env var,
/// then `info`.
pub fn resolve_level(flag: Option<&str>) -> Level {
    if let Some(flag) = flag {
        return parse_level(flag);
    }
    match std::env::var("LOG_LEVEL") {
        Ok(raw) => parse_level(&raw),
        Err(_) => Level::Info,
    }
}

/// Builds the process' default structured logger: a terminal-decorated,
/// level-filtered, asynchronous drain.
pub fn build_structured_logger(level: Level) -> Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog::LevelFilter::new(drain, level).fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    Logger::root(drain, o!())
}

/// A drain that writes only `<prefix><message>`, with no timestamp, level
/// or key-value decoration. Used exclusively to pass the validator child's
/// own stdout lines through to the aggregated log stream verbatim.
struct PlainDrain {
    prefix: String,
}

impl Drain for PlainDrain {
    type Ok = ();
    type Err = slog::Never;

    fn log(&self, record: &Record, _values: &OwnedKVList) -> Result<Self::Ok, Self::Err> {
        let mut line = String::new();
        let _ = write!(line, "{}{}", self.prefix, record.msg());
        println!("{}", line);
        Ok(())
    }
}

/// Builds the plain, prefix-only logger for child stdout pass-through.
pub fn build_plain_logger(prefix: impl Into<String>) -> Logger {
    let drain = PlainDrain {
        prefix: prefix.into(),
    };
    let drain = slog_async::Async::new(drain.fuse()).build().fuse();
    Logger::root(drain, o!())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_level_maps_to_info() {
        assert!(matches!(parse_level("trace"), Level::Info));
        assert!(matches!(parse_level("nonsense"), Level::Info));
        assert!(matches!(parse_level("DEBUG"), Level::Debug));
    }

    #[test]
    fn flag_takes_precedence_over_env() {
        std::env::set_var("LOG_LEVEL", "error");
        assert!(matches!(resolve_level(Some("debug")), Level::Debug));
        std::env::remove_var("LOG_LEVEL");
    }
}
