//! Logging setup via tracing-subscriber.
//!
//! Agent answers are printed to stdout, so log lines always go to stderr.
//! Call [`init`] once, after the config is loaded.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::error::AppError;

const CRATE_TARGET: &str = env!("CARGO_CRATE_NAME");

/// HTTP and HTML-parsing internals are noisy at info and below.
const QUIET_DEPENDENCIES: &str = "hyper_util=warn,reqwest=warn,rustls=warn,html5ever=warn";

/// Install the global subscriber.
pub fn init(level: &str, verbose: bool) -> Result<(), AppError> {
    let filter = build_filter(level, verbose)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .try_init()
        .map_err(|e| AppError::Logger(format!("failed to set subscriber: {e}")))?;

    Ok(())
}

/// `verbose` turns on debug output for this crate only and ignores `RUST_LOG`.
/// Otherwise `RUST_LOG` wins when set, and the configured `level` applies.
pub fn build_filter(level: &str, verbose: bool) -> Result<EnvFilter, AppError> {
    if verbose {
        return directives(&format!("warn,{CRATE_TARGET}=debug"));
    }
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let level = parse_level(level)?;
    directives(&format!("{level},{QUIET_DEPENDENCIES}"))
}

fn directives(spec: &str) -> Result<EnvFilter, AppError> {
    EnvFilter::try_new(spec).map_err(|e| AppError::Logger(format!("invalid filter '{spec}': {e}")))
}

/// Parse a config log level (`error` … `trace`, or `off`).
pub fn parse_level(level: &str) -> Result<LevelFilter, AppError> {
    let level = level.trim();
    if level.is_empty() {
        return Err(AppError::Logger("log level must not be empty".into()));
    }
    level
        .parse::<LevelFilter>()
        .map_err(|_| AppError::Logger(format!("unrecognised log level: '{level}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_levels_parse() {
        for l in ["error", "warn", "info", "debug", "trace", " INFO "] {
            assert!(parse_level(l).is_ok(), "expected '{l}' to be valid");
        }
        assert!(parse_level("verbose").is_err());
        assert!(parse_level("  ").is_err());
    }

    #[test]
    fn verbose_targets_this_crate() {
        let filter = build_filter("error", true).unwrap().to_string();
        assert!(filter.contains(&format!("{CRATE_TARGET}=debug")), "{filter}");
    }

    #[test]
    fn configured_level_quiets_http_stack() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let filter = build_filter("debug", false).unwrap().to_string();
        assert!(filter.contains("reqwest=warn"), "{filter}");
        assert!(build_filter("loud", false).is_err());
    }

    #[test]
    fn second_init_reports_existing_subscriber() {
        let _ = init("info", false);
        match init("info", false) {
            Err(AppError::Logger(msg)) => assert!(msg.contains("set subscriber")),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
