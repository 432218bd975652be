//! Telemetry initialization (tracing/tracing-subscriber).
//!
//! Behavior:
//! - LOG_LEVEL controls the filter (e.g. "debug" or full directives).
//! - LOG_FORMAT selects "pretty" (default) or "json" structured logs.
//!
//! Targets in use: `progress` (completions, resets, badges), `feedback` (model
//! calls) and `counsel_backend` (startup, config, request failures).

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,progress=debug,feedback=debug,counsel_backend=debug,tower_http=info,axum=info";

/// Parse directives, falling back to the default set when absent or malformed.
fn build_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .filter(|d| !d.trim().is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

pub fn init_tracing() {
    let directives = std::env::var("LOG_LEVEL").ok();
    let builder = tracing_subscriber::fmt()
        .with_env_filter(build_filter(directives.as_deref()))
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    // A second init (tests, embedding) is a no-op rather than a panic.
    let _ = match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => builder.json().try_init(),
        _ => builder.try_init(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_or_missing_directives_use_default() {
        assert_eq!(build_filter(None).to_string(), EnvFilter::new(DEFAULT_FILTER).to_string());
        assert_eq!(build_filter(Some("  ")).to_string(), EnvFilter::new(DEFAULT_FILTER).to_string());
    }

    #[test]
    fn explicit_directives_are_kept() {
        assert_eq!(build_filter(Some("warn")).to_string(), "warn");
    }
}
