//! # Structured Logging
//!
//! One `tracing` subscriber for the whole process: an `EnvFilter` taken from
//! `RUST_LOG` (or the node's default directives) over a single formatting
//! layer chosen at startup. Output goes to stderr; stdout is reserved for
//! the `version` subcommand.
//!
//! Committed ledger operations log at `debug`, rejected ones at `warn`:
//!
//! ```text
//! RUST_LOG=bank_token_node=debug,bank_token=debug,tower_http=info
//! ```

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

/// Directives used when `RUST_LOG` is unset.
pub const DEFAULT_DIRECTIVES: &str = "bank_token_node=info,bank_token=info,tower_http=debug";

/// Log line format, selected with `--log-format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines with source locations.
    #[default]
    Pretty,
    /// One JSON object per line, for log aggregation.
    Json,
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

fn format_layer(format: LogFormat) -> BoxedLayer {
    let layer = fmt::layer().with_writer(std::io::stderr).with_target(true);
    match format {
        LogFormat::Pretty => layer.with_file(true).with_line_number(true).boxed(),
        LogFormat::Json => layer.json().boxed(),
    }
}

/// Resolves the filter: `RUST_LOG` wins, `fallback` applies otherwise.
pub fn env_filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// Installs the global subscriber. Fails if one is already installed.
pub fn init_logging(format: LogFormat) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(format_layer(format))
        .with(env_filter(DEFAULT_DIRECTIVES))
        .try_init()?;

    tracing::info!(?format, "logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::ValueEnum;

    #[test]
    fn formats_parse_by_name() {
        assert_eq!(LogFormat::from_str("json", true).unwrap(), LogFormat::Json);
        assert_eq!(LogFormat::from_str("Pretty", true).unwrap(), LogFormat::Pretty);
        assert!(LogFormat::from_str("xml", true).is_err());
    }

    #[test]
    fn second_install_is_an_error() {
        let _ = init_logging(LogFormat::Json);
        assert!(init_logging(LogFormat::Pretty).is_err());
    }
}
