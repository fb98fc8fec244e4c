//! Logging initialization

use anyhow::{anyhow, Result};
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::cli::args::{Cli, LogFormat};

/// Level implied by `-q` and the `-v` count.
pub const fn level(quiet: bool, verbose: u8) -> Level {
    if quiet {
        return Level::ERROR;
    }
    match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialize logging to stderr. `RUST_LOG` overrides the flag-derived level.
pub fn init(cli: &Cli) -> Result<()> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(level(cli.quiet, cli.verbose).into())
        .from_env_lossy();

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match cli.log_format {
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(cli.verbose >= 2),
            )
            .try_init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    };

    result.map_err(|e| anyhow!("failed to initialise logging: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_wins_over_verbosity() {
        assert_eq!(level(true, 0), Level::ERROR);
        assert_eq!(level(false, 0), Level::INFO);
        assert_eq!(level(false, 1), Level::DEBUG);
        assert_eq!(level(false, 5), Level::TRACE);
    }
}
