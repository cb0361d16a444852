//! Logging setup for the CLI.
//!
//! Library modules emit `tracing` events; the binary installs one
//! subscriber at startup. Logs go to stderr so `--output json` on stdout
//! stays machine-readable.
//!
//! Level selection, first match wins:
//! 1. `--verbose`: debug for siteqa
//! 2. `--quiet`: errors only
//! 3. `RUST_LOG`
//! 4. info for siteqa

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    let filter = if verbose {
        EnvFilter::new("siteqa=debug")
    } else if quiet {
        EnvFilter::new("siteqa=error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("siteqa=info"))
    };

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color && std::env::var_os("NO_COLOR").is_none())
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
