//! Logging setup
//!
//! Logs go to stderr so stdout carries only command output.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: filter directives (default: `falqueue=info`)
//! - `FALQUEUE_LOG_FORMAT`: `pretty` (default) or `json`

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "falqueue=info";

pub fn init_logging(verbose: bool) {
    let log_format = std::env::var("FALQUEUE_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = if verbose {
        EnvFilter::new("falqueue=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    };

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }
}
