//! Structured logging setup, mirroring how the `otlp2parquet` root crate's
//! `init.rs` installs a global `tracing-subscriber` once at the binary entry
//! point; library crates never call `tracing_subscriber` themselves.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global tracing subscriber. `debug` (typically sourced from
/// `EB_DEBUG`) sets the default level to `debug`; `RUST_LOG` overrides it
/// when set. Idempotent: a second call is a harmless no-op.
pub fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer())
        .try_init();
}
