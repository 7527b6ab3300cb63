//! Tracing initialization and configuration.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::constants::{DEFAULT_LOG_DIRECTIVE, LOG_ENV_VAR};

static INIT: Once = Once::new();

/// Initialize the Orator tracing/logging system.
///
/// Reads `ORATOR_LOG` for per-target log levels, e.g.
/// `ORATOR_LOG=orator_clustering=debug,orator_evaluation=info`.
/// Falls back to `orator=info` when unset or invalid.
///
/// Idempotent: later calls are no-ops.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVE));

        // Another subscriber may already be installed by the host application.
        let _ = tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_line_number(true))
            .with(filter)
            .try_init();
    });
}
