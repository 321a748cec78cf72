//! Process-wide `tracing` subscriber.

use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

/// Directive used when neither `STOREFRONT_LOG` nor `RUST_LOG` is set.
pub const DEFAULT_FILTER: &str = "storefront=info,tower_http=info";
const LOG_ENV: &str = "STOREFRONT_LOG";

static INIT: OnceCell<()> = OnceCell::new();

/// Installs the fmt subscriber once. Repeat calls are no-ops, as is a call made after another
/// global subscriber was installed.
pub fn init_tracing() {
    INIT.get_or_init(|| {
        let _ = fmt()
            .with_env_filter(log_filter())
            .with_target(false)
            .try_init();
    });
}

fn log_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}
