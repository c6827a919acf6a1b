//! Tracing subscriber for hosts that embed the index.
//!
//! The index itself only emits `tracing` events tagged with the component
//! that produced them (`index`, `registry`, `resolver`, `rewrite`). Editor
//! bridges and test harnesses call [`init_with_config`] once to print them.
//!
//! ```toml
//! [logging]
//! default = "warn"
//!
//! [logging.modules]
//! "move_imports::indexing" = "debug"
//! ```
//!
//! `RUST_LOG=move_imports=trace` overrides the config.

use std::sync::OnceLock;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LoggingConfig;

/// Whether our subscriber became the global default.
static INSTALLED: OnceLock<bool> = OnceLock::new();

/// Wall-clock time with milliseconds, e.g. `14:03:27.512`.
struct ClockTime;

impl FormatTime for ClockTime {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%H:%M:%S%.3f"))
    }
}

/// `default,target=level,...` with targets in a stable order.
fn filter_directives(config: &LoggingConfig) -> String {
    let mut modules: Vec<_> = config.modules.iter().collect();
    modules.sort();

    modules
        .into_iter()
        .fold(config.default.clone(), |mut directives, (module, level)| {
            directives.push_str(&format!(",{module}={level}"));
            directives
        })
}

/// Filter from `RUST_LOG` if set, else from the config.
///
/// A config with an unparsable level falls back to `warn` instead of
/// silencing everything.
fn build_filter(config: &LoggingConfig) -> EnvFilter {
    if std::env::var("RUST_LOG").is_ok() {
        return EnvFilter::from_default_env();
    }
    EnvFilter::try_new(filter_directives(config)).unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Install a compact fmt subscriber for the index's events.
///
/// Only the first call does anything. Returns false when another global
/// subscriber was already set by the host, which then keeps receiving the
/// events.
pub fn init_with_config(config: &LoggingConfig) -> bool {
    *INSTALLED.get_or_init(|| {
        let layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_timer(ClockTime)
            .with_filter(build_filter(config));

        tracing_subscriber::registry().with(layer).try_init().is_ok()
    })
}

/// [`init_with_config`] with warnings and errors only.
pub fn init() -> bool {
    init_with_config(&LoggingConfig::default())
}

/// Info-level event from an index component.
///
/// ```ignore
/// log_event!("index", "moved", "{} -> {}", old.display(), new.display());
/// ```
#[macro_export]
macro_rules! log_event {
    ($component:expr, $event:expr) => {
        tracing::info!(component = $component, event = $event)
    };
    ($component:expr, $event:expr, $($arg:tt)*) => {
        tracing::info!(component = $component, event = $event, "{}", format_args!($($arg)*))
    };
}

/// Debug-level counterpart of [`log_event!`].
#[macro_export]
macro_rules! debug_event {
    ($component:expr, $event:expr) => {
        tracing::debug!(component = $component, event = $event)
    };
    ($component:expr, $event:expr, $($arg:tt)*) => {
        tracing::debug!(component = $component, event = $event, "{}", format_args!($($arg)*))
    };
}
