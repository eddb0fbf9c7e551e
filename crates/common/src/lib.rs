pub mod config;
pub mod logging;
pub mod telemetry;

pub use config::{Environment, env_opt, env_or};
pub use logging::setup_logging;
pub use telemetry::TelemetryGuard;

/// Enter an info-level span for the rest of the scope.
#[macro_export]
macro_rules! span {
    ($name:literal) => {
        tracing::info_span!($name).entered()
    };
}

/// Enter a debug-level span for the rest of the scope.
#[macro_export]
macro_rules! span_debug {
    ($name:literal) => {
        tracing::debug_span!($name).entered()
    };
}
