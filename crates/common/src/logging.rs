use crate::config::Environment;
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    layer::{Layered, SubscriberExt},
    util::{SubscriberInitExt, TryInitError},
};

type FilteredRegistry = Layered<EnvFilter, Registry>;

/// Install the global tracing subscriber.
///
/// Development gets pretty, coloured output; production gets JSON lines.
/// Filtering follows `RUST_LOG` (defaults to "info"). An OpenTelemetry layer
/// is always attached so spans are exported once a tracer provider exists.
///
/// Calling this twice is harmless: the second install is ignored.
pub fn setup_logging(environment: Environment) {
    if install_subscriber(environment, tracing_opentelemetry::layer()).is_err() {
        tracing::debug!("Global subscriber already installed, keeping it");
    }
}

/// Filter, then `otel_layer`, then the environment's formatter.
pub(crate) fn install_subscriber<L>(environment: Environment, otel_layer: L) -> Result<(), TryInitError>
where
    L: Layer<FilteredRegistry> + Send + Sync + 'static,
{
    let registry = tracing_subscriber::registry()
        .with(default_filter())
        .with(otel_layer);

    match environment {
        Environment::Production => registry
            .with(tracing_subscriber::fmt::layer().json().with_level(true))
            .try_init(),
        Environment::Development => registry
            .with(tracing_subscriber::fmt::layer().pretty().with_ansi(true))
            .try_init(),
    }
}

fn default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}
