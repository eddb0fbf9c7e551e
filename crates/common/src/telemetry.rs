use crate::Environment;
use crate::logging::install_subscriber;
use opentelemetry::{KeyValue, global};
use opentelemetry_otlp::{MetricExporter, SpanExporter, WithExportConfig};
use opentelemetry_sdk::{
    Resource,
    metrics::{PeriodicReader, SdkMeterProvider},
    propagation::TraceContextPropagator,
    trace::{Sampler, SdkTracerProvider},
};
use opentelemetry_semantic_conventions::attribute::{SERVICE_NAME, SERVICE_VERSION};
use std::time::Duration;

/// Pipeline histograms are small; a slow cadence is enough.
const METRIC_EXPORT_INTERVAL: Duration = Duration::from_secs(10);

/// Keeps the OTLP providers alive for the life of the process and flushes
/// them on drop.
///
/// ```ignore
/// let _telemetry = TelemetryGuard::init("food-lens", "http://localhost:4317", Environment::Production)?;
/// ```
pub struct TelemetryGuard {
    tracer_provider: SdkTracerProvider,
    meter_provider: SdkMeterProvider,
}

impl TelemetryGuard {
    /// Export spans and metrics over OTLP/gRPC and install the subscriber.
    ///
    /// Replaces [`crate::setup_logging`]: do not call both.
    pub fn init(
        service_name: &str,
        endpoint: &str,
        environment: Environment,
    ) -> anyhow::Result<Self> {
        let resource = service_resource(service_name, environment);

        global::set_text_map_propagator(TraceContextPropagator::new());

        let tracer_provider = build_tracer_provider(endpoint, resource.clone())?;
        global::set_tracer_provider(tracer_provider.clone());

        let meter_provider = build_meter_provider(endpoint, resource)?;
        global::set_meter_provider(meter_provider.clone());

        let tracer = global::tracer(service_name.to_string());
        install_subscriber(environment, tracing_opentelemetry::layer().with_tracer(tracer))?;

        tracing::info!(
            service_name,
            endpoint,
            environment = environment.as_str(),
            "OTLP export enabled"
        );

        Ok(Self {
            tracer_provider,
            meter_provider,
        })
    }
}

fn build_tracer_provider(endpoint: &str, resource: Resource) -> anyhow::Result<SdkTracerProvider> {
    let exporter = SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    Ok(SdkTracerProvider::builder()
        .with_resource(resource)
        .with_sampler(Sampler::ParentBased(Box::new(Sampler::AlwaysOn)))
        .with_batch_exporter(exporter)
        .build())
}

fn build_meter_provider(endpoint: &str, resource: Resource) -> anyhow::Result<SdkMeterProvider> {
    let exporter = MetricExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    let reader = PeriodicReader::builder(exporter)
        .with_interval(METRIC_EXPORT_INTERVAL)
        .build();

    Ok(SdkMeterProvider::builder()
        .with_resource(resource)
        .with_reader(reader)
        .build())
}

fn service_resource(service_name: &str, environment: Environment) -> Resource {
    Resource::builder()
        .with_attributes([
            KeyValue::new(SERVICE_NAME, service_name.to_string()),
            KeyValue::new(SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
            KeyValue::new("deployment.environment", environment.as_str()),
        ])
        .build()
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        for (kind, result) in [
            ("tracer", self.tracer_provider.shutdown()),
            ("meter", self.meter_provider.shutdown()),
        ] {
            if let Err(e) = result {
                eprintln!("Failed to flush {kind} provider: {e:?}");
            }
        }
    }
}
