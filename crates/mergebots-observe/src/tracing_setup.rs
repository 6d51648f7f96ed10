//! Subscriber setup: structured log lines, optionally mirrored as
//! OpenTelemetry spans.
//!
//! ```no_run
//! mergebots_observe::tracing_setup::init_tracing("info", false).unwrap();
//! ```

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use std::sync::OnceLock;

const TRACER_NAME: &str = "mergebots";

static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

/// Install the global subscriber.
///
/// `default_directive` applies when `RUST_LOG` is unset. Fulfillment spans
/// are logged when they close, so each line carries the bot handle, the
/// inbound message id and the time spent. With `enable_otel` the same spans
/// are exported to stdout through OpenTelemetry.
///
/// # Errors
///
/// Fails when a global subscriber is already installed or the directive
/// does not parse.
pub fn init_tracing(
    default_directive: &str,
    enable_otel: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(value) if !value.is_empty() => EnvFilter::try_new(value)?,
        _ => EnvFilter::try_new(default_directive)?,
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_span_events(FmtSpan::CLOSE);

    let registry = tracing_subscriber::registry().with(env_filter).with(fmt_layer);

    if enable_otel {
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
            .build();
        let otel_layer = tracing_opentelemetry::layer().with_tracer(provider.tracer(TRACER_NAME));

        let _ = TRACER_PROVIDER.set(provider.clone());
        opentelemetry::global::set_tracer_provider(provider);

        registry.with(otel_layer).try_init()?;
    } else {
        registry.try_init()?;
    }

    Ok(())
}

/// Flush buffered spans. A no-op when OpenTelemetry was never enabled.
pub fn shutdown_tracing() {
    if let Some(provider) = TRACER_PROVIDER.get()
        && let Err(e) = provider.shutdown()
    {
        eprintln!("warning: tracer shutdown failed: {e}");
    }
}
