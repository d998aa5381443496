use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the JSON subscriber. `RUST_LOG` overrides `default_filter`.
///
/// Records emitted through the `log` facade (actix's `Logger`) are bridged
/// into tracing. Calling this twice is a no-op.
pub fn init_telemetry(default_filter: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    let formatting_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .json()
        .with_current_span(true);

    if tracing_subscriber::registry()
        .with(env_filter)
        .with(formatting_layer)
        .try_init()
        .is_err()
    {
        tracing::debug!("Telemetry already initialised");
    }
}
