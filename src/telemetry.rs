use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize structured logging.
/// `RUST_LOG` overrides the default `mintsmith=info` filter.
pub fn init() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mintsmith=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
