use tracing_subscriber::{fmt, EnvFilter};

/// Installs the stdout subscriber. `RUST_LOG` takes precedence over `level`.
pub fn init(level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("group_rotation={level}")));

    let _ = fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .try_init();
}
