use tracing_subscriber::EnvFilter;

/// Logs go to stderr so command output on stdout stays pipeable.
/// `GHP_LOG` wins over `RUST_LOG`; default level is `warn`.
pub fn init() {
    let filter = EnvFilter::try_from_env("GHP_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
