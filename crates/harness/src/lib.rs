pub mod plane;

pub use plane::TestPlane;

/// Opt-in log output for test debugging, driven by `RUST_LOG`.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}
