use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::LifecycleError;

pub const PROBE_INTERVAL: Duration = Duration::from_secs(1);
pub const PROBE_WINDOW: Duration = Duration::from_secs(60);

/// Poll `probe` at a fixed interval until it reports success or the
/// window elapses. `url` is only used for logging and the timeout error.
pub fn wait_until_ready(
    url: &str,
    interval: Duration,
    window: Duration,
    mut probe: impl FnMut() -> bool,
) -> Result<(), LifecycleError> {
    let start = Instant::now();
    while start.elapsed() < window {
        if probe() {
            return Ok(());
        }
        debug!(url, "liveness probe failed; retrying");
        std::thread::sleep(interval);
    }
    Err(LifecycleError::Timeout {
        url: url.to_string(),
        waited_secs: window.as_secs(),
    })
}

/// Block until an HTTP server at `base_url` answers a liveness GET on
/// its root path. Any response counts as up, whatever the status code.
pub fn wait_for_server_up(base_url: &str) -> Result<(), LifecycleError> {
    let client = reqwest::blocking::Client::new();
    let probe_url = format!("{base_url}/");
    wait_until_ready(base_url, PROBE_INTERVAL, PROBE_WINDOW, || {
        client.get(&probe_url).send().is_ok()
    })
}
