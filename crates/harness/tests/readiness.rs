use std::io::{Read, Write};
use std::net::TcpListener;
use std::time::Duration;

use gitopsdb_lifecycle::{LifecycleError, wait_for_server_up, wait_until_ready};

#[test]
fn returns_once_the_server_answers() -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;

    // A one-shot liveness endpoint: any HTTP response counts as up.
    let server = std::thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf);
            let _ = stream.write_all(
                b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
            );
        }
    });

    wait_for_server_up(&format!("http://{addr}"))?;
    server.join().expect("server thread");
    Ok(())
}

#[test]
fn probe_window_elapses_into_timeout() {
    let err = wait_until_ready(
        "http://127.0.0.1:1",
        Duration::from_millis(5),
        Duration::from_millis(30),
        || false,
    )
    .unwrap_err();
    assert!(matches!(err, LifecycleError::Timeout { .. }));
    assert!(err.to_string().contains("http://127.0.0.1:1"));
}
