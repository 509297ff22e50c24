#![allow(dead_code)]

use imagecheck::ReadinessPolicy;
use imagecheck::services::ProbeHarness;
use imagecheck::test_support::MockRuntime;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

pub fn fast_harness(mock: &Arc<MockRuntime>) -> ProbeHarness {
    ProbeHarness::new(
        mock.clone(),
        ReadinessPolicy::new(Duration::from_millis(100), Duration::from_millis(10)),
    )
}

/// Serves one canned HTTP response on a loopback port until the test exits.
pub fn serve(status: u16, reason: &str, body: &str) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            let mut buf = [0u8; 1024];
            let mut request = Vec::new();
            loop {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        request.extend_from_slice(&buf[..n]);
                        if request.windows(4).any(|w| w == b"\r\n\r\n") {
                            break;
                        }
                    }
                }
            }
            if !request.is_empty() {
                let _ = stream.write_all(response.as_bytes());
            }
        }
    });

    port
}

/// A loopback port nothing listens on.
pub fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// A loopback port that accepts connections and hangs up without answering.
pub fn hang_up() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    thread::spawn(move || {
        for stream in listener.incoming() {
            drop(stream);
        }
    });

    port
}
