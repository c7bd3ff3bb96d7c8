/// Integration tests for the OpenAQ live feed client
///
/// A throwaway HTTP responder on 127.0.0.1 stands in for the OpenAQ API, so
/// the radius fallback can be checked without network access.
///
/// These tests verify:
/// 1. An empty answer widens the radius and the winning radius is reported
/// 2. An HTTP error moves on to the next radius
/// 3. An unparseable body ends the search after one request
/// 4. An unreachable endpoint yields an empty fetch instead of an error
///
/// Run with: cargo test --test live_feed

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

use cleanair_service::breakpoints::overall_index;
use cleanair_service::config::OpenAqConfig;
use cleanair_service::ingest::openaq::{latest_subindices, LiveFetch, OpenAqClient};
use cleanair_service::model::Coordinate;

const EMPTY: &str = r#"{"meta": {"found": 0}, "results": []}"#;

const DELHI: &str = r#"{"results": [
    {"location": "Anand Vihar", "parameter": "pm25", "value": 40.2, "unit": "µg/m³",
     "date": {"utc": "2024-05-01T12:00:00+00:00"},
     "coordinates": {"latitude": 28.65, "longitude": 77.31}}
]}"#;

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

/// Canned reply chosen from the request line.
type Responder = fn(&str) -> (u16, &'static str);

/// Serves `responder` on an ephemeral port and records each request line.
/// The thread is left running; it dies with the test process.
fn spawn_responder(responder: Responder) -> (String, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };

            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            let text = String::from_utf8_lossy(&request);
            let request_line = text.lines().next().unwrap_or("").to_string();

            let (status, body) = responder(&request_line);
            log.lock().unwrap().push(request_line);

            let reply = format!(
                "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            let _ = stream.write_all(reply.as_bytes());
        }
    });

    (format!("http://{}/v2/measurements", addr), seen)
}

fn client_for(base_url: String) -> OpenAqClient {
    OpenAqClient::new(OpenAqConfig {
        base_url,
        timeout_secs: 5,
        ..OpenAqConfig::default()
    })
    .unwrap()
}

fn radii_requested(seen: &Arc<Mutex<Vec<String>>>) -> Vec<u32> {
    seen.lock()
        .unwrap()
        .iter()
        .filter_map(|line| {
            let start = line.find("radius=")? + "radius=".len();
            let digits: String = line[start..].chars().take_while(|c| c.is_ascii_digit()).collect();
            digits.parse().ok()
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Radius fallback
// ---------------------------------------------------------------------------

#[test]
fn test_empty_answer_widens_radius() {
    let (url, seen) = spawn_responder(|line| {
        if line.contains("radius=300000") {
            (200, DELHI)
        } else {
            (200, EMPTY)
        }
    });

    let fetch = client_for(url).fetch_nearby(Coordinate::new(28.6, 77.2));

    assert_eq!(fetch.radius_used_m, Some(300_000));
    assert_eq!(fetch.measurements.len(), 1);
    assert_eq!(radii_requested(&seen), vec![100_000, 200_000, 300_000]);

    let subs = latest_subindices(&fetch.measurements);
    assert_eq!(subs.pm25, Some(113));
    assert_eq!(overall_index(&subs), Some(113));
}

#[test]
fn test_http_error_moves_to_next_radius() {
    let (url, seen) = spawn_responder(|line| {
        if line.contains("radius=100000") {
            (503, r#"{"detail": "busy"}"#)
        } else {
            (200, DELHI)
        }
    });

    let fetch = client_for(url).fetch_nearby(Coordinate::new(28.6, 77.2));

    assert_eq!(fetch.radius_used_m, Some(200_000));
    assert_eq!(radii_requested(&seen), vec![100_000, 200_000]);
}

#[test]
fn test_parse_error_stops_the_search() {
    let (url, seen) = spawn_responder(|_| (200, "<html>maintenance</html>"));

    let fetch = client_for(url).fetch_nearby(Coordinate::new(28.6, 77.2));

    assert_eq!(fetch, LiveFetch::default());
    assert_eq!(radii_requested(&seen), vec![100_000]);
}

#[test]
fn test_exhausted_radii_return_empty() {
    let (url, seen) = spawn_responder(|_| (200, EMPTY));

    let fetch = client_for(url).fetch_nearby(Coordinate::new(0.0, -160.0));

    assert!(fetch.measurements.is_empty());
    assert_eq!(fetch.radius_used_m, None);
    assert_eq!(radii_requested(&seen).len(), 3);
}

#[test]
fn test_unreachable_endpoint_returns_empty() {
    // Bind then drop to get a port nothing listens on.
    let port = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
    let client = client_for(format!("http://127.0.0.1:{}/v2/measurements", port));

    let fetch = client.fetch_nearby(Coordinate::new(28.6, 77.2));

    assert_eq!(fetch, LiveFetch::default());
}
