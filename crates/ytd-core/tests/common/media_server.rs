//! Minimal HTTP/1.1 server for direct-download tests.
//!
//! Serves one body at every path. HEAD answers with headers only; GET sends the
//! body, optionally cut short to simulate a dropped connection.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct MediaServerOptions {
    pub content_type: &'static str,
    pub content_disposition: Option<&'static str>,
    /// Status line for every response, e.g. "404 Not Found".
    pub status: &'static str,
    /// If set, GET writes only this many body bytes (Content-Length stays full).
    pub truncate_at: Option<usize>,
}

impl Default for MediaServerOptions {
    fn default() -> Self {
        Self {
            content_type: "video/mp4",
            content_disposition: None,
            status: "200 OK",
            truncate_at: None,
        }
    }
}

/// Starts the server on a background thread and returns its base URL
/// ("http://127.0.0.1:PORT"). Runs until the process exits.
pub fn start(body: Vec<u8>, opts: MediaServerOptions) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let body = Arc::new(body);
    let opts = Arc::new(opts);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let body = Arc::clone(&body);
            let opts = Arc::clone(&opts);
            thread::spawn(move || handle(stream, &body, &opts));
        }
    });
    format!("http://127.0.0.1:{}", port)
}

fn handle(mut stream: TcpStream, body: &[u8], opts: &MediaServerOptions) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let Ok(request) = std::str::from_utf8(&buf[..n]) else {
        return;
    };
    let method = request.split_whitespace().next().unwrap_or("");

    let disposition = opts
        .content_disposition
        .map(|d| format!("Content-Disposition: {}\r\n", d))
        .unwrap_or_default();
    let head = format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\n{}Connection: close\r\n\r\n",
        opts.status,
        opts.content_type,
        body.len(),
        disposition
    );
    let _ = stream.write_all(head.as_bytes());
    if method.eq_ignore_ascii_case("GET") {
        let end = opts.truncate_at.unwrap_or(body.len()).min(body.len());
        let _ = stream.write_all(&body[..end]);
    }
}
