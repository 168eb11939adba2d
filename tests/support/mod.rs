//! Minimal HTTP/1.1 range-serving fixture for the integration tests.
//!
//! Every request from this crate's transports opens its own TCP connection
//! (the teacher's `plug.rs` builds a fresh `curl::easy::Easy` per call, kept
//! as-is here), so the fixture only ever needs to handle one request per
//! accepted connection.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

/// Route worker/prefetch diagnostics to stderr when a test fails; no-op if
/// a logger is already installed (multiple tests in one binary call this).
pub fn init_logging() {
    let _ = env_logger::try_init();
}

pub struct MockServer {
    addr: SocketAddr,
    _handle: thread::JoinHandle<()>,
}

/// Per-connection behavior override, keyed by the 1-based index of the
/// accepted connection ("the Nth request this server has seen").
pub enum Hook {
    /// Respond with this status and an empty body, then close.
    Status(u16),
    /// Accept the connection and close it immediately without writing
    /// anything, simulating a dropped link mid-request.
    Drop,
}

pub struct MockServerBuilder {
    body: Vec<u8>,
    hooks: Vec<(usize, Hook)>,
}

impl MockServerBuilder {
    pub fn new(body: Vec<u8>) -> Self {
        Self {
            body,
            hooks: Vec::new(),
        }
    }

    pub fn on_connection(mut self, index: usize, hook: Hook) -> Self {
        self.hooks.push((index, hook));
        self
    }

    pub fn start(self) -> MockServer {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
        let addr = listener.local_addr().expect("local addr");
        let body = Arc::new(self.body);
        let hooks = Arc::new(self.hooks);
        let counter = Arc::new(AtomicUsize::new(0));

        let handle = thread::spawn(move || {
            for incoming in listener.incoming() {
                let stream = match incoming {
                    Ok(s) => s,
                    Err(_) => break,
                };
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                let hook = hooks.iter().find(|(idx, _)| *idx == n).map(|(_, h)| h);
                if handle_connection(stream, &body, hook).is_none() {
                    // Listener was asked to stop (shutdown sentinel path).
                }
            }
        });

        MockServer {
            addr,
            _handle: handle,
        }
    }
}

impl MockServer {
    pub fn serving(body: Vec<u8>) -> Self {
        MockServerBuilder::new(body).start()
    }

    pub fn url(&self) -> String {
        format!("http://{}/data.bin", self.addr)
    }
}

fn handle_connection(mut stream: TcpStream, body: &[u8], hook: Option<&Hook>) -> Option<()> {
    if let Some(Hook::Drop) = hook {
        drop(stream);
        return Some(());
    }

    let mut reader = BufReader::new(stream.try_clone().ok()?);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).ok()?;
    if request_line.is_empty() {
        return Some(());
    }

    let mut range: Option<(u64, u64)> = None;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).ok()? == 0 {
            break;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some(value) = line.strip_prefix("Range: ").or_else(|| line.strip_prefix("range: ")) {
            range = parse_range(value);
        }
    }

    if let Some(Hook::Status(status)) = hook {
        write_status_only(&mut stream, *status);
        return Some(());
    }

    let total = body.len() as u64;
    let Some((start, requested_end)) = range else {
        // No Range header: plain 200 with the full body (not exercised by
        // this crate's own request paths, but a well-behaved server
        // supports it).
        write_response(&mut stream, 200, None, &body[..], total);
        return Some(());
    };

    if start >= total {
        write_416(&mut stream, total);
        return Some(());
    }

    let end = requested_end.min(total.saturating_sub(1));
    let slice = &body[start as usize..=end as usize];
    write_response(&mut stream, 206, Some((start, end, total)), slice, total);
    Some(())
}

fn parse_range(value: &str) -> Option<(u64, u64)> {
    let spec = value.trim().strip_prefix("bytes=")?;
    let (start, end) = spec.split_once('-')?;
    Some((start.parse().ok()?, end.parse().ok()?))
}

fn write_status_only(stream: &mut TcpStream, status: u16) {
    let reason = reason_phrase(status);
    let _ = write!(
        stream,
        "HTTP/1.1 {status} {reason}\r\nConnection: close\r\nContent-Length: 0\r\n\r\n"
    );
    let _ = stream.flush();
}

fn write_416(stream: &mut TcpStream, total: u64) {
    let _ = write!(
        stream,
        "HTTP/1.1 416 Range Not Satisfiable\r\n\
         Content-Range: bytes */{total}\r\n\
         Connection: close\r\n\
         Content-Length: 0\r\n\r\n"
    );
    let _ = stream.flush();
}

fn write_response(
    stream: &mut TcpStream,
    status: u16,
    content_range: Option<(u64, u64, u64)>,
    body: &[u8],
    _total: u64,
) {
    let reason = reason_phrase(status);
    let mut header = format!(
        "HTTP/1.1 {status} {reason}\r\nConnection: close\r\nContent-Length: {}\r\n",
        body.len()
    );
    if let Some((start, end, total)) = content_range {
        header.push_str(&format!("Content-Range: bytes {start}-{end}/{total}\r\n"));
    }
    header.push_str("\r\n");
    let _ = stream.write_all(header.as_bytes());
    let _ = stream.write_all(body);
    let _ = stream.flush();
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        206 => "Partial Content",
        416 => "Range Not Satisfiable",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

#[allow(dead_code)]
pub fn read_to_end(mut stream: impl Read) -> Vec<u8> {
    let mut buf = Vec::new();
    let _ = stream.read_to_end(&mut buf);
    buf
}
