//! Loopback HTTP/1.1 server serving one in-memory file with `Range` support.

#![allow(dead_code)]

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

/// How GET requests carrying a `Range` header are answered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RangeMode {
    /// 206 with exactly the requested bytes.
    Honor,
    /// 200 with the whole body.
    Ignore,
    /// 206 with the right length but always starting at byte 0.
    FromZero,
}

pub struct TestServer {
    pub url: String,
    pub range_gets: Arc<AtomicUsize>,
}

impl TestServer {
    /// Serve `body` at `/data.csv`.
    ///
    /// `honor_ranges = false` answers every GET with 200 and the whole body.
    pub fn start(body: Vec<u8>, honor_ranges: bool) -> Self {
        let mode = if honor_ranges {
            RangeMode::Honor
        } else {
            RangeMode::Ignore
        };
        Self::start_with(body, mode)
    }

    pub fn start_with(body: Vec<u8>, mode: RangeMode) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
        let addr = listener.local_addr().expect("local addr");
        let body = Arc::new(body);
        let range_gets = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&range_gets);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { continue };
                let body = Arc::clone(&body);
                let counter = Arc::clone(&counter);
                thread::spawn(move || {
                    let _ = handle(stream, &body, mode, &counter);
                });
            }
        });
        Self {
            url: format!("http://{addr}/data.csv"),
            range_gets,
        }
    }

    pub fn missing_url(&self) -> String {
        self.url.replace("data.csv", "missing.csv")
    }
}

fn parse_range(value: &str, len: u64) -> Option<(u64, u64)> {
    let bytes = value.trim().strip_prefix("bytes=")?;
    let (start, end) = bytes.split_once('-')?;
    let start: u64 = start.trim().parse().ok()?;
    let end: u64 = end.trim().parse().ok()?;
    if start > end || start >= len {
        return None;
    }
    Some((start, end.min(len - 1)))
}

fn handle(
    stream: TcpStream,
    body: &[u8],
    mode: RangeMode,
    counter: &AtomicUsize,
) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;
    let mut range = None;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 || line == "\r\n" || line == "\n" {
            break;
        }
        if let Some((name, value)) = line.split_once(':')
            && name.trim().eq_ignore_ascii_case("range")
        {
            range = Some(value.trim().to_string());
        }
    }

    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or("");
    let path = parts.next().unwrap_or("");
    let mut out = stream;

    if path != "/data.csv" {
        write!(
            out,
            "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
        )?;
        return out.flush();
    }

    let len = body.len() as u64;
    if method == "HEAD" {
        write!(
            out,
            "HTTP/1.1 200 OK\r\nContent-Length: {len}\r\n\
             Accept-Ranges: bytes\r\nConnection: close\r\n\r\n"
        )?;
        return out.flush();
    }

    match range {
        Some(value) if mode != RangeMode::Ignore => {
            counter.fetch_add(1, Ordering::SeqCst);
            match parse_range(&value, len) {
                Some((start, end)) => {
                    let (start, end) = match mode {
                        RangeMode::FromZero => (0, end - start),
                        _ => (start, end),
                    };
                    let slice = &body[start as usize..=end as usize];
                    write!(
                        out,
                        "HTTP/1.1 206 Partial Content\r\n\
                         Content-Range: bytes {start}-{end}/{len}\r\n\
                         Content-Length: {}\r\nConnection: close\r\n\r\n",
                        slice.len()
                    )?;
                    out.write_all(slice)?;
                }
                None => {
                    write!(
                        out,
                        "HTTP/1.1 416 Range Not Satisfiable\r\n\
                         Content-Range: bytes */{len}\r\n\
                         Content-Length: 0\r\nConnection: close\r\n\r\n"
                    )?;
                }
            }
        }
        _ => {
            write!(
                out,
                "HTTP/1.1 200 OK\r\nContent-Length: {len}\r\nConnection: close\r\n\r\n"
            )?;
            out.write_all(body)?;
        }
    }
    out.flush()
}
