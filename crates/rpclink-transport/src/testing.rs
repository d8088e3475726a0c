//! Loopback stand-ins for the device.

use std::collections::VecDeque;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rpclink_core::response::{METHOD_NOT_FOUND, RpcError};
use rpclink_core::{Request, Response};
use serde_json::Value;

use crate::framing::{LineLink, TimedRead};
use crate::serial::SerialLink;

/// Answer a request the way the device firmware does for `add2`, `doit` and `print_int`.
pub fn device_reply(request: &[u8]) -> Vec<u8> {
    let request = Request::from_slice(request).unwrap();
    let id = request.id().cloned();
    let response = match (request.method(), request.params()) {
        ("add2", Some(rpclink_core::Params::Array(items))) => {
            let sum: i64 = items.iter().filter_map(Value::as_i64).sum();
            Response::success(id.unwrap(), Value::from(sum))
        }
        ("doit", None) => Response::success(id.unwrap(), Value::Null),
        ("print_int", Some(rpclink_core::Params::Scalar(n))) if n.is_i64() => {
            Response::success(id.unwrap(), Value::Null)
        }
        _ => Response::error(id, RpcError::new(METHOD_NOT_FOUND, "Method not found")),
    };
    serde_json::to_vec(&response).unwrap()
}

/// Read from `stream` until the buffer holds one complete JSON document.
fn read_json(stream: &mut TcpStream) -> Vec<u8> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 256];
    while serde_json::from_slice::<Value>(&buffer).is_err() {
        let n = stream.read(&mut chunk).unwrap();
        assert!(n > 0, "peer closed before sending a full request");
        buffer.extend_from_slice(&chunk[..n]);
    }
    buffer
}

/// Read one HTTP request; returns head and body.
fn read_http_request(stream: &mut TcpStream) -> (String, Vec<u8>) {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 256];
    let head_end = loop {
        if let Some(i) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
            break i + 4;
        }
        let n = stream.read(&mut chunk).unwrap();
        assert!(n > 0, "peer closed before sending headers");
        buffer.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buffer[..head_end]).into_owned();
    let length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);

    let mut body = buffer[head_end..].to_vec();
    while body.len() < length {
        let n = stream.read(&mut chunk).unwrap();
        assert!(n > 0, "peer closed before sending the body");
        body.extend_from_slice(&chunk[..n]);
    }
    (head, body)
}

/// Serve one HTTP request with a fixed reply; the handle yields the request text.
pub fn serve_once(reply: Vec<u8>, status: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let (head, body) = read_http_request(&mut stream);
        write!(
            stream,
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            reply.len()
        )
        .unwrap();
        // The client may hang up early on an oversized reply.
        let _ = stream.write_all(&reply);
        format!("{head}{}", String::from_utf8_lossy(&body))
    });

    (url, handle)
}

/// Like [`serve_once`], but with no length: the body ends at close.
pub fn serve_unframed(reply: Vec<u8>) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let (head, body) = read_http_request(&mut stream);
        stream
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nConnection: close\r\n\r\n")
            .unwrap();
        let _ = stream.write_all(&reply);
        format!("{head}{}", String::from_utf8_lossy(&body))
    });

    (url, handle)
}

/// Serve one HTTP request like the firmware: no length, close ends the body.
pub fn serve_device_http() -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let (_, body) = read_http_request(&mut stream);
        stream
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nConnection: close\r\n\r\n")
            .unwrap();
        stream.write_all(&device_reply(&body)).unwrap();
    });

    (url, handle)
}

/// Serve one raw TCP exchange: read a JSON request, reply, close.
pub fn serve_device_tcp() -> (u16, JoinHandle<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let request = read_json(&mut stream);
        stream.write_all(&device_reply(&request)).unwrap();
        request
    });

    (port, handle)
}

/// Accept one connection, read the request, then stay silent until told to stop.
pub fn serve_silent_tcp() -> (u16, std::sync::mpsc::Sender<()>, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let (stop, stopped) = std::sync::mpsc::channel::<()>();

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let _ = read_json(&mut stream);
        let _ = stopped.recv();
    });

    (port, stop, handle)
}

/// Replays scripted reads, then serves the backlog, then times out.
#[derive(Debug, Default)]
pub struct ScriptedLink {
    /// Reads returned in order; an empty entry is a blank read.
    pub reads: VecDeque<Vec<u8>>,
    /// Bytes reported by `bytes_available` once `reads` is exhausted.
    pub backlog: Vec<u8>,
    /// Everything written to the link.
    pub written: Vec<u8>,
    /// Number of times stale input was discarded.
    pub discards: usize,
    /// Timeout in force at each write.
    pub write_bounds: Vec<Duration>,
    bound: Duration,
}

impl ScriptedLink {
    pub fn new(reads: &[&[u8]], backlog: &[u8]) -> Self {
        Self {
            reads: reads.iter().map(|r| r.to_vec()).collect(),
            backlog: backlog.to_vec(),
            ..Self::default()
        }
    }
}

impl Read for ScriptedLink {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if let Some(next) = self.reads.pop_front() {
            let n = next.len().min(buf.len());
            buf[..n].copy_from_slice(&next[..n]);
            if n < next.len() {
                self.reads.push_front(next[n..].to_vec());
            }
            return Ok(n);
        }
        if !self.backlog.is_empty() {
            let n = self.backlog.len().min(buf.len());
            buf[..n].copy_from_slice(&self.backlog[..n]);
            self.backlog.drain(..n);
            return Ok(n);
        }
        std::thread::sleep(self.bound);
        Err(std::io::Error::from(std::io::ErrorKind::TimedOut))
    }
}

impl Write for ScriptedLink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.written.extend_from_slice(buf);
        self.write_bounds.push(self.bound);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl TimedRead for ScriptedLink {
    fn set_read_bound(&mut self, timeout: Duration) -> std::io::Result<()> {
        self.bound = timeout;
        Ok(())
    }
}

impl LineLink for ScriptedLink {
    fn bytes_available(&mut self) -> std::io::Result<usize> {
        if self.reads.is_empty() {
            Ok(self.backlog.len())
        } else {
            Ok(0)
        }
    }
}

impl SerialLink for ScriptedLink {
    fn discard_input(&mut self) -> std::io::Result<()> {
        self.discards += 1;
        Ok(())
    }

    fn set_write_bound(&mut self, timeout: Duration) -> std::io::Result<()> {
        self.bound = timeout;
        Ok(())
    }
}
