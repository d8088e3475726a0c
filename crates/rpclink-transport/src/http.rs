//! HTTP session: JSON-RPC over POST.

use std::io::Read;

use reqwest::blocking::{Client, Response as HttpResponse};
use reqwest::header::CONTENT_TYPE;

use rpclink_core::Response;
use rpclink_core::validation::limits::MAX_RESPONSE_BYTES;

use crate::error::{ExchangeError, is_timeout};
use crate::framing::{Deadline, FramingPolicy};
use crate::session::Session;

/// POSTs requests to one URL.
///
/// Body framing belongs to the HTTP client. Uses the blocking client, so
/// build and drop it off the async runtime (e.g. in `spawn_blocking`).
#[derive(Debug)]
pub struct HttpSession {
    client: Client,
    url: String,
    pending: Option<HttpResponse>,
    usable: bool,
}

impl HttpSession {
    /// Create a session with a default client.
    ///
    /// # Errors
    ///
    /// Returns `ExchangeError::Open` if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>) -> Result<Self, ExchangeError> {
        let url = url.into();
        let client = Client::builder()
            .build()
            .map_err(|e| ExchangeError::Open {
                endpoint: url.clone(),
                reason: e.to_string(),
            })?;
        Ok(Self::with_client(client, url))
    }

    /// Create a session around an existing client.
    #[must_use]
    pub fn with_client(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            pending: None,
            usable: true,
        }
    }

    fn classify(deadline: &Deadline, error: reqwest::Error) -> ExchangeError {
        if error.is_timeout() {
            deadline.expired()
        } else {
            ExchangeError::Http(error)
        }
    }
}

/// Read the body, failing once it outgrows the response limit.
///
/// The device sends no length and ends the body by closing, so the
/// declared length is only a shortcut.
fn read_body(response: HttpResponse, deadline: &Deadline) -> Result<Vec<u8>, ExchangeError> {
    let too_large = ExchangeError::TooLarge {
        limit: MAX_RESPONSE_BYTES,
    };
    let limit = u64::try_from(MAX_RESPONSE_BYTES).unwrap_or(u64::MAX);
    if response.content_length().is_some_and(|len| len > limit) {
        return Err(too_large);
    }

    let mut body = Vec::new();
    response
        .take(limit.saturating_add(1))
        .read_to_end(&mut body)
        .map_err(|e| {
            if is_timeout(&e) {
                deadline.expired()
            } else {
                ExchangeError::Io(e)
            }
        })?;

    if body.len() > MAX_RESPONSE_BYTES {
        return Err(too_large);
    }
    Ok(body)
}

impl Session for HttpSession {
    fn policy(&self) -> FramingPolicy {
        FramingPolicy::ContentLength
    }

    fn endpoint(&self) -> &str {
        &self.url
    }

    fn is_usable(&self) -> bool {
        self.usable
    }

    fn send(&mut self, payload: &[u8], deadline: &Deadline) -> Result<(), ExchangeError> {
        if !self.usable {
            return Err(ExchangeError::Unusable {
                endpoint: self.url.clone(),
            });
        }
        let remaining = deadline.check()?;

        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .timeout(remaining)
            .body(payload.to_vec())
            .send()
            .map_err(|e| Self::classify(deadline, e))?;

        tracing::debug!("{} answered {}", self.url, response.status());
        self.pending = Some(response);
        Ok(())
    }

    fn receive(&mut self, deadline: &Deadline) -> Result<Vec<u8>, ExchangeError> {
        let response = self.pending.take().ok_or_else(|| ExchangeError::Unusable {
            endpoint: self.url.clone(),
        })?;

        let status = response.status();
        let body = read_body(response, deadline)?;

        // Some servers report JSON-RPC errors with a failure status; the
        // envelope is still the answer.
        if !status.is_success() && Response::from_slice(&body).is_err() {
            return Err(ExchangeError::HttpStatus {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        Ok(body)
    }

    fn close(&mut self) {
        self.pending = None;
        self.usable = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{serve_once, serve_unframed};
    use std::time::Duration;

    #[test]
    fn test_post_body_and_read_reply() {
        let reply = br#"{"jsonrpc":"2.0","id":55,"result":11}"#;
        let (url, server) = serve_once(reply.to_vec(), "200 OK");

        let mut session = HttpSession::new(&url).unwrap();
        let deadline = Deadline::after(Duration::from_secs(5));
        session
            .send(br#"{"jsonrpc":"2.0","method":"add2","params":[5,6],"id":55}"#, &deadline)
            .unwrap();
        let body = session.receive(&deadline).unwrap();
        let received = server.join().unwrap();

        assert_eq!(body, reply.to_vec());
        assert!(received.starts_with("POST / HTTP/1.1"));
        assert!(received.to_ascii_lowercase().contains("content-type: application/json"));
        assert!(received.ends_with(r#"{"jsonrpc":"2.0","method":"add2","params":[5,6],"id":55}"#));
    }

    #[test]
    fn test_error_status_without_envelope() {
        let (url, server) = serve_once(b"not here".to_vec(), "404 Not Found");

        let mut session = HttpSession::new(&url).unwrap();
        let deadline = Deadline::after(Duration::from_secs(5));
        session.send(b"{}", &deadline).unwrap();
        let result = session.receive(&deadline);
        server.join().unwrap();

        match result {
            Err(ExchangeError::HttpStatus { status, body }) => {
                assert_eq!(status, 404);
                assert_eq!(body, "not here");
            }
            other => panic!("Expected HTTP status error, got {other:?}"),
        }
    }

    #[test]
    fn test_oversized_body_rejected() {
        let oversized = vec![b' '; 2 * MAX_RESPONSE_BYTES];

        for (url, server) in [
            serve_once(oversized.clone(), "200 OK"),
            serve_unframed(oversized.clone()),
        ] {
            let mut session = HttpSession::new(&url).unwrap();
            let deadline = Deadline::after(Duration::from_secs(5));
            session.send(b"{}", &deadline).unwrap();
            let result = session.receive(&deadline);
            drop(session);
            server.join().unwrap();

            match result {
                Err(e @ ExchangeError::TooLarge { .. }) => {
                    assert!(e.discards_session());
                }
                other => panic!("Expected size error, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_error_status_with_envelope_is_passed_through() {
        let reply = br#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"Method not found"}}"#;
        let (url, server) = serve_once(reply.to_vec(), "500 Internal Server Error");

        let mut session = HttpSession::new(&url).unwrap();
        let deadline = Deadline::after(Duration::from_secs(5));
        session.send(b"{}", &deadline).unwrap();
        let body = session.receive(&deadline).unwrap();
        server.join().unwrap();

        assert_eq!(body, reply.to_vec());
    }

    #[test]
    fn test_closed_session_refuses_to_send() {
        let mut session = HttpSession::new("http://127.0.0.1:9").unwrap();
        session.close();
        assert!(!session.is_usable());

        let deadline = Deadline::after(Duration::from_secs(1));
        assert!(matches!(
            session.send(b"{}", &deadline),
            Err(ExchangeError::Unusable { .. })
        ));
    }
}
