//! Mock transport for testing
//!
//! Replays a script of responses in order and records every request it
//! receives, so tests can assert on payloads and on how many calls were made.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{HttpResponse, HttpTransport, OutboundRequest, TransportError};

/// A scripted transport for gateway tests
pub struct MockTransport {
    /// Responses handed out in order
    script: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    /// Returned once the script is exhausted (None = report an error)
    repeat: Option<Result<HttpResponse, TransportError>>,
    /// Current call count
    call_count: AtomicUsize,
    /// Every request received, in order
    requests: Mutex<Vec<OutboundRequest>>,
}

impl MockTransport {
    /// A transport with an empty script
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            repeat: None,
            call_count: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a transport that always fails with the given error
    pub fn always_fails(error: TransportError) -> Self {
        Self {
            repeat: Some(Err(error)),
            ..Self::new()
        }
    }

    /// Create a transport that always answers with the given status and JSON body
    pub fn always_responds(status: u16, body: Value) -> Self {
        Self {
            repeat: Some(Ok(json_response(status, &body))),
            ..Self::new()
        }
    }

    /// Queue a JSON response
    pub fn then_json(self, status: u16, body: Value) -> Self {
        self.then(Ok(json_response(status, &body)))
    }

    /// Queue a transport failure
    pub fn then_error(self, error: TransportError) -> Self {
        self.then(Err(error))
    }

    fn then(self, outcome: Result<HttpResponse, TransportError>) -> Self {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(outcome);
        self
    }

    /// Get the number of times send() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<OutboundRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// The most recent request, if any
    pub fn last_request(&self) -> Option<OutboundRequest> {
        self.requests().pop()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn json_response(status: u16, body: &Value) -> HttpResponse {
    HttpResponse {
        status,
        content_type: Some("application/json".to_string()),
        body: body.to_string().into_bytes(),
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: OutboundRequest) -> Result<HttpResponse, TransportError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);

        let scripted = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();

        match (scripted, &self.repeat) {
            (Some(outcome), _) => outcome,
            (None, Some(outcome)) => outcome.clone(),
            (None, None) => Err(TransportError::Other(
                "mock transport has no scripted response".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{Method, RequestBody};
    use serde_json::json;
    use std::time::Duration;

    fn request() -> OutboundRequest {
        OutboundRequest {
            method: Method::Get,
            url: "https://example.com/status".to_string(),
            bearer: None,
            accept: None,
            body: RequestBody::Empty,
            timeout: Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn test_script_is_replayed_in_order() {
        let transport = MockTransport::new()
            .then_json(200, json!({"status": "PENDING"}))
            .then_error(TransportError::Connect("refused".into()));

        let first = transport.send(request()).await.unwrap();
        assert_eq!(first.json().unwrap()["status"], "PENDING");
        assert!(transport.send(request()).await.is_err());
        // Script exhausted
        assert!(transport.send(request()).await.is_err());
        assert_eq!(transport.call_count(), 3);
        assert_eq!(transport.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_always_responds() {
        let transport = MockTransport::always_responds(503, json!({"msg": "busy"}));
        for _ in 0..3 {
            let response = transport.send(request()).await.unwrap();
            assert_eq!(response.status, 503);
        }
        assert_eq!(transport.call_count(), 3);
    }

    #[tokio::test]
    async fn test_always_fails() {
        let transport = MockTransport::always_fails(TransportError::Timeout(Duration::from_secs(1)));
        assert_eq!(
            transport.send(request()).await.unwrap_err(),
            TransportError::Timeout(Duration::from_secs(1))
        );
        assert_eq!(
            transport.last_request().map(|r| r.url),
            Some("https://example.com/status".to_string())
        );
    }
}
