/// Scripted mock transport for integration testing
use async_trait::async_trait;
use http::{HeaderMap, HeaderValue, StatusCode};
use mailrelay::email::wire::WireMessage;
use mailrelay::error::MailrelayError;
use mailrelay::services::transport::{MailTransport, WireResponse};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Records every wire message it receives and replays queued responses;
/// once the queue is empty it answers 202 Accepted with a generated
/// message id.
pub struct MockTransport {
    responses: Mutex<VecDeque<Result<WireResponse, MailrelayError>>>,
    sent: Mutex<Vec<WireMessage>>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    latency: Option<Duration>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            latency: None,
        }
    }

    /// Adds a simulated network delay to every send
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn queue_response(&self, response: WireResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    pub fn queue_status(&self, status: u16, body: &str) {
        self.queue_response(WireResponse::new(
            StatusCode::from_u16(status).unwrap(),
            HeaderMap::new(),
            body,
        ));
    }

    pub fn queue_transport_error(&self, message: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(MailrelayError::Transport(message.to_string())));
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn sent_messages(&self) -> Vec<WireMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn accepted(message_id: &str) -> WireResponse {
        let mut headers = HeaderMap::new();
        headers.insert("x-message-id", HeaderValue::from_str(message_id).unwrap());
        WireResponse::new(StatusCode::ACCEPTED, headers, "")
    }

    pub fn rate_limited(retry_after_secs: u64) -> WireResponse {
        let mut headers = HeaderMap::new();
        headers.insert(
            "retry-after",
            HeaderValue::from_str(&retry_after_secs.to_string()).unwrap(),
        );
        WireResponse::new(StatusCode::TOO_MANY_REQUESTS, headers, "rate limited")
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MailTransport for MockTransport {
    async fn send(&self, message: &WireMessage) -> Result<WireResponse, MailrelayError> {
        self.sent.lock().unwrap().push(message.clone());
        let call = self.calls.fetch_add(1, Ordering::SeqCst);

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let queued = self.responses.lock().unwrap().pop_front();
        match queued {
            Some(response) => response,
            None => Ok(Self::accepted(&format!("mock-{}", call))),
        }
    }
}
