use std::io::Read;
use std::sync::{atomic::AtomicBool, atomic::Ordering, Arc};

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::debug;

use crate::config::ClaudeApiConfig;
use crate::error::{parse_error_message, ClaudeApiError};
use crate::events::{ClaudeStreamEvent, TurnStopReason};
use crate::headers::build_headers;
use crate::payload::MessagesRequest;
use crate::sse::SseStreamParser;
use crate::url::normalize_messages_url;

/// Optional cancellation signal shared across request and stream loops.
pub type CancellationSignal = Arc<AtomicBool>;

const READ_CHUNK_BYTES: usize = 8 * 1024;

/// Blocking streaming client for the Messages endpoint.
///
/// The stream loop is strictly single-threaded: the only suspension point
/// is the blocking socket read, and the cancellation flag is observed
/// between reads.
#[derive(Debug)]
pub struct ClaudeApiClient {
    http: Client,
    config: ClaudeApiConfig,
}

impl ClaudeApiClient {
    pub fn new(config: ClaudeApiConfig) -> Result<Self, ClaudeApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(ClaudeApiError::from)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClaudeApiConfig {
        &self.config
    }

    pub fn normalized_endpoint(&self) -> String {
        normalize_messages_url(&self.config.base_url)
    }

    pub fn build_headers(&self, user_agent: Option<&str>) -> Result<HeaderMap, ClaudeApiError> {
        let headers = build_headers(&self.config, user_agent)?;
        let mut out = HeaderMap::new();
        for (key, value) in headers {
            out.insert(
                HeaderName::from_bytes(key.as_bytes()).map_err(|_| {
                    ClaudeApiError::InvalidBaseUrl(format!("invalid header key: {key}"))
                })?,
                HeaderValue::from_str(&value).map_err(|_| {
                    ClaudeApiError::InvalidBaseUrl(format!("invalid header value for {key}"))
                })?,
            );
        }
        Ok(out)
    }

    pub fn build_request(
        &self,
        request: &MessagesRequest,
    ) -> Result<reqwest::blocking::RequestBuilder, ClaudeApiError> {
        let headers = self.build_headers(self.config.user_agent.as_deref())?;
        let payload = request_with_transport_defaults(request);
        Ok(self
            .http
            .post(self.normalized_endpoint())
            .headers(headers)
            .json(&payload))
    }

    /// Streams one Messages round-trip, invoking `on_event` per decoded
    /// event in arrival order. Returns the stop reason reported by the
    /// final `message_delta`, when one arrived.
    ///
    /// Transport failures surface once as a terminal error; there is no
    /// automatic retry.
    pub fn stream_with_handler<F>(
        &self,
        request: &MessagesRequest,
        cancellation: Option<&CancellationSignal>,
        mut on_event: F,
    ) -> Result<Option<TurnStopReason>, ClaudeApiError>
    where
        F: FnMut(ClaudeStreamEvent),
    {
        if is_cancelled(cancellation) {
            return Err(ClaudeApiError::Cancelled);
        }

        let response = self.build_request(request)?.send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ClaudeApiError::Status(
                status,
                parse_error_message(status, &body),
            ));
        }

        let mut body = response;
        let mut parser = SseStreamParser::default();
        let mut stop_reason = None;
        let mut chunk = [0u8; READ_CHUNK_BYTES];

        loop {
            if is_cancelled(cancellation) {
                return Err(ClaudeApiError::Cancelled);
            }

            let read = body.read(&mut chunk)?;
            if read == 0 {
                break;
            }

            for event in parser.feed(&chunk[..read]) {
                if let ClaudeStreamEvent::Error { code, message } = &event {
                    return Err(ClaudeApiError::StreamFailed {
                        code: code.clone(),
                        message: message
                            .clone()
                            .unwrap_or_else(|| "provider reported an error event".to_owned()),
                    });
                }

                if let ClaudeStreamEvent::MessageDelta {
                    stop_reason: Some(reason),
                } = &event
                {
                    stop_reason = Some(*reason);
                }

                on_event(event);
            }
        }

        if is_cancelled(cancellation) {
            return Err(ClaudeApiError::Cancelled);
        }

        if !parser.is_empty_buffer() {
            debug!("stream ended with an incomplete SSE frame in the buffer");
        }

        Ok(stop_reason)
    }

    /// Streams a round-trip and collects every event.
    pub fn stream(
        &self,
        request: &MessagesRequest,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<(Vec<ClaudeStreamEvent>, Option<TurnStopReason>), ClaudeApiError> {
        let mut events = Vec::new();
        let stop_reason = self.stream_with_handler(request, cancellation, |event| {
            events.push(event);
        })?;

        Ok((events, stop_reason))
    }
}

fn request_with_transport_defaults(request: &MessagesRequest) -> MessagesRequest {
    let mut payload = request.clone();
    payload.stream = true;
    payload
}

fn is_cancelled(cancel: Option<&CancellationSignal>) -> bool {
    cancel.is_some_and(|token| token.load(Ordering::Acquire))
}
