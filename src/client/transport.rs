use super::sse::SseDecoder;
use crate::error::{McpSnagError, Result};
use crate::protocol::{Response, SESSION_HEADER};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Called with every parsed SSE message while a streamed reply is read.
/// Returning an error stops reading and fails the whole exchange.
pub type EventHandler<'a> = dyn FnMut(&Response) -> Result<()> + 'a;

/// Receives the wire-level view of each exchange, e.g. for `--verbose`.
pub trait ExchangeObserver: Send + Sync {
    fn on_request(&self, method: &str, url: &str, headers: &HeaderMap, body: &[u8]);
    fn on_response(&self, status: StatusCode, headers: &HeaderMap);
}

/// Outcome of one POST: the final response (none for 202 Accepted or an
/// SSE stream without messages) and the session id the server reported.
#[derive(Debug, Default)]
pub struct Exchange {
    pub response: Option<Response>,
    pub session_id: String,
}

pub struct Transport {
    endpoint: String,
    http: reqwest::Client,
    headers: BTreeMap<String, String>,
    observer: Option<Arc<dyn ExchangeObserver>>,
}

impl Transport {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint: endpoint.into(),
            http,
            headers: BTreeMap::new(),
            observer: None,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Sets a header sent with every later request. Names are exact-string
    /// keys; the last value written for a name wins.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name.into(), value.into());
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn set_observer(&mut self, observer: Arc<dyn ExchangeObserver>) {
        self.observer = Some(observer);
    }

    /// POSTs `body` and normalizes the reply. With `stream` set, `on_event`
    /// sees each SSE message as it arrives.
    pub async fn post_and_read_response(
        &self,
        body: Vec<u8>,
        stream: bool,
        on_event: Option<&mut EventHandler<'_>>,
    ) -> Result<Exchange> {
        self.exchange(body, &[], stream, on_event).await
    }

    /// Same as `post_and_read_response`, with extra headers for this request
    /// only. Extra headers win over the shared set.
    pub(crate) async fn exchange(
        &self,
        body: Vec<u8>,
        extra: &[(&str, &str)],
        stream: bool,
        mut on_event: Option<&mut EventHandler<'_>>,
    ) -> Result<Exchange> {
        let response = self.post_with(body, extra).await?;
        let status = response.status();

        let session_id = header_str(response.headers(), SESSION_HEADER).to_string();
        let content_type = header_str(response.headers(), CONTENT_TYPE.as_str()).to_string();
        debug!(status = status.as_u16(), content_type = %content_type, session_id = %session_id, "response received");

        if let Some(observer) = &self.observer {
            observer.on_response(status, response.headers());
        }

        if status != StatusCode::OK && status != StatusCode::ACCEPTED {
            let body = response.text().await.unwrap_or_default();
            return Err(McpSnagError::Http {
                status: status.as_u16(),
                body,
            });
        }

        if status == StatusCode::ACCEPTED {
            return Ok(Exchange {
                response: None,
                session_id,
            });
        }

        if content_type.starts_with("text/event-stream") {
            let mut decoder = SseDecoder::new(response.bytes_stream());
            let mut last = None;
            while let Some(event) = decoder.next_event().await? {
                if !event.is_message() {
                    debug!(event = %event.event, "skipping non-message SSE event");
                    continue;
                }
                let parsed: Response = serde_json::from_str(&event.data)
                    .map_err(|e| McpSnagError::protocol("invalid SSE event data", e))?;
                if stream {
                    if let Some(handler) = on_event.as_deref_mut() {
                        handler(&parsed)?;
                    }
                }
                last = Some(parsed);
            }
            return Ok(Exchange {
                response: last,
                session_id,
            });
        }

        let bytes = response.bytes().await?;
        Ok(Exchange {
            response: Some(Response::from_slice(&bytes)?),
            session_id,
        })
    }

    async fn post_with(&self, body: Vec<u8>, extra: &[(&str, &str)]) -> Result<reqwest::Response> {
        let headers = self.build_headers(extra)?;

        if let Some(observer) = &self.observer {
            observer.on_request("POST", &self.endpoint, &headers, &body);
        }
        debug!(endpoint = %self.endpoint, bytes = body.len(), "posting message");

        let response = self
            .http
            .post(&self.endpoint)
            .headers(headers)
            .body(body)
            .send()
            .await?;
        Ok(response)
    }

    fn build_headers(&self, extra: &[(&str, &str)]) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/event-stream"),
        );

        let shared = self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()));
        for (name, value) in shared.chain(extra.iter().copied()) {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| McpSnagError::InvalidHeader {
                    name: name.to_string(),
                    reason: e.to_string(),
                })?;
            let header_value =
                HeaderValue::from_str(value).map_err(|e| McpSnagError::InvalidHeader {
                    name: name.to_string(),
                    reason: e.to_string(),
                })?;
            headers.insert(header_name, header_value);
        }
        Ok(headers)
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}
