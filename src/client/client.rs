use super::session::Session;
use super::transport::{EventHandler, Exchange, ExchangeObserver, Transport};
use crate::error::{McpSnagError, Result};
use crate::protocol::{
    InitializeParams, InitializeResult, Notification, Request, Response, SESSION_HEADER,
};
use serde_json::value::RawValue;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct ClientOptions {
    pub endpoint: String,
    pub headers: BTreeMap<String, String>,
    /// Existing session to resume; skips the need for a handshake.
    pub session_id: Option<String>,
    pub timeout: Duration,
    /// Deliver SSE messages to the event handler as they arrive.
    pub stream: bool,
    pub observer: Option<Arc<dyn ExchangeObserver>>,
}

impl ClientOptions {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            headers: BTreeMap::new(),
            session_id: None,
            timeout: DEFAULT_TIMEOUT,
            stream: true,
            observer: None,
        }
    }
}

pub struct McpClient {
    transport: Transport,
    session: Session,
    request_id: AtomicI64,
    stream: bool,
}

impl McpClient {
    pub fn new(options: ClientOptions) -> Result<Self> {
        let mut transport = Transport::new(options.endpoint, options.timeout)?;
        for (name, value) in options.headers {
            transport.set_header(name, value);
        }
        if let Some(observer) = options.observer {
            transport.set_observer(observer);
        }

        let session = match options.session_id.filter(|id| !id.is_empty()) {
            Some(id) => {
                transport.set_header(SESSION_HEADER, id.clone());
                Session::with_id(id)
            }
            None => Session::default(),
        };

        Ok(Self {
            transport,
            session,
            request_id: AtomicI64::new(0),
            stream: options.stream,
        })
    }

    /// Allocates the next request id: 1, 2, 3, ... Ids are never reused,
    /// even when the request they were drawn for fails.
    pub fn next_id(&self) -> i64 {
        self.request_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Runs the MCP handshake: `initialize`, then `notifications/initialized`.
    ///
    /// The session is only updated once both messages went through, so a
    /// failed handshake leaves it as it was.
    pub async fn initialize(&mut self) -> Result<InitializeResult> {
        let request =
            Request::new(self.next_id(), "initialize").with_params(&InitializeParams::default())?;

        let exchange = self
            .transport
            .post_and_read_response(request.to_bytes()?, false, None)
            .await?;

        let response = exchange
            .response
            .ok_or(McpSnagError::MissingResponse("initialize"))?;
        if let Some(error) = response.error {
            return Err(error.into());
        }
        let raw = response
            .result
            .as_deref()
            .map(RawValue::get)
            .unwrap_or("null");
        let result: InitializeResult = serde_json::from_str(raw)
            .map_err(|e| McpSnagError::protocol("failed to parse initialize result", e))?;

        let session_id = exchange.session_id;
        let extra: Vec<(&str, &str)> = if session_id.is_empty() {
            Vec::new()
        } else {
            vec![(SESSION_HEADER, session_id.as_str())]
        };
        self.notify_with("notifications/initialized", None, &extra)
            .await
            .map_err(|e| McpSnagError::InitializedNotification(Box::new(e)))?;

        if !session_id.is_empty() {
            debug!(session_id = %session_id, "session established");
            self.transport.set_header(SESSION_HEADER, session_id.clone());
            self.session.id = session_id;
        }
        self.session.capabilities = Some(result.capabilities.clone());
        self.session.server_info = Some(result.server_info.clone());

        Ok(result)
    }

    /// Sends one request and returns the final response. A response carrying
    /// a JSON-RPC error is returned as `McpSnagError::Remote`, which still
    /// holds the response.
    pub async fn request(
        &self,
        method: &str,
        params: Option<&RawValue>,
        on_event: Option<&mut EventHandler<'_>>,
    ) -> Result<Option<Response>> {
        let mut request = Request::new(self.next_id(), method);
        if let Some(params) = params {
            request = request.with_params(params)?;
        }
        debug!(id = %request.id, method, "sending request");

        let exchange = self
            .transport
            .post_and_read_response(request.to_bytes()?, self.stream, on_event)
            .await?;

        match exchange.response {
            Some(response) => match response.error.clone() {
                Some(error) => Err(McpSnagError::Remote {
                    error,
                    response: Some(Box::new(response)),
                }),
                None => Ok(Some(response)),
            },
            None => Ok(None),
        }
    }

    /// Sends a notification. Servers normally answer 202 with no body.
    pub async fn notify(&self, method: &str, params: Option<&RawValue>) -> Result<()> {
        self.notify_with(method, params, &[]).await
    }

    /// `notify` with headers added to this one message only.
    async fn notify_with(
        &self,
        method: &str,
        params: Option<&RawValue>,
        extra: &[(&str, &str)],
    ) -> Result<()> {
        let mut notification = Notification::new(method);
        if let Some(params) = params {
            notification = notification.with_params(params)?;
        }
        debug!(method, "sending notification");
        self.transport
            .exchange(notification.to_bytes()?, extra, false, None)
            .await?;
        Ok(())
    }

    /// Sends `body` verbatim, without wrapping it in an envelope.
    pub async fn raw_request(
        &self,
        body: Vec<u8>,
        on_event: Option<&mut EventHandler<'_>>,
    ) -> Result<Exchange> {
        self.transport
            .post_and_read_response(body, self.stream, on_event)
            .await
    }
}
