//! JSON-RPC 2.0 envelopes as they travel over the wire.
//!
//! `params`, `result` and `error.data` are kept as raw JSON text: the client
//! never interprets a method's schema, it only forwards and prints it.

use crate::error::{McpSnagError, Result};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use std::fmt;

pub const JSONRPC_VERSION: &str = "2.0";

/// Correlation token of a request. Servers echo it back verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
}

impl From<i64> for RequestId {
    fn from(id: i64) -> Self {
        RequestId::Number(id)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        RequestId::String(id.to_string())
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        RequestId::String(id)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::Number(n) => write!(f, "{}", n),
            RequestId::String(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub jsonrpc: String,
    pub id: RequestId,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Box<RawValue>>,
}

impl Request {
    pub fn new(id: impl Into<RequestId>, method: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: id.into(),
            method: method.into(),
            params: None,
        }
    }

    /// Encodes `params` and attaches it to the request.
    pub fn with_params<P: Serialize + ?Sized>(mut self, params: &P) -> Result<Self> {
        self.params = Some(encode_params(params)?);
        Ok(self)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(McpSnagError::Serialization)
    }
}

/// A request that expects no reply. It has no `id` member at all on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Box<RawValue>>,
}

impl Notification {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params: None,
        }
    }

    pub fn with_params<P: Serialize + ?Sized>(mut self, params: &P) -> Result<Self> {
        self.params = Some(encode_params(params)?);
        Ok(self)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(McpSnagError::Serialization)
    }
}

/// A reply from the server. Received data is not validated beyond shape:
/// `result` and `error` may both be absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Box<RawValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl Response {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| McpSnagError::protocol("invalid JSON response", e))
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Box<RawValue>>,
}

impl fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for JsonRpcError {}

/// What the operator passes with `-d`: a method and optional params. The
/// client supplies the id.
#[derive(Debug, Clone, Deserialize)]
pub struct UserRequest {
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub params: Option<Box<RawValue>>,
}

impl UserRequest {
    pub fn parse(data: &str) -> Result<Self> {
        let request: UserRequest = serde_json::from_str(data)
            .map_err(|e| McpSnagError::InvalidRequest(format!("invalid JSON: {}", e)))?;
        if request.method.is_empty() {
            return Err(McpSnagError::InvalidRequest(
                "missing 'method' field in request".to_string(),
            ));
        }
        Ok(request)
    }
}

fn encode_params<P: Serialize + ?Sized>(params: &P) -> Result<Box<RawValue>> {
    serde_json::value::to_raw_value(params).map_err(McpSnagError::Serialization)
}
