pub mod jsonrpc;
pub mod types;

pub use jsonrpc::{
    JsonRpcError, Notification, Request, RequestId, Response, UserRequest, JSONRPC_VERSION,
};
pub use types::{
    ClientCapabilities, Implementation, InitializeParams, InitializeResult, ServerCapabilities,
    MCP_PROTOCOL_VERSION, SESSION_HEADER,
};
