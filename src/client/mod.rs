pub mod client;
pub mod session;
pub mod sse;
pub mod transport;

pub use client::{ClientOptions, McpClient};
pub use session::Session;
pub use sse::{SseDecoder, SseEvent};
pub use transport::{EventHandler, Exchange, ExchangeObserver, Transport};
