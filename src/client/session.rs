use crate::protocol::{Implementation, ServerCapabilities};

/// What the client knows about its MCP session. The id is empty until a
/// server assigns one or the operator supplies it.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub id: String,
    pub capabilities: Option<ServerCapabilities>,
    pub server_info: Option<Implementation>,
}

impl Session {
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.id.is_empty()
    }
}
