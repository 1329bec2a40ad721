//! Public types for the RAG query API
use serde::Serialize;
use serde_json::Value;

/// Body of `POST /rag/query`. Only `query` is required; the optional
/// fields are omitted from the payload when unset.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RagQuery {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_state: Option<Value>,
}

impl RagQuery {
    pub fn new(query: &str) -> Self {
        Self {
            query: query.to_string(),
            ..Default::default()
        }
    }

    pub fn error_code(mut self, code: &str) -> Self {
        self.error_code = Some(code.to_string());
        self
    }

    pub fn device_state(mut self, state: Value) -> Self {
        self.device_state = Some(state);
        self
    }
}
