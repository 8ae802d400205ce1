//! Tool result encoding.

use serde::Serialize;

use glbridge_core::Result;

use crate::protocol::ToolCallResult;

/// What a tool handler hands back to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutput {
    /// Successful text result
    Text(String),
    /// User-facing refusal, reported with `isError` set
    Refusal(String),
}

impl ToolOutput {
    /// JSON-encode a value.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        Ok(ToolOutput::Text(serde_json::to_string(value)?))
    }

    /// JSON-encode a listing. An empty listing is `[]`, never `null`.
    pub fn list<T: Serialize>(items: Vec<T>) -> Result<Self> {
        if items.is_empty() {
            return Ok(ToolOutput::Text("[]".to_string()));
        }
        Self::json(&items)
    }

    /// Raw text, passed through unchanged.
    pub fn text(text: impl Into<String>) -> Self {
        ToolOutput::Text(text.into())
    }

    pub fn refusal(message: impl Into<String>) -> Self {
        ToolOutput::Refusal(message.into())
    }

    pub fn is_refusal(&self) -> bool {
        matches!(self, ToolOutput::Refusal(_))
    }

    pub fn into_result(self) -> ToolCallResult {
        match self {
            ToolOutput::Text(text) => ToolCallResult::text(text),
            ToolOutput::Refusal(message) => ToolCallResult::error(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glbridge_core::types::Todo;

    #[test]
    fn test_empty_sequence_is_empty_array() {
        let output = ToolOutput::list(Vec::<Todo>::new()).unwrap();
        assert_eq!(output, ToolOutput::Text("[]".into()));

        let output = ToolOutput::list(vec![Todo {
            id: 3,
            ..Default::default()
        }])
        .unwrap();
        let ToolOutput::Text(text) = output else {
            panic!("expected text");
        };
        assert!(text.starts_with("[{\"id\":3"));
    }

    #[test]
    fn test_value_encoded_as_json() {
        let output = ToolOutput::json(&serde_json::json!({"id": 4})).unwrap();
        assert_eq!(output, ToolOutput::Text("{\"id\":4}".into()));
    }

    #[test]
    fn test_refusal_sets_error_flag() {
        let result = ToolOutput::refusal("issue is confidential").into_result();
        assert_eq!(result.is_error, Some(true));
        assert_eq!(result.first_text(), Some("issue is confidential"));

        let result = ToolOutput::text("log line").into_result();
        assert_eq!(result.is_error, None);
    }
}
