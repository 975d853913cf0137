use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ChatRole {
    #[serde(rename = "user")]
    #[strum(serialize = "user")]
    User,
    #[serde(rename = "assistant")]
    #[strum(serialize = "assistant")]
    Assistant,
    #[serde(rename = "system")]
    #[strum(serialize = "system")]
    System,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Body of `POST /api/chat`.
///
/// `enableWebSearch` and `userQuery` may be omitted by the caller.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub enable_web_search: bool,
    #[serde(default)]
    pub user_query: String,
}

impl ChatRequest {
    /// True when the caller asked for augmentation and gave something to search for.
    #[must_use]
    pub fn wants_search(&self) -> bool {
        self.enable_web_search && !self.user_query.trim().is_empty()
    }
}

/// Body of `POST /api/search`.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: Option<String>,
}

/// Response of `POST /api/search`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SearchResponse {
    pub results: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_role_serialization() {
        assert_eq!(serde_json::to_string(&ChatRole::User).unwrap(), r#""user""#);
        assert_eq!(serde_json::to_string(&ChatRole::Assistant).unwrap(), r#""assistant""#);
        assert_eq!(serde_json::to_string(&ChatRole::System).unwrap(), r#""system""#);
    }

    #[test]
    fn test_chat_role_display_matches_wire_name() {
        assert_eq!(ChatRole::System.to_string(), "system");
        assert_eq!(ChatRole::Assistant.to_string(), "assistant");
    }

    #[test]
    fn test_chat_request_defaults_optional_fields() {
        let request: ChatRequest =
            serde_json::from_str(r#"{"messages":[{"role":"user","content":"Hi"}]}"#).unwrap();

        assert_eq!(request.messages.len(), 1);
        assert!(!request.enable_web_search);
        assert!(request.user_query.is_empty());
        assert!(!request.wants_search());
    }

    #[test]
    fn test_chat_request_reads_camel_case_fields() {
        let request: ChatRequest = serde_json::from_str(
            r#"{"messages":[],"enableWebSearch":true,"userQuery":"best vitamin C serum"}"#,
        )
        .unwrap();

        assert!(request.enable_web_search);
        assert_eq!(request.user_query, "best vitamin C serum");
        assert!(request.wants_search());
    }

    #[test]
    fn test_blank_query_does_not_want_search() {
        let request = ChatRequest {
            messages: vec![],
            enable_web_search: true,
            user_query: "   ".to_string(),
        };
        assert!(!request.wants_search());
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        let parsed = serde_json::from_str::<ChatMessage>(r#"{"role":"tool","content":"x"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_search_request_missing_query() {
        let request: SearchRequest = serde_json::from_str("{}").unwrap();
        assert!(request.query.is_none());
    }
}
