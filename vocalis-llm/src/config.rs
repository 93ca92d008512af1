use serde::{Deserialize, Serialize};

/// OpenAI-compatible base URL of the Zhipu open platform.
pub const ZHIPU_BASE_URL: &str = "https://open.bigmodel.cn/api/paas/v4";

pub const DEFAULT_CHAT_MODEL: &str = "glm-4.5";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
}

impl ChatRequest {
    /// A single-turn conversation: persona followed by one user message.
    pub fn single_turn(system_prompt: &str, user_message: &str) -> Self {
        Self {
            messages: vec![Message::system(system_prompt), Message::user(user_message)],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// First choice's message content. `None` when the provider omitted it.
    pub content: Option<String>,
}
