use serde::{Deserialize, Serialize};

/// Speaker tag on a conversation turn, serialized lowercase on every wire
/// surface (chat request bodies and the completion backend API).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One role-tagged conversation turn. An ordered sequence of these forms the
/// conversation handed to the completion backend: at most one leading system
/// message, then user/assistant turns, ending with the newest user message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::{Message, Role};

    #[test]
    fn roles_serialize_lowercase() {
        let rendered = serde_json::to_string(&Message::assistant("好的")).expect("serialize");
        assert_eq!(rendered, r#"{"role":"assistant","content":"好的"}"#);
    }

    #[test]
    fn roles_deserialize_from_frontend_history_shape() {
        let message: Message =
            serde_json::from_str(r#"{"role":"user","content":"hello"}"#).expect("deserialize");
        assert_eq!(message.role, Role::User);
        assert_eq!(message.content, "hello");
    }
}
