use sha2::{Digest, Sha256};

use crate::types::{Message, Role};

/// Session id used when the conversation carries no system message.
pub const DEFAULT_SESSION: &str = "default";

const KEY_CHARS: usize = 100;

/// Derive a stable session id from the conversation.
///
/// The first system message with non-empty text identifies the client, so its
/// first 100 characters are hashed into an 8-hex-digit id. Conversations
/// without one share `"default"`.
pub fn derive_session_id(messages: &[Message]) -> String {
    messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(Message::text)
        .find(|text| !text.is_empty())
        .map(|text| {
            let key: String = text.chars().take(KEY_CHARS).collect();
            let digest = Sha256::digest(key.as_bytes());
            digest
                .iter()
                .take(4)
                .map(|b| format!("{b:02x}"))
                .collect()
        })
        .unwrap_or_else(|| DEFAULT_SESSION.to_string())
}

/// A turn starts a new conversation when the client sent fewer messages than
/// last time (it cleared its history).
pub fn is_new_conversation(watermark: usize, message_count: usize) -> bool {
    message_count < watermark
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_without_system() {
        let messages = vec![Message::user("hi")];
        assert_eq!(derive_session_id(&messages), "default");
        assert_eq!(derive_session_id(&[]), "default");
    }

    #[test]
    fn test_empty_system_is_skipped() {
        let a = vec![Message::system(""), Message::system("agent"), Message::user("x")];
        let b = vec![Message::system("agent")];
        assert_eq!(derive_session_id(&a), derive_session_id(&b));
    }

    #[test]
    fn test_id_shape_and_stability() {
        let messages = vec![Message::system("You are a coding agent")];
        let id = derive_session_id(&messages);
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(id, derive_session_id(&messages));
    }

    #[test]
    fn test_only_prefix_matters() {
        let prefix = "p".repeat(100);
        let a = vec![Message::system(format!("{prefix}tail one"))];
        let b = vec![Message::system(format!("{prefix}tail two"))];
        assert_eq!(derive_session_id(&a), derive_session_id(&b));

        let c = vec![Message::system("another agent")];
        assert_ne!(derive_session_id(&a), derive_session_id(&c));
    }

    #[test]
    fn test_new_conversation_watermark() {
        assert!(is_new_conversation(12, 5));
        assert!(!is_new_conversation(12, 13));
        assert!(!is_new_conversation(12, 12));
        assert!(!is_new_conversation(0, 1));
    }
}
