//! Chat exchanges recorded in session history.

use crate::scope::Category;
use crate::Timestamp;
use serde::{Deserialize, Serialize};

/// Who wrote an exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Author {
    User,
    Assistant,
}

impl Author {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Assistant => "Assistant",
        }
    }
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatExchange {
    pub session_id: String,
    pub author: Author,
    pub text: String,
    pub category: Category,
    pub timestamp: Timestamp,
}

impl ChatExchange {
    pub fn user(
        session_id: impl Into<String>,
        text: impl Into<String>,
        category: Category,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            author: Author::User,
            text: text.into(),
            category,
            timestamp,
        }
    }

    pub fn assistant(
        session_id: impl Into<String>,
        text: impl Into<String>,
        category: Category,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            author: Author::Assistant,
            text: text.into(),
            category,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_constructors_set_author() {
        let now = Utc::now();
        let q = ChatExchange::user("s1", "How are sales?", Category::Analytics, now);
        let a = ChatExchange::assistant("s1", "Sales are up.", Category::Analytics, now);
        assert_eq!(q.author, Author::User);
        assert_eq!(a.author, Author::Assistant);
        assert_eq!(q.session_id, a.session_id);
        assert_eq!(Author::User.as_str(), "User");
    }

    #[test]
    fn test_exchange_serde_round_trip() {
        let ex = ChatExchange::user("s1", "hi", Category::Greeting, Utc::now());
        let json = serde_json::to_string(&ex).unwrap();
        assert!(json.contains("\"author\":\"user\""));
        let back: ChatExchange = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ex);
    }
}
