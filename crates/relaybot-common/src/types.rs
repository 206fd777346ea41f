use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a chat session on the messaging transport.
///
/// For Telegram this is the chat id; the core treats it as opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub i64);

impl ConversationId {
    pub fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub fn as_i64(self) -> i64 {
        self.0
    }
}

impl From<i64> for ConversationId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_bare_number() {
        let id = ConversationId::new(-987654321);
        assert_eq!(serde_json::to_string(&id).unwrap(), "-987654321");
        assert_eq!(id.to_string(), "-987654321");
    }
}
