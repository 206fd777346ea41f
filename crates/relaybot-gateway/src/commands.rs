//! Chat control commands.
//!
//! Anything that is not one of these commands is forwarded to the completion
//! backend, including unknown slash commands.

pub const WELCOME_TEXT: &str = "🤖 Hi! I'm an AI bot. Send me anything!";
pub const CLEARED_TEXT: &str = "🗑️ History cleared!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Start a fresh session: clear history and greet.
    Start,
    /// Clear the conversation history.
    Clear,
    /// Show which API key is active.
    Keys,
}

/// Parse a message as a control command.
///
/// The command must be the whole message. A trailing `@botname` (as Telegram
/// sends in groups) is accepted.
pub fn parse(text: &str) -> Option<Command> {
    let trimmed = text.trim();
    if !trimmed.starts_with('/') || trimmed.contains(char::is_whitespace) {
        return None;
    }

    let base = trimmed.split('@').next().unwrap_or(trimmed).to_ascii_lowercase();
    match base.as_str() {
        "/start" => Some(Command::Start),
        "/clear" => Some(Command::Clear),
        "/keys" => Some(Command::Keys),
        _ => None,
    }
}

/// Reply text for `/keys`, with a 1-based key number.
pub fn keys_text(current_slot: usize, pool_size: usize) -> String {
    format!("🔑 Using key #{} of {}", current_slot + 1, pool_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_commands() {
        assert_eq!(parse("/start"), Some(Command::Start));
        assert_eq!(parse("/clear"), Some(Command::Clear));
        assert_eq!(parse("/keys"), Some(Command::Keys));
    }

    #[test]
    fn accepts_bot_suffix_and_case() {
        assert_eq!(parse("/clear@relay_bot"), Some(Command::Clear));
        assert_eq!(parse("  /KEYS "), Some(Command::Keys));
    }

    #[test]
    fn regular_text_is_not_a_command() {
        assert_eq!(parse("hello"), None);
        assert_eq!(parse("what does /clear do?"), None);
        assert_eq!(parse("/clear everything please"), None);
    }

    #[test]
    fn unknown_commands_are_forwarded() {
        assert_eq!(parse("/help"), None);
        assert_eq!(parse("/"), None);
    }

    #[test]
    fn keys_text_is_one_based() {
        assert_eq!(keys_text(0, 3), "🔑 Using key #1 of 3");
        assert_eq!(keys_text(2, 3), "🔑 Using key #3 of 3");
    }
}
