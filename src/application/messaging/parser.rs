//! Command parser - Splits command text into a token and arguments

/// A command extracted from message text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// Lowercased token with the prefix and any `@botname` suffix removed
    pub name: String,
    /// Remaining words joined with single spaces
    pub args: String,
}

/// Parses inbound text into commands
#[derive(Debug, Clone, Copy)]
pub struct CommandParser {
    prefix: char,
}

impl CommandParser {
    pub fn new(prefix: char) -> Self {
        Self { prefix }
    }

    /// Returns `None` for text that does not start with the prefix
    pub fn parse(&self, text: &str) -> Option<ParsedCommand> {
        if !text.starts_with(self.prefix) {
            return None;
        }

        let mut parts = text.split_whitespace();
        let head = parts.next()?;
        let raw = head[self.prefix.len_utf8()..].to_lowercase();
        // "/menu@SomeBot" addresses one bot in a group with several
        let name = raw.split('@').next().unwrap_or_default().to_string();
        let args = parts.collect::<Vec<_>>().join(" ");

        Some(ParsedCommand { name, args })
    }
}

impl Default for CommandParser {
    fn default() -> Self {
        Self::new('/')
    }
}
