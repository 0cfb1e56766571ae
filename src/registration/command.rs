//! Slash commands recognized before the registration state machine.

/// A command that bypasses or overrides the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `/start`: restart registration from scratch.
    Start,
    /// `/mydata`: show the stored profile.
    MyData,
    /// `/regenerate`: build a new plan from the stored profile.
    Regenerate,
    /// `/delete`: ask for account deletion confirmation.
    Delete,
}

impl Command {
    /// Parse message content into a command, if it is one.
    ///
    /// Accepts Telegram's addressed form (`/start@SomeBot`) and ignores
    /// anything after the first whitespace.
    pub fn parse(content: &str) -> Option<Command> {
        let trimmed = content.trim();
        if !trimmed.starts_with('/') {
            return None;
        }
        let token = trimmed.split_whitespace().next()?;
        let name = token.split('@').next().unwrap_or(token).to_lowercase();

        match name.as_str() {
            "/start" => Some(Command::Start),
            "/mydata" => Some(Command::MyData),
            "/regenerate" => Some(Command::Regenerate),
            "/delete" => Some(Command::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "/start",
            Self::MyData => "/mydata",
            Self::Regenerate => "/regenerate",
            Self::Delete => "/delete",
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
