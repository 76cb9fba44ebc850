/// User commands
///
/// Commands are requests from the presentation layer (imperative). The
/// session runner applies them to the controller in arrival order.

/// Presentation layer intents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Start a focus session of the given length
    Start { minutes: u64 },

    /// Dismiss the break screen
    AcknowledgeBreak,

    /// End the current session immediately
    Abort,

    /// Jump straight to the break (debug affordance)
    SkipToBreak,

    /// Stop the runner
    Quit,
}

impl Command {
    /// Get a human-readable description of the command
    pub fn description(&self) -> String {
        match self {
            Command::Start { minutes } => format!("Start focus session: {} min", minutes),
            Command::AcknowledgeBreak => "Acknowledge break".to_string(),
            Command::Abort => "Abort session".to_string(),
            Command::SkipToBreak => "Skip to break".to_string(),
            Command::Quit => "Quit".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_description() {
        assert_eq!(
            Command::Start { minutes: 45 }.description(),
            "Start focus session: 45 min"
        );
        assert_eq!(Command::Abort.description(), "Abort session");
    }
}
