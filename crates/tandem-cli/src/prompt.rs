use anyhow::Result;

pub mod rustyline;

pub trait Prompt {
    /// Show agent output or a status line
    fn render(&mut self, text: &str);
    fn get_input(&mut self) -> Result<Input>;
    fn show_busy(&mut self);
    fn hide_busy(&mut self);
    fn close(&mut self);
    fn ready(&mut self) {
        self.render("Tandem is running! Type a message, or 'help' for commands.");
    }
}

#[derive(Debug, PartialEq)]
pub enum Input {
    /// Nothing usable was entered; ask again
    AskAgain,
    Message(String),
    Command(Command),
    Exit,
}

/// Words the interactive loop handles itself instead of sending to the model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Help,
    Clear,
    Info,
    Tools,
}

impl Input {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        match trimmed.to_lowercase().as_str() {
            "" => Input::AskAgain,
            "quit" | "exit" | "q" => Input::Exit,
            "help" => Input::Command(Command::Help),
            "clear" => Input::Command(Command::Clear),
            "info" => Input::Command(Command::Info),
            "tools" => Input::Command(Command::Tools),
            _ => Input::Message(trimmed.to_string()),
        }
    }
}

pub const HELP: &str = "\
Commands:
  quit, exit, q  End the session
  help           Show this help
  clear          Clear the conversation history
  info           Show session information
  tools          List available tools
Anything else is sent to the agent.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_input() {
        assert_eq!(Input::parse("  "), Input::AskAgain);
        assert_eq!(Input::parse("QUIT"), Input::Exit);
        assert_eq!(Input::parse("q"), Input::Exit);
        assert_eq!(Input::parse(" tools "), Input::Command(Command::Tools));
        assert_eq!(
            Input::parse(" list the files here "),
            Input::Message("list the files here".to_string())
        );
    }
}
