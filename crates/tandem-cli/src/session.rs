use anyhow::Result;
use console::style;
use tandem::agent::Agent;

use crate::prompt::{Command, Input, Prompt, HELP};

pub struct Session<'a> {
    agent: Agent,
    prompt: Box<dyn Prompt + 'a>,
}

impl<'a> Session<'a> {
    pub fn new(agent: Agent, prompt: Box<dyn Prompt + 'a>) -> Self {
        Session { agent, prompt }
    }

    /// Read-eval loop until the user exits; the agent is cleaned up on the way out
    pub async fn start(&mut self) -> Result<()> {
        self.prompt.ready();
        loop {
            let input = match self.prompt.get_input() {
                Ok(input) => input,
                Err(e) => {
                    self.prompt.render(&format!("Input error: {}", e));
                    break;
                }
            };
            match input {
                Input::AskAgain => continue,
                Input::Exit => break,
                Input::Command(command) => self.run_command(command),
                Input::Message(text) => self.send(&text).await,
            }
        }
        self.close().await;
        Ok(())
    }

    /// Answer one message and exit
    pub async fn headless_start(&mut self, message: &str) -> Result<()> {
        self.send(message).await;
        self.agent.cleanup().await;
        Ok(())
    }

    async fn send(&mut self, text: &str) {
        self.prompt.show_busy();
        let answer = self.agent.chat(text).await;
        self.prompt.hide_busy();
        self.prompt.render(&answer);
    }

    fn run_command(&mut self, command: Command) {
        match command {
            Command::Help => self.prompt.render(HELP),
            Command::Clear => {
                self.agent.clear_history();
                self.prompt.render("Conversation history cleared.");
            }
            Command::Info => {
                let info = self.agent.session_info();
                let rendered = serde_json::to_string_pretty(&info)
                    .unwrap_or_else(|e| format!("Could not render session info: {}", e));
                self.prompt.render(&rendered);
            }
            Command::Tools => {
                let mut lines = vec![style("Available tools:").bold().to_string()];
                for tool in self.agent.tool_schemas() {
                    lines.push(format!("  {:<20} {}", tool.name, tool.description));
                }
                self.prompt.render(&lines.join("\n"));
            }
        }
    }

    async fn close(&mut self) {
        self.agent.cleanup().await;
        self.prompt.close();
    }
}
