use anyhow::Result;
use cliclack::spinner;
use console::style;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use super::{Input, Prompt};

const PROMPT: &str = "\x1b[1m\x1b[38;5;30m( T)> \x1b[0m";

pub struct RustylinePrompt {
    editor: DefaultEditor,
    spinner: Option<cliclack::ProgressBar>,
}

impl RustylinePrompt {
    pub fn new() -> Result<Self> {
        Ok(RustylinePrompt {
            editor: DefaultEditor::new()?,
            spinner: None,
        })
    }
}

impl Prompt for RustylinePrompt {
    fn render(&mut self, text: &str) {
        println!("{}", text);
    }

    fn get_input(&mut self) -> Result<Input> {
        match self.editor.readline(PROMPT) {
            Ok(line) => {
                let input = Input::parse(&line);
                if matches!(input, Input::Message(_)) {
                    let _ = self.editor.add_history_entry(line.as_str());
                }
                Ok(input)
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", style("Interrupted. Type 'quit' to exit.").dim());
                Ok(Input::AskAgain)
            }
            Err(ReadlineError::Eof) => Ok(Input::Exit),
            Err(e) => Err(e.into()),
        }
    }

    fn show_busy(&mut self) {
        let spin = spinner();
        spin.start("Thinking...");
        self.spinner = Some(spin);
    }

    fn hide_busy(&mut self) {
        if let Some(spin) = self.spinner.take() {
            spin.stop("");
        }
    }

    fn close(&mut self) {
        self.hide_busy();
        println!("{}", style("Goodbye!").dim());
    }
}
