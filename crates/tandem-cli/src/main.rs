use std::str::FromStr;

use anyhow::{anyhow, Result};
use clap::Parser;
use console::style;
use tandem::agent::{Agent, AgentOptions};
use tandem::config::Settings;
use tandem::providers::factory::ProviderType;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod prompt;
mod session;
mod status;

use prompt::rustyline::RustylinePrompt;
use session::Session;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Model backend (anthropic, openai or gemini); defaults to the first one with a key
    #[arg(short, long)]
    provider: Option<String>,

    /// Model name; defaults to the backend's default model
    #[arg(short, long)]
    model: Option<String>,

    /// Enable browser automation through MCP servers
    #[arg(long)]
    mcp: bool,

    /// Also expose every tool the MCP servers advertise to the model
    #[arg(long, requires = "mcp")]
    remote_tools: bool,

    /// Do not write a session log
    #[arg(long)]
    no_log: bool,

    /// Send a single message, print the answer and exit
    #[arg(long)]
    message: Option<String>,

    /// Print the configuration status and exit
    #[arg(long)]
    status: bool,
}

fn setup_logging(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let settings = Settings::new()?;
    setup_logging(&settings);

    println!("{}", status::config_status(&settings));
    println!();
    if cli.status {
        return Ok(());
    }

    let provider = cli
        .provider
        .as_deref()
        .map(|name| {
            ProviderType::from_str(name).map_err(|_| anyhow!("Unknown provider: {}", name))
        })
        .transpose()?;

    let options = AgentOptions {
        provider,
        model: cli.model.clone(),
        enable_logging: cli.no_log.then_some(false),
        enable_mcp: cli.mcp.then_some(true),
        system_prompt: None,
    };
    let mut agent = Agent::from_settings(&settings, options).await?;

    if agent.mcp_client().is_some() {
        let connected = agent.connect_mcp_servers().await;
        for (server, ok) in &connected {
            info!(server = %server, connected = ok, "MCP server");
        }
        if cli.remote_tools {
            let added = agent.register_remote_tools().await;
            info!(count = added, "registered remote MCP tools");
        }
    }

    let info = agent.session_info();
    println!(
        "{} {} / {}",
        style("Model:").bold(),
        info.model_provider,
        info.model_name
    );
    println!(
        "{} {}",
        style("Tools:").bold(),
        agent.tool_names().join(", ")
    );

    match cli.message {
        Some(message) => {
            let mut session = Session::new(agent, Box::new(NoPrompt));
            session.headless_start(&message).await
        }
        None => {
            let mut session = Session::new(agent, Box::new(RustylinePrompt::new()?));
            session.start().await
        }
    }
}

/// Prints answers without reading input, for one-shot runs
struct NoPrompt;

impl prompt::Prompt for NoPrompt {
    fn render(&mut self, text: &str) {
        println!("{}", text);
    }

    fn get_input(&mut self) -> Result<prompt::Input> {
        Ok(prompt::Input::Exit)
    }

    fn show_busy(&mut self) {}

    fn hide_busy(&mut self) {}

    fn close(&mut self) {}
}
