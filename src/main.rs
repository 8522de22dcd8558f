use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;
mod conversation;
mod events;
mod interpreter;
mod lex;
mod logging;
mod ui;

use config::Config;

#[derive(Parser)]
#[command(name = "tripbot")]
#[command(version)]
#[command(about = "Chat with a travel booking bot from the terminal", long_about = None)]
struct Cli {
    /// Config file to use instead of ~/.tripbot/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Registered bot to talk to (defaults to `default_bot`)
    #[arg(long, global = true)]
    bot: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the chat window (default)
    Chat,
    /// Send one message and print the reply
    Send {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Inspect or create the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write the default configuration
    Init {
        #[arg(long)]
        force: bool,
    },
}

fn resolve_bot(config: &Config, requested: Option<String>) -> Result<String> {
    let bot = requested.unwrap_or_else(|| config.default_bot.clone());
    if config.bot(&bot).is_none() {
        let mut known: Vec<&str> = config.bots.keys().map(String::as_str).collect();
        known.sort_unstable();
        anyhow::bail!(
            "Bot '{}' is not registered (known bots: {})",
            bot,
            if known.is_empty() { "none".to_string() } else { known.join(", ") }
        );
    }
    Ok(bot)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let config_path = cli.config.clone().unwrap_or_else(|| config.config_path());

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            let _guard = logging::init_file_logging(&config.logs_dir())?;
            let bot = resolve_bot(&config, cli.bot)?;
            ui::app::run_chat(&config, bot).await
        }
        Commands::Send { text } => {
            let _guard = logging::init_stderr_logging()?;
            let bot = resolve_bot(&config, cli.bot)?;
            commands::send_once(&config, &bot, &text.join(" ")).await
        }
        Commands::Config { action } => {
            let _guard = logging::init_stderr_logging()?;
            match action {
                ConfigAction::Show => commands::show_config(&config, &config_path),
                ConfigAction::Init { force } => commands::init_config(&config_path, force),
            }
        }
    }
}
