use anyhow::{Context, Result};
use std::path::Path;

use crate::config::Config;
use crate::conversation::{Conversation, Role};
use crate::interpreter::Acknowledgement;
use crate::lex::LexClient;

/// Run a single turn against `bot` and print the exchange
pub async fn send_once(config: &Config, bot: &str, text: &str) -> Result<()> {
    let client = LexClient::new(config).context("Failed to create bot client")?;
    let mut conversation = Conversation::new(config.ui.greeting.clone());
    conversation.set_input(text);

    let Some(outcome) = conversation.submit(&client, bot).await else {
        println!("Nothing to send.");
        return Ok(());
    };

    for message in conversation.messages().iter().skip(1) {
        let label = match message.role {
            Role::User => "You",
            Role::Bot => config.ui.bot_display_name.as_str(),
        };
        println!("{}: {}", label, message.text);
    }

    if let Some(confirmation) = outcome.confirmation {
        println!();
        match confirmation.acknowledgement {
            Acknowledgement::Banner => println!("{}", confirmation.text),
            Acknowledgement::Blocking => println!("*** {} ***", confirmation.text),
        }
    }

    if !outcome.delivered {
        anyhow::bail!("The assistant could not be reached");
    }
    Ok(())
}

/// Print the effective configuration
pub fn show_config(config: &Config, path: &Path) -> Result<()> {
    let rendered = toml::to_string_pretty(config)
        .context("Failed to serialize config")?;
    let state = if path.exists() { "" } else { " (not written yet, showing defaults)" };

    println!("# {}{}", path.display(), state);
    println!("{}", rendered);
    Ok(())
}

/// Write the default configuration unless a file already exists
pub fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        println!("Config already exists at {} (use --force to overwrite)", path.display());
        return Ok(());
    }

    Config::default().save_to(path)?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}
