//! Bot initialization and command menu

use reqwest::ClientBuilder;
use secrecy::ExposeSecret;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use otscore::core::Settings;

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "open the main menu")]
    Start,
    #[command(description = "show your registration status")]
    Status,
    #[command(description = "about the platform and fees")]
    Help,
}

/// Creates a Bot instance with the configured token and HTTP timeout
///
/// # Returns
/// * `Ok(Bot)` - Successfully created bot instance
/// * `Err(anyhow::Error)` - The HTTP client could not be built
pub fn create_bot(settings: &Settings) -> anyhow::Result<Bot> {
    let client = ClientBuilder::new().timeout(settings.gateway_timeout).build()?;
    Ok(Bot::with_client(settings.bot_token.expose_secret(), client))
}

/// Sets up bot commands in Telegram UI
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    use teloxide::types::BotCommand;

    bot.set_my_commands(vec![
        BotCommand::new("start", "open the main menu"),
        BotCommand::new("status", "show your registration status"),
        BotCommand::new("help", "about the platform and fees"),
    ])
    .await?;

    Ok(())
}
