use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;

mod cli;
mod telegram;

use cli::{Cli, Commands};
use otscore::core::web_server::start_web_server;
use otscore::core::{init_logger, log_configuration, Settings};
use otscore::Core;
use telegram::messages::Pricing;
use telegram::{create_bot, schema, setup_bot_commands, HandlerDeps, Notifier, TelegramDirectory};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Environment first so LOG_FILE_PATH from .env is honoured
    let _ = dotenvy::dotenv();
    let settings = Settings::from_env();

    // Initialize logger (console + file)
    init_logger(&settings.log_file_path)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_bot(settings).await,
        Commands::CheckConfig => check_config(&settings),
    }
}

/// Prints the resolved configuration and fails when it is incomplete.
fn check_config(settings: &Settings) -> Result<()> {
    for (name, value) in settings.describe() {
        println!("{:<24} {}", name, value);
    }
    settings.validate()?;
    println!("Configuration OK");
    Ok(())
}

async fn run_bot(settings: Settings) -> Result<()> {
    log_configuration(&settings);
    if let Err(e) = settings.validate() {
        log::error!("Refusing to start: {}", e);
        return Err(e.into());
    }

    let bot = create_bot(&settings)?;
    let review_channel = ChatId(settings.review_channel_id.unwrap_or_default());
    let directory = Arc::new(TelegramDirectory::new(bot.clone(), review_channel));
    let (core, events) = Core::with_chapa(&settings, directory)?;
    let core = Arc::new(core);
    let pricing = Arc::new(Pricing::from_settings(&settings));

    // Payment webhook server
    let port = settings.port;
    let payments = Arc::clone(&core.payments);
    tokio::spawn(async move {
        if let Err(e) = start_web_server(port, payments).await {
            log::error!("Web server error: {}", e);
        }
    });

    // Session sweeper
    tokio::spawn(Arc::clone(&core).run_sweeper(settings.sweep_interval, settings.session_timeout));

    // Registration events -> Telegram messages
    let notifier = Notifier::new(bot.clone(), Arc::clone(&core), Arc::clone(&pricing));
    tokio::spawn(notifier.run(events));

    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to set bot commands: {}", e);
    }

    log::info!("================================================");
    log::info!("🎉 OTS registration bot is up, webhook on port {}", port);
    log::info!("📡 Ready to receive updates!");
    log::info!("================================================");

    let handler = schema(HandlerDeps::new(core, pricing));
    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    log::info!("Dispatcher shutdown gracefully");
    Ok(())
}
