use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "otsbot")]
#[command(author, version, about = "Telegram registration bot for OTS teachers", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Run the bot and the payment webhook server
    Run,

    /// Print the resolved configuration (secrets masked) and exit
    CheckConfig,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
