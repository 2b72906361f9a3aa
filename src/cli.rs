use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "otpbot")]
#[command(author, version, about = "Telegram bot for the OTP backend", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the bot with long polling
    Run {
        /// Skip updates that arrived while the bot was offline
        #[arg(long)]
        drop_pending: bool,
    },

    /// Check that the session store and the OTP backend are reachable
    Check,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_flags() {
        let cli = Cli::try_parse_from(["otpbot", "run", "--drop-pending"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Run { drop_pending: true })));
    }

    #[test]
    fn test_no_subcommand_is_allowed() {
        let cli = Cli::try_parse_from(["otpbot"]).unwrap();
        assert!(cli.command.is_none());
    }
}
