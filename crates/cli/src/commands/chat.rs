//! Chat command handler.
//!
//! Reads one message per line from stdin and answers each in turn. The
//! index build starts in the background before the first line arrives.

use clap::Args;
use helpdesk_core::{config::AppConfig, AppResult};
use helpdesk_knowledge::SupportBot;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Answer messages read from stdin
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Output as JSON lines
    #[arg(long)]
    pub json: bool,

    /// Don't start building the index until the first message
    #[arg(long)]
    pub lazy: bool,
}

impl ChatCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing chat command");

        let bot = SupportBot::from_config(config)?;
        if !self.lazy {
            let phase = bot.warm_up();
            tracing::debug!("Warm-up requested, index is {}", phase);
        }

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut answered = 0usize;

        while let Some(line) = lines.next_line().await? {
            let message = line.trim();
            if message.is_empty() {
                continue;
            }

            let answer = bot.answer(message).await?;
            answered += 1;

            if self.json {
                println!("{}", serde_json::to_string(&answer)?);
            } else {
                println!("{}", answer.response);
            }
        }

        tracing::info!("Chat finished after {} message(s)", answered);
        Ok(())
    }
}
