//! Ask command handler.
//!
//! Answers messages given on the command line. All messages go through one
//! shared bot, so they share a single index build.

use clap::Args;
use futures::future::join_all;
use helpdesk_core::{config::AppConfig, AppResult};
use helpdesk_knowledge::{AnswerOutcome, SupportBot};

/// Answer one or more messages
#[derive(Args, Debug)]
pub struct AskCommand {
    /// Messages to answer
    #[arg(required = true)]
    pub messages: Vec<String>,

    /// Output as JSON (one `{"response": ...}` object per message)
    #[arg(long)]
    pub json: bool,

    /// Print the match score next to each answer
    #[arg(long, conflicts_with = "json")]
    pub scores: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command for {} message(s)", self.messages.len());
        tracing::debug!("Ask command options: {:?}", self);

        let bot = SupportBot::from_config(config)?;

        let answers = join_all(self.messages.iter().map(|message| bot.answer(message))).await;

        for (message, answer) in self.messages.iter().zip(answers) {
            let answer = answer?;

            if self.json {
                println!("{}", serde_json::to_string(&answer)?);
                continue;
            }

            if self.messages.len() > 1 {
                println!("> {}", message);
            }
            match answer.outcome {
                AnswerOutcome::Matched { score } if self.scores => {
                    println!("{} [score {:.3}]", answer.response, score)
                }
                _ => println!("{}", answer.response),
            }
        }

        Ok(())
    }
}
