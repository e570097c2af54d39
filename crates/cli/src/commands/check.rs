//! Check command handler.
//!
//! Builds the knowledge index eagerly so a broken knowledge base or an
//! unreachable embedding provider shows up before the bot goes live.

use clap::Args;
use helpdesk_core::{config::AppConfig, AppResult};
use helpdesk_knowledge::SupportBot;

/// Build the knowledge index and report its stats
#[derive(Args, Debug)]
pub struct CheckCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl CheckCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing check command");

        let bot = SupportBot::from_config(config)?;
        let stats = bot.reload().await?;

        if self.json {
            let output = serde_json::json!({
                "knowledgeBase": config.knowledge_base_path(),
                "phase": bot.phase(),
                "index": stats,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("Knowledge base: {}", config.knowledge_base_path().display());
            println!(
                "Indexed {} entries ({} dimensions) with {} / {} in {}ms",
                stats.entries, stats.dimensions, stats.provider, stats.model, stats.build_millis
            );
            println!("Built at: {}", stats.built_at.to_rfc3339());
        }

        Ok(())
    }
}
