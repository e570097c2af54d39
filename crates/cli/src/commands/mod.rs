//! Command handlers for the helpdesk CLI.

pub mod ask;
pub mod chat;
pub mod check;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use chat::ChatCommand;
pub use check::CheckCommand;
