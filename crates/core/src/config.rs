//! Configuration management for the helpdesk.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Defaults
//! - Config file (`.helpdesk/config.yaml` or `HELPDESK_CONFIG`)
//! - Environment variables
//! - Command-line flags
//!
//! The configuration is workspace-centric: relative paths such as the
//! knowledge base file resolve against the workspace root.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Embedding providers the knowledge crate knows how to build.
pub const KNOWN_EMBEDDING_PROVIDERS: [&str; 2] = ["trigram", "ollama"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .helpdesk/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Support bot settings
    pub bot: BotConfig,

    /// Embedding provider settings
    pub embedding: EmbeddingSection,
}

/// Support bot settings (`bot:` section of config.yaml).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct BotConfig {
    /// Knowledge base file (YAML or JSON), relative to the workspace
    pub knowledge_base: PathBuf,

    /// Minimum cosine score for a match. `None` accepts the best hit.
    pub min_score: Option<f32>,

    /// How long one caller waits on an in-flight index build
    pub wait_timeout_secs: u64,

    /// Upper bound for a whole index build, embedding calls included
    pub build_timeout_secs: u64,

    /// Reply used when nothing in the knowledge base matches
    pub fallback_message: String,

    /// Reply used while the index is not built yet
    pub starting_message: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            knowledge_base: PathBuf::from(".helpdesk/faq.yaml"),
            min_score: None,
            wait_timeout_secs: 30,
            build_timeout_secs: 120,
            fallback_message: "Sorry, I don't have an answer for that yet. \
                               Please reach out to the student helpdesk."
                .to_string(),
            starting_message: "I'm still starting up. Please try again in a moment.".to_string(),
        }
    }
}

/// Embedding provider settings (`embedding:` section of config.yaml).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EmbeddingSection {
    /// Provider name: "trigram" or "ollama"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Provider endpoint (Ollama base URL)
    pub endpoint: Option<String>,

    /// Per-request timeout in seconds
    pub timeout: Option<u64>,

    /// Maximum texts per provider request
    pub batch_size: usize,
}

impl Default for EmbeddingSection {
    fn default() -> Self {
        Self {
            provider: "trigram".to_string(), // Offline default
            model: "trigram-v1".to_string(),
            dimensions: 384,
            endpoint: None,
            timeout: None,
            batch_size: 100,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    bot: Option<BotConfig>,
    embedding: Option<EmbeddingSection>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            log_level: None,
            verbose: false,
            no_color: false,
            bot: BotConfig::default(),
            embedding: EmbeddingSection::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and defaults.
    ///
    /// Environment variables:
    /// - `HELPDESK_WORKSPACE`: Override workspace path
    /// - `HELPDESK_CONFIG`: Path to config file
    /// - `HELPDESK_KNOWLEDGE_BASE`: Knowledge base file
    /// - `HELPDESK_EMBEDDING_PROVIDER`: Embedding provider
    /// - `HELPDESK_EMBEDDING_MODEL`: Embedding model
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use helpdesk_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Knowledge base: {:?}", config.knowledge_base_path());
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_from(None, None)
    }

    /// Like [`load`](Self::load), with an explicit workspace and config
    /// file taking precedence over the environment.
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        match workspace {
            Some(workspace) => config.workspace = workspace,
            None => {
                if let Ok(workspace) = std::env::var("HELPDESK_WORKSPACE") {
                    config.workspace = PathBuf::from(workspace);
                }
            }
        }

        config.config_file =
            config_file.or_else(|| std::env::var_os("HELPDESK_CONFIG").map(PathBuf::from));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.helpdesk_dir().join("config.yaml"));

        if config_path.exists() {
            tracing::debug!("Loading config file {:?}", config_path);
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file not found: {:?}",
                config_path
            )));
        }

        // Environment variables override YAML config
        if let Ok(path) = std::env::var("HELPDESK_KNOWLEDGE_BASE") {
            config.bot.knowledge_base = PathBuf::from(path);
        }

        if let Ok(provider) = std::env::var("HELPDESK_EMBEDDING_PROVIDER") {
            config.embedding.provider = provider;
        }

        if let Ok(model) = std::env::var("HELPDESK_EMBEDDING_MODEL") {
            config.embedding.model = model;
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var_os("NO_COLOR").is_some() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(ws) = config_file.workspace {
            if let Some(path) = ws.path {
                result.workspace = PathBuf::from(path);
            }
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(bot) = config_file.bot {
            result.bot = bot;
        }

        if let Some(embedding) = config_file.embedding {
            result.embedding = embedding;
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over environment variables and
    /// the config file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        knowledge_base: Option<PathBuf>,
        embedding_provider: Option<String>,
        embedding_model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(knowledge_base) = knowledge_base {
            self.bot.knowledge_base = knowledge_base;
        }

        if let Some(provider) = embedding_provider {
            self.embedding.provider = provider;
        }

        if let Some(model) = embedding_model {
            self.embedding.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .helpdesk directory.
    pub fn helpdesk_dir(&self) -> PathBuf {
        self.workspace.join(".helpdesk")
    }

    /// Knowledge base file, resolved against the workspace when relative.
    pub fn knowledge_base_path(&self) -> PathBuf {
        if self.bot.knowledge_base.is_absolute() {
            self.bot.knowledge_base.clone()
        } else {
            self.workspace.join(&self.bot.knowledge_base)
        }
    }

    /// Validate the bot and embedding settings.
    pub fn validate(&self) -> AppResult<()> {
        let provider = self.embedding.provider.as_str();
        if !KNOWN_EMBEDDING_PROVIDERS.contains(&provider) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                provider,
                KNOWN_EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "Embedding dimensions must be greater than zero".to_string(),
            ));
        }

        if self.embedding.batch_size == 0 {
            return Err(AppError::Config(
                "Embedding batch size must be greater than zero".to_string(),
            ));
        }

        if self.bot.wait_timeout_secs == 0 || self.bot.build_timeout_secs == 0 {
            return Err(AppError::Config(
                "Bot timeouts must be at least one second".to_string(),
            ));
        }

        if let Some(min_score) = self.bot.min_score {
            if !(-1.0..=1.0).contains(&min_score) {
                return Err(AppError::Config(format!(
                    "minScore must be within [-1, 1], got {}",
                    min_score
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.embedding.provider, "trigram");
        assert_eq!(config.embedding.dimensions, 384);
        assert_eq!(config.bot.min_score, None);
        assert!(!config.verbose);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_knowledge_base_path_resolves_against_workspace() {
        let mut config = AppConfig::default();
        config.workspace = PathBuf::from("/srv/portal");
        assert_eq!(
            config.knowledge_base_path(),
            PathBuf::from("/srv/portal/.helpdesk/faq.yaml")
        );

        config.bot.knowledge_base = PathBuf::from("/etc/helpdesk/faq.json");
        assert_eq!(
            config.knowledge_base_path(),
            PathBuf::from("/etc/helpdesk/faq.json")
        );
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default();
        let overridden = config.with_overrides(
            None,
            Some(PathBuf::from("kb.json")),
            Some("ollama".to_string()),
            Some("nomic-embed-text".to_string()),
            None,
            true,
            false,
        );

        assert_eq!(overridden.bot.knowledge_base, PathBuf::from("kb.json"));
        assert_eq!(overridden.embedding.provider, "ollama");
        assert_eq!(overridden.embedding.model, "nomic-embed-text");
        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_merge_partial_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(
            &path,
            r#"
bot:
  knowledgeBase: data/faq.json
  minScore: 0.35
embedding:
  provider: ollama
  model: nomic-embed-text
  dimensions: 768
logging:
  level: warn
  color: false
"#,
        )
        .unwrap();

        let merged = AppConfig::default().merge_yaml(&path).unwrap();
        assert_eq!(merged.bot.knowledge_base, PathBuf::from("data/faq.json"));
        assert_eq!(merged.bot.min_score, Some(0.35));
        // Unspecified keys keep their defaults
        assert_eq!(merged.bot.wait_timeout_secs, 30);
        assert_eq!(merged.embedding.dimensions, 768);
        assert_eq!(merged.embedding.batch_size, 100);
        assert_eq!(merged.log_level, Some("warn".to_string()));
        assert!(merged.no_color);
    }

    #[test]
    fn test_merge_invalid_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(&path, "bot: [not, a, map").unwrap();

        let result = AppConfig::default().merge_yaml(&path);
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_load_from_workspace_config() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join(".helpdesk")).unwrap();
        std::fs::write(
            temp.path().join(".helpdesk/config.yaml"),
            "bot:\n  waitTimeoutSecs: 5\n",
        )
        .unwrap();

        let config = AppConfig::load_from(Some(temp.path().to_path_buf()), None).unwrap();
        assert_eq!(config.workspace, temp.path());
        assert_eq!(config.bot.wait_timeout_secs, 5);
    }

    #[test]
    fn test_load_from_missing_explicit_config() {
        let temp = TempDir::new().unwrap();
        let result = AppConfig::load_from(
            Some(temp.path().to_path_buf()),
            Some(temp.path().join("missing.yaml")),
        );
        assert!(matches!(result, Err(AppError::Config(ref m)) if m.contains("missing.yaml")));
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = AppConfig::default();
        config.embedding.provider = "word2vec".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_threshold_range() {
        let mut config = AppConfig::default();
        config.bot.min_score = Some(1.5);
        assert!(config.validate().is_err());

        config.bot.min_score = Some(0.4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_timeouts() {
        let mut config = AppConfig::default();
        config.bot.build_timeout_secs = 0;
        assert!(config.validate().is_err());
    }
}
