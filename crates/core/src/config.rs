//! Configuration management for UniGuide.
//!
//! Configuration is assembled once at process start from, in increasing
//! precedence:
//! - Built-in defaults
//! - A YAML config file (`.uniguide/config.yaml` or `UNIGUIDE_CONFIG`)
//! - Environment variables
//! - Command-line flags
//!
//! There is no runtime reconfiguration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// LLM providers the factory knows how to build.
pub const KNOWN_PROVIDERS: [&str; 2] = ["gemini", "ollama"];

/// Embedding providers the index knows how to build.
pub const KNOWN_EMBEDDING_PROVIDERS: [&str; 2] = ["trigram", "ollama"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Workspace root (contains `.uniguide/`)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Relational database file, relative paths resolve against the workspace
    pub database: PathBuf,

    /// Vector index file, relative paths resolve against the workspace
    pub index: PathBuf,

    /// Name of the live vector collection
    pub collection_name: String,

    /// Generative model provider ("gemini", "ollama")
    pub provider: String,

    /// Generative model identifier
    pub model: String,

    /// Custom endpoint for the generative model provider
    pub llm_endpoint: Option<String>,

    /// API key for the generative model provider
    pub api_key: Option<String>,

    /// Environment variable holding the API key, when not given directly
    pub api_key_env: Option<String>,

    /// HTTP request timeout for external calls
    pub request_timeout_secs: u64,

    /// Embedding settings for the vector index
    pub embedding: EmbeddingSettings,

    /// Natural language the assistant answers in
    pub answer_language: String,

    /// Debug mode (implies debug logging)
    pub debug: bool,

    /// Hosts external endpoints may point at; empty disables the check
    pub allowed_hosts: Vec<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

/// Embedding configuration shared by the index and the rebuild controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    /// Provider name: "trigram" (built-in, offline) or "ollama"
    pub provider: String,

    /// Model identifier reported in stats
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Documents embedded per request during a rebuild
    pub batch_size: usize,

    /// Custom endpoint for network providers
    pub endpoint: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            batch_size: 100,
            endpoint: None,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    database: Option<DatabaseSection>,
    index: Option<IndexSection>,
    llm: Option<LlmSection>,
    embedding: Option<EmbeddingSection>,
    chat: Option<ChatSection>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DatabaseSection {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexSection {
    path: Option<String>,
    collection: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LlmSection {
    provider: Option<String>,
    model: Option<String>,
    endpoint: Option<String>,
    #[serde(rename = "apiKeyEnv")]
    api_key_env: Option<String>,
    #[serde(rename = "timeoutSecs")]
    timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EmbeddingSection {
    provider: Option<String>,
    model: Option<String>,
    dimensions: Option<usize>,
    #[serde(rename = "batchSize")]
    batch_size: Option<usize>,
    endpoint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatSection {
    language: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            database: PathBuf::from("university.sqlite3"),
            index: PathBuf::from(".uniguide/vectors.sqlite"),
            collection_name: "universities".to_string(),
            provider: "gemini".to_string(),
            model: "gemini-2.5-flash".to_string(),
            llm_endpoint: None,
            api_key: None,
            api_key_env: None,
            request_timeout_secs: 60,
            embedding: EmbeddingSettings::default(),
            answer_language: "English".to_string(),
            debug: false,
            allowed_hosts: vec!["127.0.0.1".to_string(), "localhost".to_string()],
            log_level: None,
            verbose: false,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the config file and the environment.
    ///
    /// Environment variables:
    /// - `UNIGUIDE_WORKSPACE`: Override workspace path
    /// - `UNIGUIDE_CONFIG`: Path to config file
    /// - `DATABASE_URL`: `sqlite://<path>` or a bare path; wins over `DB_NAME`
    /// - `DB_NAME`: Database file name inside the workspace
    /// - `UNIGUIDE_INDEX_PATH`: Vector index file
    /// - `UNIGUIDE_COLLECTION`: Live collection name
    /// - `UNIGUIDE_PROVIDER` / `UNIGUIDE_MODEL`: Generative model selection
    /// - `UNIGUIDE_LLM_ENDPOINT`: Custom provider endpoint
    /// - `GEMINI_API_KEY` / `UNIGUIDE_API_KEY`: API key
    /// - `UNIGUIDE_LANGUAGE`: Answer language
    /// - `DEBUG`: Debug mode
    /// - `ALLOWED_HOSTS`: Comma separated endpoint host allowlist
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        Self::load_from(None, None)
    }

    /// Load configuration with an explicit workspace and/or config file,
    /// as given on the command line.
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) = workspace.or_else(|| env_path("UNIGUIDE_WORKSPACE")) {
            config.workspace = workspace;
        }

        config.config_file = config_file.or_else(|| env_path("UNIGUIDE_CONFIG"));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.uniguide_dir().join("config.yaml"),
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file does not exist: {:?}",
                config_path
            )));
        }

        config.apply_env()?;

        Ok(config)
    }

    /// Environment variables override the YAML config.
    fn apply_env(&mut self) -> AppResult<()> {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database = parse_database_url(&url)?;
        } else if let Ok(name) = std::env::var("DB_NAME") {
            self.database = PathBuf::from(name);
        }

        if let Some(index) = env_path("UNIGUIDE_INDEX_PATH") {
            self.index = index;
        }

        if let Ok(collection) = std::env::var("UNIGUIDE_COLLECTION") {
            self.collection_name = collection;
        }

        if let Ok(provider) = std::env::var("UNIGUIDE_PROVIDER") {
            self.provider = provider;
        }

        if let Ok(model) = std::env::var("UNIGUIDE_MODEL") {
            self.model = model;
        }

        if let Ok(endpoint) = std::env::var("UNIGUIDE_LLM_ENDPOINT") {
            self.llm_endpoint = Some(endpoint);
        }

        if let Some(key) = non_empty_env("GEMINI_API_KEY").or_else(|| non_empty_env("UNIGUIDE_API_KEY")) {
            self.api_key = Some(key);
        }

        if let Ok(language) = std::env::var("UNIGUIDE_LANGUAGE") {
            self.answer_language = language;
        }

        if let Ok(debug) = std::env::var("DEBUG") {
            self.debug = parse_flag(&debug);
        }

        if let Ok(hosts) = std::env::var("ALLOWED_HOSTS") {
            self.allowed_hosts = parse_host_list(&hosts);
        }

        if let Some(level) = non_empty_env("RUST_LOG") {
            self.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            self.no_color = true;
        }

        if self.debug && self.log_level.is_none() {
            self.log_level = Some("debug".to_string());
        }

        Ok(())
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        Ok(self.merge_file(config_file))
    }

    fn merge_file(&self, config_file: ConfigFile) -> Self {
        let mut result = self.clone();

        if let Some(path) = config_file.database.and_then(|db| db.path) {
            result.database = PathBuf::from(path);
        }

        if let Some(index) = config_file.index {
            if let Some(path) = index.path {
                result.index = PathBuf::from(path);
            }
            if let Some(collection) = index.collection {
                result.collection_name = collection;
            }
        }

        if let Some(llm) = config_file.llm {
            if let Some(provider) = llm.provider {
                result.provider = provider;
            }
            if let Some(model) = llm.model {
                result.model = model;
            }
            if llm.endpoint.is_some() {
                result.llm_endpoint = llm.endpoint;
            }
            if llm.api_key_env.is_some() {
                result.api_key_env = llm.api_key_env;
            }
            if let Some(timeout) = llm.timeout_secs {
                result.request_timeout_secs = timeout;
            }
        }

        if let Some(embedding) = config_file.embedding {
            if let Some(provider) = embedding.provider {
                result.embedding.provider = provider;
            }
            if let Some(model) = embedding.model {
                result.embedding.model = model;
            }
            if let Some(dimensions) = embedding.dimensions {
                result.embedding.dimensions = dimensions;
            }
            if let Some(batch_size) = embedding.batch_size {
                result.embedding.batch_size = batch_size;
            }
            if embedding.endpoint.is_some() {
                result.embedding.endpoint = embedding.endpoint;
            }
        }

        if let Some(language) = config_file.chat.and_then(|chat| chat.language) {
            result.answer_language = language;
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        result
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over the environment and the
    /// config file.
    pub fn with_overrides(
        mut self,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
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

    /// Get the path to the `.uniguide` directory.
    pub fn uniguide_dir(&self) -> PathBuf {
        self.workspace.join(".uniguide")
    }

    /// Ensure the `.uniguide` directory exists.
    pub fn ensure_uniguide_dir(&self) -> AppResult<()> {
        let dir = self.uniguide_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("Failed to create .uniguide directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Resolved path of the relational database file.
    pub fn database_path(&self) -> PathBuf {
        self.resolve(&self.database)
    }

    /// Resolved path of the vector index file.
    pub fn index_path(&self) -> PathBuf {
        self.resolve(&self.index)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace.join(path)
        }
    }

    /// Resolve the API key: explicit key first, then the configured env var.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        self.api_key_env.as_deref().and_then(non_empty_env)
    }

    /// Validate configuration for the active providers.
    pub fn validate(&self) -> AppResult<()> {
        let provider = self.provider.to_lowercase();
        if !KNOWN_PROVIDERS.contains(&provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if provider == "gemini" && self.resolve_api_key().is_none() {
            return Err(AppError::Config(
                "Gemini provider requires an API key (set GEMINI_API_KEY)".to_string(),
            ));
        }

        if let Some(endpoint) = &self.llm_endpoint {
            self.check_allowed_host(endpoint)?;
        }

        self.validate_embedding()
    }

    /// Validate only what indexing needs: the embedding section and the
    /// collection name. Admin commands use this so they run without a model key.
    pub fn validate_embedding(&self) -> AppResult<()> {
        let embedding_provider = self.embedding.provider.to_lowercase();
        if !KNOWN_EMBEDDING_PROVIDERS.contains(&embedding_provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding.provider,
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

        if self.collection_name.trim().is_empty() {
            return Err(AppError::Config("Collection name cannot be empty".to_string()));
        }

        if let Some(endpoint) = &self.embedding.endpoint {
            self.check_allowed_host(endpoint)?;
        }

        Ok(())
    }

    /// Reject endpoints whose host is missing from a non-empty allowlist.
    fn check_allowed_host(&self, endpoint: &str) -> AppResult<()> {
        if self.allowed_hosts.is_empty() || self.allowed_hosts.iter().any(|h| h == "*") {
            return Ok(());
        }

        let host = host_of(endpoint)
            .ok_or_else(|| AppError::Config(format!("Invalid endpoint URL: {}", endpoint)))?;

        if self
            .allowed_hosts
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(host))
        {
            Ok(())
        } else {
            Err(AppError::Config(format!(
                "Endpoint host '{}' is not in ALLOWED_HOSTS ({})",
                host,
                self.allowed_hosts.join(", ")
            )))
        }
    }
}

/// Convert a `DATABASE_URL` into a SQLite file path.
///
/// Accepts `sqlite://<path>`, `sqlite:<path>` and bare paths.
pub fn parse_database_url(url: &str) -> AppResult<PathBuf> {
    let url = url.trim();
    if url.is_empty() {
        return Err(AppError::Config("DATABASE_URL is empty".to_string()));
    }

    if let Some(path) = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
    {
        if path.is_empty() {
            return Err(AppError::Config(format!("DATABASE_URL has no path: {}", url)));
        }
        return Ok(PathBuf::from(path));
    }

    if let Some((scheme, _)) = url.split_once("://") {
        return Err(AppError::Config(format!(
            "Unsupported database scheme '{}': only sqlite is supported",
            scheme
        )));
    }

    Ok(PathBuf::from(url))
}

/// Interpret common truthy spellings (`True`, `true`, `1`, `yes`, `on`).
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

/// Split a comma separated host list, dropping blanks.
pub fn parse_host_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(str::to_string)
        .collect()
}

/// Extract the host part of an URL (`http://user@host:port/path` -> `host`).
pub fn host_of(url: &str) -> Option<&str> {
    let rest = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    let authority = rest.split(['/', '?', '#']).next()?;
    let authority = authority.rsplit_once('@').map(|(_, h)| h).unwrap_or(authority);

    let host = if let Some(stripped) = authority.strip_prefix('[') {
        stripped.split(']').next()?
    } else {
        authority.split(':').next()?
    };

    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

fn env_path(name: &str) -> Option<PathBuf> {
    non_empty_env(name).map(PathBuf::from)
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.provider, "gemini");
        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.collection_name, "universities");
        assert_eq!(config.embedding.provider, "trigram");
        assert!(!config.debug);
        assert!(!config.verbose);
    }

    #[test]
    fn test_relative_paths_resolve_against_workspace() {
        let config = AppConfig {
            workspace: PathBuf::from("/srv/uni"),
            ..AppConfig::default()
        };

        assert_eq!(config.database_path(), PathBuf::from("/srv/uni/university.sqlite3"));
        assert_eq!(config.index_path(), PathBuf::from("/srv/uni/.uniguide/vectors.sqlite"));
        assert!(config.uniguide_dir().ends_with(".uniguide"));
    }

    #[test]
    fn test_with_overrides() {
        let overridden = AppConfig::default().with_overrides(
            Some("ollama".to_string()),
            Some("llama3.2".to_string()),
            None,
            true,
            false,
        );

        assert_eq!(overridden.provider, "ollama");
        assert_eq!(overridden.model, "llama3.2");
        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_merge_yaml_sections() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(
            &path,
            r#"
database:
  path: data/unis.sqlite3
index:
  collection: unis_test
llm:
  provider: ollama
  model: llama3.2
  timeoutSecs: 5
embedding:
  dimensions: 128
  batchSize: 10
chat:
  language: Vietnamese
logging:
  color: false
"#,
        )
        .unwrap();

        let merged = AppConfig::default().merge_yaml(&path).unwrap();
        assert_eq!(merged.database, PathBuf::from("data/unis.sqlite3"));
        assert_eq!(merged.collection_name, "unis_test");
        assert_eq!(merged.provider, "ollama");
        assert_eq!(merged.request_timeout_secs, 5);
        assert_eq!(merged.embedding.dimensions, 128);
        assert_eq!(merged.embedding.batch_size, 10);
        assert_eq!(merged.embedding.provider, "trigram");
        assert_eq!(merged.answer_language, "Vietnamese");
        assert!(merged.no_color);
    }

    #[test]
    fn test_parse_database_url() {
        assert_eq!(
            parse_database_url("sqlite:///var/lib/uni.db").unwrap(),
            PathBuf::from("/var/lib/uni.db")
        );
        assert_eq!(
            parse_database_url("sqlite:uni.db").unwrap(),
            PathBuf::from("uni.db")
        );
        assert_eq!(parse_database_url("uni.db").unwrap(), PathBuf::from("uni.db"));
        assert!(parse_database_url("postgres://db.example.com/uni").is_err());
        assert!(parse_database_url("").is_err());
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("True"));
        assert!(parse_flag("1"));
        assert!(!parse_flag("False"));
        assert!(!parse_flag(""));
    }

    #[test]
    fn test_host_of() {
        assert_eq!(host_of("http://localhost:11434"), Some("localhost"));
        assert_eq!(
            host_of("https://generativelanguage.googleapis.com/v1beta"),
            Some("generativelanguage.googleapis.com")
        );
        assert_eq!(host_of("http://user@10.0.0.2:8080/x"), Some("10.0.0.2"));
        assert_eq!(host_of("http://[::1]:11434"), Some("::1"));
        assert_eq!(host_of("http://"), None);
    }

    #[test]
    fn test_validate_unknown_provider() {
        let config = AppConfig {
            provider: "unknown".to_string(),
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_gemini_requires_key() {
        let config = AppConfig {
            api_key: None,
            api_key_env: None,
            ..AppConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("API key"));

        let config = AppConfig {
            api_key: Some("test-key".to_string()),
            ..AppConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_allowed_hosts() {
        let config = AppConfig {
            provider: "ollama".to_string(),
            llm_endpoint: Some("http://gpu-box:11434".to_string()),
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());

        let config = AppConfig {
            allowed_hosts: parse_host_list("localhost, gpu-box"),
            ..config
        };
        assert!(config.validate().is_ok());

        let config = AppConfig {
            allowed_hosts: Vec::new(),
            ..config
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_embedding_ignores_llm_settings() {
        let config = AppConfig {
            provider: "gemini".to_string(),
            api_key: None,
            api_key_env: None,
            embedding: EmbeddingSettings {
                provider: "ollama".to_string(),
                endpoint: Some("http://embed-box:11434".to_string()),
                ..EmbeddingSettings::default()
            },
            ..AppConfig::default()
        };
        let err = config.validate_embedding().unwrap_err();
        assert!(err.to_string().contains("embed-box"));

        let config = AppConfig {
            allowed_hosts: parse_host_list("embed-box"),
            ..config
        };
        assert!(config.validate_embedding().is_ok());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_missing_config_file() {
        let temp = TempDir::new().unwrap();
        let result = AppConfig::load_from(
            Some(temp.path().to_path_buf()),
            Some(temp.path().join("missing.yaml")),
        );
        assert!(result.is_err());
    }
}
