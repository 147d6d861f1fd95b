//! Configuration module for kbsync.
//!
//! Provides typed configuration structs that map to the YAML configuration
//! file, with loading, validation, and defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level configuration for kbsync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub repository: RepositoryConfig,
    pub ai: AiConfig,
    pub sync: SyncConfig,
    pub tagging: TaggingConfig,
    pub chunking: ChunkingConfig,
    pub folders: FoldersConfig,
    pub logging: LoggingConfig,
}

/// Content repository connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Base URL of the repository REST API.
    pub base_url: String,
    /// Basic-auth username.
    pub username: String,
    /// Basic-auth password.
    pub password: String,
    /// Name of the repository root folder for logical paths.
    pub root_name: String,
}

/// AI service connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Base URL of the AI ingestion/tagging service.
    pub base_url: String,
}

/// Synchronization engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Aspect marking folders in the content-sync scope.
    pub aspect: String,
    /// Folder property storing the last full publish time.
    pub published_property: String,
    /// Folder property storing the last sync touch time.
    pub updated_property: String,
    /// Page size for bootstrap document queries.
    pub batch_size: u32,
    /// Worker pool size for draining the deferred event queue.
    pub drain_workers: usize,
    /// Bounded parallelism for document uploads during bulk sync.
    pub upload_workers: usize,
    /// Seconds between folder-scope initialization retries.
    pub retry_poll_secs: u64,
    /// Seconds before a stuck initialization triggers a fatal restart.
    pub restart_deadline_secs: u64,
    /// Seconds to wait for a newly created folder to become searchable.
    pub index_wait_timeout_secs: u64,
    /// Seconds between search-visibility polls.
    pub index_poll_secs: u64,
    /// Seconds the drain pool is given to finish in-flight tasks on shutdown.
    pub shutdown_grace_secs: u64,
}

/// Tagging pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaggingConfig {
    /// Aspect marking folders in the tagging-pipeline scope.
    pub pipeline_aspect: String,
    /// Percentage (0-100) a multi-label score must exceed to keep the label.
    pub taggable_threshold_percent: u8,
    /// Percentage (0-100) the public score must reach for public access.
    pub publicly_allowed_threshold_percent: u8,
    /// Tag appended to every AI-tagged document (empty disables it).
    pub default_tag: String,
}

/// Oversized-document chunking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters.
    pub max_chars: usize,
}

/// Fixed folder skeleton created at bootstrap.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FoldersConfig {
    /// Logical path of the knowledge base root.
    pub knowledge_base: String,
    /// Logical path of the tagging pipeline root.
    pub pipeline: String,
    /// Logical path of the pipeline start folder.
    pub pipeline_start: String,
    /// Logical path of the pipeline retry folder.
    pub pipeline_retry: String,
    /// Whether to create the built-in default category folders.
    pub create_default_categories: bool,
    /// Explicit category folder paths; overrides the defaults when non-empty.
    pub categories: Vec<String>,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/kbsync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("kbsync")
            .join("config.yaml")
    }
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            username: "admin".to_string(),
            password: "admin".to_string(),
            root_name: "Company Home".to_string(),
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9999".to_string(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            aspect: "ai:synced".to_string(),
            published_property: "ai:publishedTime".to_string(),
            updated_property: "ai:updatedTime".to_string(),
            batch_size: 100,
            drain_workers: 4,
            upload_workers: 4,
            retry_poll_secs: 5,
            restart_deadline_secs: 600,
            index_wait_timeout_secs: 20,
            index_poll_secs: 1,
            shutdown_grace_secs: 30,
        }
    }
}

impl Default for TaggingConfig {
    fn default() -> Self {
        Self {
            pipeline_aspect: "cm:generalclassifiable".to_string(),
            taggable_threshold_percent: 90,
            publicly_allowed_threshold_percent: 60,
            default_tag: "taggedByAI".to_string(),
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { max_chars: 20_000 }
    }
}

impl Default for FoldersConfig {
    fn default() -> Self {
        Self {
            knowledge_base: "Company Home|Knowledge Base".to_string(),
            pipeline: "Company Home|Knowledge Pipeline".to_string(),
            pipeline_start: "Company Home|Knowledge Pipeline|Start".to_string(),
            pipeline_retry: "Company Home|Knowledge Pipeline|Retry".to_string(),
            create_default_categories: true,
            categories: Vec::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field, e.g. `tagging.taggable_threshold_percent`.
    pub field: String,
    /// Human-readable description of the problem.
    pub message: String,
}

impl Config {
    /// Validates the configuration, returning all problems found.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        let percent = |field: &str, value: u8, errors: &mut Vec<ValidationError>| {
            if value > 100 {
                errors.push(ValidationError {
                    field: field.to_string(),
                    message: format!("must be a percentage 0-100, got {value}"),
                });
            }
        };
        percent(
            "tagging.taggable_threshold_percent",
            self.tagging.taggable_threshold_percent,
            &mut errors,
        );
        percent(
            "tagging.publicly_allowed_threshold_percent",
            self.tagging.publicly_allowed_threshold_percent,
            &mut errors,
        );

        if self.sync.batch_size == 0 {
            errors.push(ValidationError {
                field: "sync.batch_size".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.sync.drain_workers == 0 || self.sync.upload_workers == 0 {
            errors.push(ValidationError {
                field: "sync.drain_workers / sync.upload_workers".to_string(),
                message: "worker pool sizes must be at least 1".to_string(),
            });
        }
        if self.sync.restart_deadline_secs <= self.sync.retry_poll_secs {
            errors.push(ValidationError {
                field: "sync.restart_deadline_secs".to_string(),
                message: "must exceed retry_poll_secs".to_string(),
            });
        }
        if self.chunking.max_chars == 0 {
            errors.push(ValidationError {
                field: "chunking.max_chars".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.repository.base_url.is_empty() || self.ai.base_url.is_empty() {
            errors.push(ValidationError {
                field: "repository.base_url / ai.base_url".to_string(),
                message: "service URLs must not be empty".to_string(),
            });
        }

        errors
    }
}
