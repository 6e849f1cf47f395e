//! Configuration loading and root folder resolution
//!
//! Bootstrap configuration comes from a TOML file. Every field has a built-in
//! default, so a missing or unreadable file never prevents startup: it is
//! logged and the defaults are used instead.
//!
//! Root folder resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. `CALLSCORE_ROOT_FOLDER` environment variable
//! 3. `root_folder` from the TOML config file
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "CALLSCORE_ROOT_FOLDER";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root folder holding prompts, transcriptions, analyses and ground truth
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Folder names inside the root folder
    #[serde(default)]
    pub storage: StorageLayout,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            port: default_port(),
            logging: LoggingConfig::default(),
            storage: StorageLayout::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Folder layout under the root folder
///
/// Mirrors the container layout used by the upload tooling:
/// `prompts/`, `transcriptions/`, `llmanalysis/<persona>/`, `evals/<persona>/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageLayout {
    #[serde(default = "default_prompt_folder")]
    pub prompt_folder: String,
    #[serde(default = "default_transcription_folder")]
    pub transcription_folder: String,
    #[serde(default = "default_llm_analysis_folder")]
    pub llm_analysis_folder: String,
    #[serde(default = "default_eval_folder")]
    pub eval_folder: String,
}

impl Default for StorageLayout {
    fn default() -> Self {
        Self {
            prompt_folder: default_prompt_folder(),
            transcription_folder: default_transcription_folder(),
            llm_analysis_folder: default_llm_analysis_folder(),
            eval_folder: default_eval_folder(),
        }
    }
}

fn default_port() -> u16 {
    5790
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_prompt_folder() -> String {
    "prompts".to_string()
}

fn default_transcription_folder() -> String {
    "transcriptions".to_string()
}

fn default_llm_analysis_folder() -> String {
    "llmanalysis".to_string()
}

fn default_eval_folder() -> String {
    "evals".to_string()
}

impl TomlConfig {
    /// Validate values that serde defaults cannot guard
    pub fn validate(&self) -> Result<()> {
        let storage = &self.storage;
        for (name, folder) in [
            ("prompt_folder", &storage.prompt_folder),
            ("transcription_folder", &storage.transcription_folder),
            ("llm_analysis_folder", &storage.llm_analysis_folder),
            ("eval_folder", &storage.eval_folder),
        ] {
            if folder.trim().is_empty() || folder.contains(|c: char| c == '/' || c == '\\') {
                return Err(Error::Config(format!(
                    "storage.{} must be a plain folder name, got {:?}",
                    name, folder
                )));
            }
        }
        Ok(())
    }
}

/// Default configuration file path for the platform
///
/// `~/.config/callscore/config.toml` on Linux, the platform config dir elsewhere.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("callscore").join("config.toml"))
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
    config.validate()?;
    Ok(config)
}

/// Load the config file if present, falling back to defaults
///
/// Missing, unreadable or invalid files are logged and never fatal.
pub fn load_or_default(path: Option<&Path>) -> TomlConfig {
    let path = match path.map(Path::to_path_buf).or_else(default_config_path) {
        Some(path) => path,
        None => {
            warn!("Could not determine config directory, using built-in defaults");
            return TomlConfig::default();
        }
    };

    if !path.exists() {
        info!("No config file at {}, using built-in defaults", path.display());
        return TomlConfig::default();
    }

    match load_toml_config(&path) {
        Ok(config) => {
            info!("Loaded configuration from {}", path.display());
            config
        }
        Err(e) => {
            warn!("{}; using built-in defaults", e);
            TomlConfig::default()
        }
    }
}

/// Resolve the root folder following the documented priority order
pub fn resolve_root_folder(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = &config.root_folder {
        return path.clone();
    }

    // Priority 4: OS-dependent compiled default
    get_default_root_folder()
}

/// Get OS-dependent default root folder path
pub fn get_default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/callscore
        dirs::data_local_dir()
            .map(|d| d.join("callscore"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/callscore"))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/callscore
        dirs::data_dir()
            .map(|d| d.join("callscore"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/callscore"))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\callscore
        dirs::data_local_dir()
            .map(|d| d.join("callscore"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\callscore"))
    } else {
        PathBuf::from("./callscore_data")
    }
}

/// Write a config file atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, content)?;
    std::fs::rename(&temp_path, path)?;
    Ok(())
}
