//! Configuration for the voice service.
//!
//! Loaded from `$ASSISTLENS_CONFIG` when set, otherwise from the
//! platform-standard config directory:
//! - Linux: `~/.config/assistlens/service.json`
//! - macOS: `~/Library/Application Support/assistlens/service.json`
//! - Windows: `%APPDATA%\assistlens\service.json`

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV_VAR: &str = "ASSISTLENS_CONFIG";

/// Default recognizer engine executable.
pub const DEFAULT_RECOGNIZER_COMMAND: &str = "assistlens-recognizer";

/// Platform API level assumed when none is configured.
pub const DEFAULT_API_LEVEL: u32 = 34;

/// Recognizer engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizerConfig {
    /// Engine executable (bare name looked up in PATH, or a path)
    #[serde(default = "default_recognizer_command")]
    pub command: String,
    /// Extra arguments passed to the engine
    #[serde(default)]
    pub args: Vec<String>,
}

fn default_recognizer_command() -> String {
    DEFAULT_RECOGNIZER_COMMAND.to_string()
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            command: default_recognizer_command(),
            args: Vec::new(),
        }
    }
}

/// Service configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Start listening as soon as the service is up
    #[serde(default = "default_auto_start")]
    pub auto_start: bool,
    /// Override for the IPC socket location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket_path: Option<PathBuf>,
    /// Also write logs to a daily rolling file
    #[serde(default)]
    pub log_to_file: bool,
    /// Platform API level used for notification and foreground gating
    #[serde(default = "default_api_level")]
    pub api_level: u32,
    /// Recognizer engine settings
    #[serde(default)]
    pub recognizer: RecognizerConfig,
}

fn default_auto_start() -> bool {
    true
}

fn default_api_level() -> u32 {
    DEFAULT_API_LEVEL
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            auto_start: true,
            socket_path: None,
            log_to_file: false,
            api_level: DEFAULT_API_LEVEL,
            recognizer: RecognizerConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Socket path to bind, honouring the override.
    pub fn socket_path(&self) -> PathBuf {
        self.socket_path
            .clone()
            .unwrap_or_else(assistlens_common::ipc::get_socket_path)
    }
}

/// Error loading the config file.
#[derive(Debug)]
pub enum ConfigError {
    /// No config directory could be determined
    NoConfigDir,
    /// The file exists but could not be read
    Read { path: PathBuf, source: std::io::Error },
    /// The file is not valid config JSON
    Parse { path: PathBuf, source: serde_json::Error },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NoConfigDir => write!(f, "Could not determine config directory"),
            ConfigError::Read { path, source } => {
                write!(f, "Failed to read {}: {}", path.display(), source)
            }
            ConfigError::Parse { path, source } => {
                write!(f, "Failed to parse {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Get the path to the config file.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
        return Ok(PathBuf::from(path));
    }
    let proj_dirs = ProjectDirs::from("", "", "assistlens").ok_or(ConfigError::NoConfigDir)?;
    Ok(proj_dirs.config_dir().join("service.json"))
}

/// Load configuration from the standard location.
///
/// A missing file yields the defaults; an unreadable or malformed file is an
/// error so the caller can report it once logging is up.
pub fn load_config() -> Result<ServiceConfig, ConfigError> {
    load_config_from(&config_path()?)
}

/// Load configuration from a specific file.
pub fn load_config_from(path: &Path) -> Result<ServiceConfig, ConfigError> {
    if !path.exists() {
        return Ok(ServiceConfig::default());
    }

    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("service.json")).unwrap();
        assert_eq!(config, ServiceConfig::default());
        assert!(config.auto_start);
        assert_eq!(config.recognizer.command, DEFAULT_RECOGNIZER_COMMAND);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("service.json");
        fs::write(
            &path,
            r#"{"auto_start": false, "recognizer": {"args": ["--lang", "en-US"]}}"#,
        )
        .unwrap();

        let config = load_config_from(&path).unwrap();
        assert!(!config.auto_start);
        assert_eq!(config.api_level, DEFAULT_API_LEVEL);
        assert_eq!(config.recognizer.command, DEFAULT_RECOGNIZER_COMMAND);
        assert_eq!(config.recognizer.args, vec!["--lang", "en-US"]);
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("service.json");
        fs::write(&path, "{ auto_start: yes").unwrap();

        assert!(matches!(
            load_config_from(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_socket_path_override() {
        let config = ServiceConfig {
            socket_path: Some(PathBuf::from("/tmp/custom.sock")),
            ..ServiceConfig::default()
        };
        assert_eq!(config.socket_path(), PathBuf::from("/tmp/custom.sock"));
        assert!(ServiceConfig::default()
            .socket_path()
            .ends_with("assistlens/service.sock"));
    }
}
