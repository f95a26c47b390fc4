//! Platform-specific logging directory resolution.

use std::path::PathBuf;

/// Returns the platform-appropriate directory for log files.
///
/// | Platform | Directory |
/// |----------|-----------|
/// | Linux | `$XDG_STATE_HOME/assistlens/logs` or `~/.local/state/assistlens/logs` |
/// | macOS | `~/Library/Logs/assistlens` |
/// | Windows | `%LOCALAPPDATA%\assistlens\assistlens\logs` |
///
/// Falls back to the system temp directory when no home directory can be
/// determined (e.g. a service account without `$HOME`).
pub fn log_dir() -> PathBuf {
    let Some(base) = directories::ProjectDirs::from("", "", "assistlens") else {
        return std::env::temp_dir().join("assistlens").join("logs");
    };

    #[cfg(target_os = "linux")]
    {
        base.state_dir()
            .map(std::path::Path::to_path_buf)
            .unwrap_or_else(|| base.data_local_dir().join("state"))
            .join("logs")
    }

    #[cfg(target_os = "macos")]
    {
        // data_local_dir is ~/Library/Application Support/assistlens; walk up
        // to ~/Library and use the standard Logs folder.
        let library = base
            .data_local_dir()
            .parent()
            .and_then(|p| p.parent())
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| base.data_local_dir().to_path_buf());
        library.join("Logs").join("assistlens")
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        base.data_local_dir().join("logs")
    }
}

/// Ensures the log directory exists, creating it if necessary.
pub fn ensure_log_dir() -> Result<PathBuf, std::io::Error> {
    let dir = log_dir();
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// File name prefix for the service's rolling log.
///
/// The rolling appender creates dated files such as
/// `assistlens-service.log.2026-03-01`.
pub const SERVICE_LOG_PREFIX: &str = "assistlens-service.log";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_dir_is_app_specific() {
        let dir = log_dir();
        assert!(dir.to_string_lossy().contains("assistlens"));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_linux_log_dir_ends_in_logs() {
        assert!(log_dir().ends_with("logs"));
    }
}
