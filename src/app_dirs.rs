use directories::ProjectDirs;
use std::path::PathBuf;

const APP_NAME: &str = "typewise";

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    pub fn config_path() -> PathBuf {
        ProjectDirs::from("", "", APP_NAME)
            .map(|pd| pd.config_dir().join("config.json"))
            .unwrap_or_else(|| PathBuf::from("typewise_config.json"))
    }

    /// $HOME/.local/state/typewise, or the platform data dir without $HOME
    pub fn state_dir() -> PathBuf {
        if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home)
                .join(".local")
                .join("state")
                .join(APP_NAME)
        } else {
            ProjectDirs::from("", "", APP_NAME)
                .map(|pd| pd.data_local_dir().to_path_buf())
                .unwrap_or_else(|| PathBuf::from("."))
        }
    }

    pub fn results_log_path() -> PathBuf {
        Self::state_dir().join("results.csv")
    }

    pub fn trace_log_path() -> PathBuf {
        Self::state_dir().join("typewise.log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_files_share_a_directory() {
        let dir = AppDirs::state_dir();
        assert_eq!(AppDirs::results_log_path().parent(), Some(dir.as_path()));
        assert_eq!(AppDirs::trace_log_path().parent(), Some(dir.as_path()));
    }

    #[test]
    fn config_path_is_json() {
        assert_eq!(
            AppDirs::config_path().extension().and_then(|e| e.to_str()),
            Some("json")
        );
    }
}
