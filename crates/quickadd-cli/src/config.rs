//! Runtime settings and file locations.
//!
//! The client-secret and token files are resolved relative to the
//! executable's own directory by default, not the working directory. An
//! optional `config.toml` (next to the executable, or under the user config
//! dir) can relocate them and tune the calendar parameters; CLI options
//! override both.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Default client-secret file name, next to the executable.
const CREDENTIALS_FILE: &str = "credentials.json";

/// Default token file name, next to the executable.
const TOKEN_FILE: &str = "token.json";

/// Settings read from `config.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Path to the OAuth client-secret JSON file.
    pub credentials_path: Option<PathBuf>,

    /// Path to the persisted token file.
    pub token_path: Option<PathBuf>,

    /// Calendar to operate on.
    pub calendar_id: String,

    /// Maximum number of upcoming events to list.
    pub max_results: usize,

    /// HTTP request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            credentials_path: None,
            token_path: None,
            calendar_id: "primary".to_string(),
            max_results: 10,
            timeout_secs: 30,
        }
    }
}

impl Settings {
    /// Loads settings from the first config file found, or defaults.
    ///
    /// Search order: `config.toml` next to the executable, then
    /// `~/.config/quickadd/config.toml`. A missing file is not an error.
    pub fn load() -> Result<Self, String> {
        for path in Self::search_paths() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }
        Ok(Self::default())
    }

    /// Loads settings from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read config {}: {}", path.display(), e))?;
        toml::from_str(&content)
            .map_err(|e| format!("failed to parse config {}: {}", path.display(), e))
    }

    fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![install_dir().join("config.toml")];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("quickadd").join("config.toml"));
        }
        paths
    }

    /// Resolves the client-secret path against the install directory.
    pub fn resolved_credentials_path(&self, install_dir: &Path) -> PathBuf {
        self.credentials_path
            .clone()
            .unwrap_or_else(|| install_dir.join(CREDENTIALS_FILE))
    }

    /// Resolves the token path against the install directory.
    pub fn resolved_token_path(&self, install_dir: &Path) -> PathBuf {
        self.token_path
            .clone()
            .unwrap_or_else(|| install_dir.join(TOKEN_FILE))
    }
}

/// Returns the directory holding the running executable.
///
/// Falls back to the current directory when the executable path cannot be
/// determined.
pub fn install_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}
