//! Settings file lookup.
//!
//! # Search Order
//!
//! 1. `ugenc.toml` in the working directory
//! 2. `config.toml` in the user configuration directory:
//!    `~/.config/ugenc/` (Linux), `~/Library/Application Support/ugenc/` (macOS),
//!    `%APPDATA%\ugenc\` (Windows)
//!
//! When neither exists the built-in defaults apply.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::settings::Settings;

/// Application name used for directory paths.
const APP_NAME: &str = "ugenc";

/// Settings file name looked up in the working directory.
pub const LOCAL_SETTINGS_FILE: &str = "ugenc.toml";

/// Settings file name inside the user configuration directory.
const USER_SETTINGS_FILE: &str = "config.toml";

/// Returns the user-specific configuration directory.
///
/// Returns a fallback path if the config directory cannot be determined.
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Find the settings file that applies to `working_dir`, if any.
pub fn find_settings(working_dir: &Path) -> Option<PathBuf> {
    let local = working_dir.join(LOCAL_SETTINGS_FILE);
    if local.is_file() {
        return Some(local);
    }

    let user = user_config_dir().join(USER_SETTINGS_FILE);
    if user.is_file() {
        return Some(user);
    }

    None
}

/// Load the settings that apply to `working_dir`.
///
/// Falls back to [`Settings::default`] when no settings file is found.
pub fn load_settings(working_dir: &Path) -> Result<Settings, ConfigError> {
    match find_settings(working_dir) {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading settings");
            Settings::load(&path)
        }
        None => {
            tracing::debug!("no settings file found, using defaults");
            Ok(Settings::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_config_dir_ends_with_app_name() {
        assert!(user_config_dir().ends_with(APP_NAME));
    }

    #[test]
    fn local_file_takes_precedence() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join(LOCAL_SETTINGS_FILE), "namespace = \"local\"\n").unwrap();

        let found = find_settings(dir.path()).unwrap();
        assert_eq!(found, dir.path().join(LOCAL_SETTINGS_FILE));

        let settings = load_settings(dir.path()).unwrap();
        assert_eq!(settings.namespace, "local");
    }

    #[test]
    fn malformed_local_file_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join(LOCAL_SETTINGS_FILE), "namespace = [").unwrap();
        assert!(load_settings(dir.path()).is_err());
    }
}
