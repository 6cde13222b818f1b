//! Settings for the ugenc unit generator translator.
//!
//! The translator's command line takes a single positional argument, so
//! everything else that varies between installations (entry point
//! namespace, file extensions, how the external DSL compiler is invoked,
//! adapter class names) lives in an optional TOML file.
//!
//! # Example
//!
//! ```rust,no_run
//! use ugenc_config::{Settings, load_settings};
//!
//! let settings = load_settings(std::path::Path::new(".")).unwrap();
//! println!("entry points live under /{}/", settings.namespace);
//!
//! let custom = Settings::from_toml("[compiler]\nenabled = false\n").unwrap();
//! assert!(!custom.compiler.enabled);
//! ```

mod error;
mod settings;

/// Settings file lookup.
pub mod paths;

pub use error::ConfigError;
pub use paths::{LOCAL_SETTINGS_FILE, find_settings, load_settings, user_config_dir};
pub use settings::{AdapterSettings, CompilerSettings, FileSettings, MethodSettings, Settings};
