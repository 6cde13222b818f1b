//! Translator settings file format.

use serde::Deserialize;
use std::path::Path;

use crate::error::ConfigError;

/// Settings consumed by the translator.
///
/// Every field has a default, so an empty file (or no file at all) yields a
/// working configuration.
///
/// # TOML Format
///
/// ```toml
/// namespace = "arco"
///
/// [files]
/// spec_extension = "ugen"
/// dsl_extension = "dsp"
/// impl_extension = "fh"
///
/// [compiler]
/// enabled = true
/// program = "faust"
/// args = ["-light"]
/// block_rate_args = ["-os"]
///
/// [methods]
/// compute_aliases = ["frame"]
///
/// [adapters]
/// upsample = "Upsample"
/// downsample = "Dnsampleb"
/// downsample_filter = "LOWPASS500"
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// First segment of every generated entry point address.
    pub namespace: String,
    /// File naming conventions.
    pub files: FileSettings,
    /// External DSL compiler invocation.
    pub compiler: CompilerSettings,
    /// Method name aliases for compiler-version drift.
    pub methods: MethodSettings,
    /// Rate conversion adapters used by generated dispatch code.
    pub adapters: AdapterSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            namespace: "arco".to_string(),
            files: FileSettings::default(),
            compiler: CompilerSettings::default(),
            methods: MethodSettings::default(),
            adapters: AdapterSettings::default(),
        }
    }
}

/// File extensions for the three file kinds the translator touches.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct FileSettings {
    /// Specification file extension (`sine.ugen`).
    pub spec_extension: String,
    /// Variant DSL source extension (`sine_ab_a.dsp`).
    pub dsl_extension: String,
    /// Compiled implementation text extension (`sine_ab_a.fh`).
    pub impl_extension: String,
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            spec_extension: "ugen".to_string(),
            dsl_extension: "dsp".to_string(),
            impl_extension: "fh".to_string(),
        }
    }
}

/// How to run the external DSL compiler.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerSettings {
    /// When false, compiled implementation files must already exist.
    pub enabled: bool,
    /// Executable name or path.
    pub program: String,
    /// Arguments passed before the class name.
    pub args: Vec<String>,
    /// Extra arguments for block-rate (one sample per block) variants.
    pub block_rate_args: Vec<String>,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            program: "faust".to_string(),
            args: vec!["-light".to_string()],
            block_rate_args: vec!["-os".to_string()],
        }
    }
}

/// Alternate method names tried when the primary name is absent.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct MethodSettings {
    /// Tried in order when `compute` is not found.
    pub compute_aliases: Vec<String>,
}

impl Default for MethodSettings {
    fn default() -> Self {
        Self {
            compute_aliases: vec!["frame".to_string()],
        }
    }
}

/// Names of the runtime classes inserted by rate resolution.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct AdapterSettings {
    /// Zero-order-hold block to audio adapter.
    pub upsample: String,
    /// Low-pass then decimate audio to block adapter.
    pub downsample: String,
    /// Filter constant passed to the downsample adapter.
    pub downsample_filter: String,
}

impl Default for AdapterSettings {
    fn default() -> Self {
        Self {
            upsample: "Upsample".to_string(),
            downsample: "Dnsampleb".to_string(),
            downsample_filter: "LOWPASS500".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let settings: Settings =
            toml::from_str(&content).map_err(|e| ConfigError::toml_parse(path, e))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let settings: Settings =
            toml::from_str(toml_str).map_err(|e| ConfigError::toml_parse("<string>", e))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values that would produce unusable file names or addresses.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.namespace.is_empty() || self.namespace.contains('/') {
            return Err(ConfigError::invalid(
                "namespace",
                "must be a single non-empty path segment",
            ));
        }
        let extensions = [
            ("files.spec_extension", &self.files.spec_extension),
            ("files.dsl_extension", &self.files.dsl_extension),
            ("files.impl_extension", &self.files.impl_extension),
        ];
        for (field, ext) in extensions {
            if ext.is_empty() || ext.contains('.') || ext.contains('/') {
                return Err(ConfigError::invalid(
                    field,
                    format!("'{ext}' is not a bare file extension"),
                ));
            }
        }
        if self.files.dsl_extension == self.files.impl_extension {
            return Err(ConfigError::invalid(
                "files.impl_extension",
                "must differ from files.dsl_extension",
            ));
        }
        if self.compiler.enabled && self.compiler.program.is_empty() {
            return Err(ConfigError::invalid(
                "compiler.program",
                "must be set when the compiler is enabled",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.namespace, "arco");
        assert_eq!(settings.files.dsl_extension, "dsp");
        assert_eq!(settings.methods.compute_aliases, vec!["frame".to_string()]);
    }

    #[test]
    fn partial_table_keeps_other_defaults() {
        let settings = Settings::from_toml(
            r#"
            [compiler]
            enabled = false
            "#,
        )
        .unwrap();
        assert!(!settings.compiler.enabled);
        assert_eq!(settings.compiler.program, "faust");
        assert_eq!(settings.adapters.downsample_filter, "LOWPASS500");
    }

    #[test]
    fn unknown_field_is_rejected() {
        let err = Settings::from_toml("namespase = \"arco\"").unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse { .. }));
    }

    #[test]
    fn namespace_with_slash_is_rejected() {
        let err = Settings::from_toml("namespace = \"a/b\"").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "namespace"));
    }

    #[test]
    fn dotted_extension_is_rejected() {
        let err = Settings::from_toml("[files]\ndsl_extension = \".dsp\"").unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "files.dsl_extension")
        );
    }

    #[test]
    fn same_dsl_and_impl_extension_is_rejected() {
        let err = Settings::from_toml("[files]\nimpl_extension = \"dsp\"").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("ugenc.toml");
        std::fs::write(&path, "namespace = \"nyq\"\n").unwrap();
        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.namespace, "nyq");
    }

    #[test]
    fn load_missing_file_fails() {
        let err = Settings::load("/nonexistent/ugenc.toml").unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }
}
