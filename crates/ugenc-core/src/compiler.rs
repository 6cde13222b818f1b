//! Driving the external DSL compiler.
//!
//! Each variant's DSL source is compiled to a companion implementation file
//! before its methods can be extracted. [`FaustCompiler`] runs the compiler;
//! [`Precompiled`] expects the companion file to exist already.

use std::process::Command;

use ugenc_config::CompilerSettings;

use crate::error::UgenError;
use crate::signature::Rate;
use crate::variant::Variant;

/// Produces a variant's implementation file from its DSL source.
pub trait DslCompiler {
    /// Compile `variant` so its output class is named `class_name`.
    ///
    /// On success `variant.impl_path` exists.
    fn compile(&self, variant: &Variant, class_name: &str) -> Result<(), UgenError>;
}

/// Select the compiler driver described by `settings`.
pub fn from_settings(settings: &CompilerSettings) -> Box<dyn DslCompiler> {
    if settings.enabled {
        Box::new(FaustCompiler::new(settings))
    } else {
        Box::new(Precompiled)
    }
}

/// Runs `<program> <args> -cn <Class> [block-rate args] <in> -o <out>`.
#[derive(Debug, Clone)]
pub struct FaustCompiler {
    program: String,
    args: Vec<String>,
    block_rate_args: Vec<String>,
}

impl FaustCompiler {
    /// Create a driver from compiler settings.
    pub fn new(settings: &CompilerSettings) -> Self {
        Self {
            program: settings.program.clone(),
            args: settings.args.clone(),
            block_rate_args: settings.block_rate_args.clone(),
        }
    }

    /// The command line for `variant`.
    pub fn command(&self, variant: &Variant, class_name: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).arg("-cn").arg(class_name);
        if variant.output == Rate::Block {
            cmd.args(&self.block_rate_args);
        }
        cmd.arg(&variant.dsl_path).arg("-o").arg(&variant.impl_path);
        cmd
    }
}

impl DslCompiler for FaustCompiler {
    fn compile(&self, variant: &Variant, class_name: &str) -> Result<(), UgenError> {
        let failure = |reason: String| UgenError::ExternalCompilerFailure {
            path: variant.dsl_path.clone(),
            reason,
        };

        tracing::info!(
            program = %self.program,
            source = %variant.dsl_path.display(),
            "compiling {variant}"
        );
        let output = self
            .command(variant, class_name)
            .output()
            .map_err(|e| failure(format!("could not run '{}': {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr.trim();
            return Err(failure(if detail.is_empty() {
                format!("{} exited with {}", self.program, output.status)
            } else {
                format!("{} exited with {}: {detail}", self.program, output.status)
            }));
        }
        if !variant.impl_path.exists() {
            return Err(failure(format!(
                "no output written to '{}'",
                variant.impl_path.display()
            )));
        }
        Ok(())
    }
}

/// Uses implementation files already present beside the DSL sources.
#[derive(Debug, Clone, Copy, Default)]
pub struct Precompiled;

impl DslCompiler for Precompiled {
    fn compile(&self, variant: &Variant, _class_name: &str) -> Result<(), UgenError> {
        if variant.impl_path.exists() {
            tracing::debug!(path = %variant.impl_path.display(), "using precompiled output");
            Ok(())
        } else {
            Err(UgenError::ExternalCompilerFailure {
                path: variant.dsl_path.clone(),
                reason: format!(
                    "compiler disabled and '{}' does not exist",
                    variant.impl_path.display()
                ),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;
    use std::fs;
    use ugenc_config::FileSettings;

    fn variant(dir: &std::path::Path, output: Rate) -> Variant {
        Variant::new("sine", vec![Rate::Audio], output, dir, &FileSettings::default())
    }

    #[test]
    fn command_line_layout() {
        let compiler = FaustCompiler::new(&CompilerSettings::default());
        let v = variant(std::path::Path::new("units"), Rate::Block);
        let cmd = compiler.command(&v, "Sine");
        let args: Vec<&OsStr> = cmd.get_args().collect();
        assert_eq!(cmd.get_program(), "faust");
        assert_eq!(args[0], "-light");
        assert_eq!(args[1], "-cn");
        assert_eq!(args[2], "Sine");
        assert_eq!(args[3], "-os");
        assert_eq!(args[4], v.dsl_path.as_os_str());
        assert_eq!(args[5], "-o");
        assert_eq!(args[6], v.impl_path.as_os_str());
    }

    #[test]
    fn audio_variants_skip_block_rate_args() {
        let compiler = FaustCompiler::new(&CompilerSettings::default());
        let v = variant(std::path::Path::new("."), Rate::Audio);
        let cmd = compiler.command(&v, "Sine");
        assert!(!cmd.get_args().any(|a| a == "-os"));
    }

    #[test]
    fn missing_program_is_a_compiler_failure() {
        let settings = CompilerSettings {
            program: "ugenc-test-no-such-compiler".to_string(),
            ..CompilerSettings::default()
        };
        let dir = tempfile::tempdir().unwrap();
        let err = FaustCompiler::new(&settings)
            .compile(&variant(dir.path(), Rate::Audio), "Sine")
            .unwrap_err();
        assert!(matches!(err, UgenError::ExternalCompilerFailure { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_is_a_compiler_failure() {
        let settings = CompilerSettings {
            program: "false".to_string(),
            args: vec![],
            ..CompilerSettings::default()
        };
        let dir = tempfile::tempdir().unwrap();
        let err = FaustCompiler::new(&settings)
            .compile(&variant(dir.path(), Rate::Audio), "Sine")
            .unwrap_err();
        match err {
            UgenError::ExternalCompilerFailure { reason, .. } => {
                assert!(reason.starts_with("false exited with"), "reason: {reason}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_reports_compiler_stderr() {
        let settings = CompilerSettings {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), "echo 'syntax error' >&2; exit 3".to_string()],
            ..CompilerSettings::default()
        };
        let dir = tempfile::tempdir().unwrap();
        let err = FaustCompiler::new(&settings)
            .compile(&variant(dir.path(), Rate::Audio), "Sine")
            .unwrap_err();
        assert!(err.to_string().contains("syntax error"), "error: {err}");
    }

    #[test]
    fn precompiled_requires_output() {
        let dir = tempfile::tempdir().unwrap();
        let v = variant(dir.path(), Rate::Audio);
        assert!(Precompiled.compile(&v, "Sine").is_err());
        fs::write(&v.impl_path, "class Sine {};\n").unwrap();
        assert!(Precompiled.compile(&v, "Sine").is_ok());
    }
}
