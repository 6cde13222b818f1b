//! The translation pipeline.
//!
//! [`Translator::translate_file`] turns one specification file into a
//! definition file and a registration file for every signature it declares.
//! [`Translator::run`] additionally writes them, all or none.

use std::fs;
use std::path::{Path, PathBuf};

use ugenc_config::{FileSettings, Settings};

use crate::channel::{ChannelRoutine, RoutineContext, bind_params, build_routine};
use crate::compiler::{self, DslCompiler};
use crate::emit::{HeaderFile, RegistrationFile, UnitModel};
use crate::error::{ResultExt, TranslateError, UgenError};
use crate::extract::find_class_declaration;
use crate::implementation::Implementation;
use crate::lifecycle::{class_initializer, instance_constants, state_initializer};
use crate::privates::find_private_variables;
use crate::resolve::resolve;
use crate::scanner::{Cursor, expand_tabs};
use crate::signature::{Rate, Signature};
use crate::spec_file::SpecFile;
use crate::variant::{Variant, VariantSet};
use crate::writer::{OutputFile, write_all};

/// Class name generated for `unit`: first letter upper case, the rest lower.
pub fn class_name(unit: &str) -> String {
    let mut chars = unit.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Specification file for a command-line unit argument, which may omit the
/// extension.
pub fn spec_path(unit: &str, files: &FileSettings) -> PathBuf {
    let path = PathBuf::from(unit);
    if path
        .extension()
        .is_some_and(|ext| ext == files.spec_extension.as_str())
    {
        path
    } else {
        PathBuf::from(format!("{unit}.{}", files.spec_extension))
    }
}

/// The rendered files of one unit.
#[derive(Debug, Clone)]
pub struct GeneratedUnit {
    /// Unit name.
    pub name: String,
    /// Class definition file.
    pub header: OutputFile,
    /// Entry point registration file.
    pub registration: OutputFile,
}

/// Translates specification files using one set of settings.
pub struct Translator<'a> {
    settings: &'a Settings,
    compiler: Box<dyn DslCompiler + 'a>,
}

impl<'a> Translator<'a> {
    /// Create a translator whose compiler driver follows `settings`.
    pub fn new(settings: &'a Settings) -> Self {
        Self {
            settings,
            compiler: compiler::from_settings(&settings.compiler),
        }
    }

    /// Create a translator with an explicit compiler driver.
    pub fn with_compiler(settings: &'a Settings, compiler: Box<dyn DslCompiler + 'a>) -> Self {
        Self { settings, compiler }
    }

    /// Translate every unit in `spec_path` and write the results.
    ///
    /// Nothing is written unless every unit translates.
    pub fn run(&self, spec_path: &Path) -> Result<Vec<GeneratedUnit>, TranslateError> {
        let units = self.translate_file(spec_path)?;
        let files: Vec<OutputFile> = units
            .iter()
            .flat_map(|u| [u.header.clone(), u.registration.clone()])
            .collect();
        write_all(&files).map_err(|e| {
            let path = match &e {
                UgenError::WriteFile { path, .. } => path.clone(),
                _ => spec_path.to_path_buf(),
            };
            e.in_unit(unit_label(spec_path), path)
        })?;
        Ok(units)
    }

    /// Translate every unit in `spec_path` without writing anything.
    pub fn translate_file(&self, spec_path: &Path) -> Result<Vec<GeneratedUnit>, TranslateError> {
        let spec = SpecFile::read(spec_path).in_unit(&unit_label(spec_path), spec_path)?;
        spec.signatures
            .iter()
            .map(|(line, signature)| {
                self.translate_unit(spec_path, *line, signature, &spec.implementation)
            })
            .collect()
    }

    /// Translate the unit declared by `signature` at `line` of `spec_path`.
    pub fn translate_unit(
        &self,
        spec_path: &Path,
        line: usize,
        signature: &Signature,
        implementation: &Implementation,
    ) -> Result<GeneratedUnit, TranslateError> {
        let unit = signature.name.as_str();
        let span = tracing::info_span!("unit", name = unit);
        let _guard = span.enter();

        let at_signature = |e: UgenError| {
            let mut err = e.in_unit(unit, spec_path);
            err.line = err.line.or(Some(line));
            err
        };

        let dir = match spec_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let output = signature.output_rate();
        let class = class_name(unit);

        let variants =
            VariantSet::discover(dir, unit, &self.settings.files).in_unit(unit, spec_path)?;
        signature
            .validate(implementation.param_names.len())
            .map_err(at_signature)?;
        variants.validate(signature).map_err(at_signature)?;

        let mut implementation = implementation.clone();
        if output == Rate::Block {
            implementation.disable_interpolation();
        }

        let mut compiled: Vec<(&Variant, String)> = Vec::with_capacity(variants.len());
        for variant in variants.variants() {
            self.compiler
                .compile(variant, &class)
                .in_unit(unit, &variant.dsl_path)?;
            let text = fs::read_to_string(&variant.impl_path)
                .map_err(|e| UgenError::read_file(&variant.impl_path, e))
                .in_unit(unit, &variant.impl_path)?;
            compiled.push((variant, expand_tabs(&text)));
        }

        let main = variants.main_variant().ok_or_else(|| {
            at_signature(UgenError::AmbiguousVariantSet {
                reason: "no variant to take declarations from".to_string(),
            })
        })?;
        tracing::debug!(main = %main, "selected main variant");
        let main_text = compiled
            .iter()
            .find(|(v, _)| *v == main)
            .map_or("", |(_, text)| text.as_str());
        let main_path = main.impl_path.as_path();

        let privates = find_private_variables(&class, main_text).in_unit(unit, main_path)?;
        let preamble = preamble(&class, main_text).in_unit(unit, main_path)?;
        let params = bind_params(signature, &implementation);

        let ctx = RoutineContext {
            class_name: &class,
            output,
            params: &params,
            privates: &privates,
            compute_aliases: &self.settings.methods.compute_aliases,
        };
        let routines = compiled
            .iter()
            .map(|(variant, text)| build_routine(&ctx, variant, text).in_unit(unit, &variant.impl_path))
            .collect::<Result<Vec<ChannelRoutine>, _>>()?;

        let mut slow_vars: Vec<String> = Vec::new();
        for var in routines.iter().flat_map(|r| &r.slow_vars) {
            if !slow_vars.contains(var) {
                slow_vars.push(var.clone());
            }
        }

        let dispatch = if output == Rate::Audio {
            Some(resolve(variants.variants(), signature.params.len()).map_err(at_signature)?)
        } else {
            None
        };

        let constants = instance_constants(&class, main_text, output).in_unit(unit, main_path)?;
        let state_init =
            state_initializer(&class, main_text, &privates, &slow_vars).in_unit(unit, main_path)?;
        let initializer = class_initializer(&class, main_text, output).in_unit(unit, main_path)?;

        let terminate = implementation
            .terminate
            .iter()
            .filter(|name| {
                let known = params.iter().any(|p| &p.name == *name);
                if !known {
                    tracing::warn!(param = %name, "ignoring terminate declaration for unknown parameter");
                }
                known
            })
            .cloned()
            .collect();

        let model = UnitModel {
            unit: unit.to_string(),
            class_name: class,
            output,
            params,
            preamble,
            privates,
            constants,
            state_initializer: state_init,
            dispatch,
            routines,
            slow_vars,
            terminate,
            initializer,
        };

        let namespace = self.settings.namespace.as_str();
        let header = HeaderFile {
            model: &model,
            namespace,
            adapters: &self.settings.adapters,
        }
        .to_string();
        let registration = RegistrationFile {
            model: &model,
            namespace,
        }
        .to_string();

        tracing::info!(
            variants = variants.len(),
            slow_values = model.slow_vars.len(),
            "translated {unit}"
        );
        Ok(GeneratedUnit {
            name: unit.to_string(),
            header: OutputFile::new(dir.join(format!("{unit}.h")), header),
            registration: OutputFile::new(dir.join(format!("{unit}.cpp")), registration),
        })
    }
}

/// Compiler output preceding the class declaration.
fn preamble(class_name: &str, text: &str) -> Result<String, UgenError> {
    let pos = find_class_declaration(class_name, text).ok_or_else(|| UgenError::ClassNotFound {
        class: class_name.to_string(),
    })?;
    let start = Cursor::new(text).line_start(pos);
    Ok(text[..start].to_string())
}

fn unit_label(spec_path: &Path) -> String {
    spec_path
        .file_stem()
        .map_or_else(String::new, |s| s.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_names() {
        assert_eq!(class_name("sine"), "Sine");
        assert_eq!(class_name("sineB"), "Sineb");
        assert_eq!(class_name(""), "");
    }

    #[test]
    fn spec_path_adds_missing_extension() {
        let files = FileSettings::default();
        assert_eq!(spec_path("sine", &files), PathBuf::from("sine.ugen"));
        assert_eq!(spec_path("sine.ugen", &files), PathBuf::from("sine.ugen"));
        assert_eq!(spec_path("dir/sine", &files), PathBuf::from("dir/sine.ugen"));
    }

    #[test]
    fn preamble_stops_at_class_line() {
        let text = "#ifndef X\n#define X\nclass Sine : public dsp {\n};\n";
        assert_eq!(preamble("Sine", text).unwrap(), "#ifndef X\n#define X\n");
        assert!(matches!(
            preamble("Other", text),
            Err(UgenError::ClassNotFound { .. })
        ));
    }

    #[test]
    fn missing_spec_file_names_unit() {
        let settings = Settings::default();
        let translator = Translator::new(&settings);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nothing.ugen");
        let err = translator.translate_file(&path).unwrap_err();
        assert_eq!(err.unit, "nothing");
        assert!(matches!(err.source, UgenError::ReadFile { .. }));
    }
}
