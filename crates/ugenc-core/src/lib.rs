//! Translator from DSL compiler output to per-channel unit generator classes.
//!
//! A unit is described by a specification file holding one or more typed
//! signatures followed by a DSL implementation body. Each rate assignment of
//! the unit's parameters is compiled separately (one *variant* per file);
//! this crate reads the compiled classes and assembles a single unit that
//! picks the right variant at run time.
//!
//! # Components
//!
//! - **Signature model** ([`signature`]): `sine(freq: ab, amp: b): a`.
//! - **Method extractor** ([`extract`]): brace-matched method spans.
//! - **Implementation descriptor** ([`implementation`]): `process(...)`
//!   parameter names and interpolation flags.
//! - **Rate resolution** ([`resolve`]): decision tree with upsample and
//!   downsample adapters.
//! - **Interpolation** ([`interp`]): slow values ramped across a block.
//! - **Emitter** ([`emit`]): the definition and registration files.
//!
//! [`Translator`] runs them in order for every unit of a specification file
//! and writes the results through [`writer`], all or nothing.
//!
//! # Example
//!
//! ```rust,no_run
//! use ugenc_config::Settings;
//! use ugenc_core::{Translator, spec_path};
//!
//! let settings = Settings::default();
//! let path = spec_path("sine", &settings.files);
//! for unit in Translator::new(&settings).run(&path).unwrap() {
//!     println!("generated {}", unit.header.path.display());
//! }
//! ```

pub mod channel;
pub mod compiler;
pub mod emit;
pub mod error;
pub mod extract;
pub mod implementation;
pub mod interp;
pub mod lifecycle;
pub mod privates;
pub mod resolve;
pub mod scanner;
pub mod signature;
pub mod spec_file;
pub mod translate;
pub mod variant;
pub mod writer;

pub use compiler::{DslCompiler, FaustCompiler, Precompiled};
pub use emit::{HeaderFile, RegistrationFile, UnitModel};
pub use error::{TranslateError, UgenError};
pub use extract::{ExtractedMethod, extract, require_method};
pub use implementation::Implementation;
pub use interp::{Interpolated, interpolate, propagate};
pub use resolve::{Conversion, DispatchNode, Selection, resolve};
pub use signature::{Param, Rate, RateSpec, Signature};
pub use spec_file::SpecFile;
pub use translate::{GeneratedUnit, Translator, class_name, spec_path};
pub use variant::{Variant, VariantSet};
pub use writer::{OutputFile, write_all};
