//! ugenc - translate a unit specification into Arco unit generator sources.
//!
//! Reads `<unit>.ugen`, compiles each rate variant found beside it, and
//! writes `<unit>.h` and `<unit>.cpp` for every signature in the file.
//! Settings come from `ugenc.toml` in the working directory or the user
//! config directory; logging is controlled by `RUST_LOG`.

use std::path::Path;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use ugenc_core::{Translator, spec_path};

#[derive(Parser)]
#[command(name = "ugenc")]
#[command(author, about = "Translate Faust output into Arco unit generators", long_about = None)]
struct Cli {
    /// Unit to translate, with or without the specification extension
    unit: String,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let settings =
        ugenc_config::load_settings(Path::new(".")).context("failed to load settings")?;
    let path = spec_path(&cli.unit, &settings.files);
    tracing::info!(spec = %path.display(), "translating");

    let units = Translator::new(&settings)
        .run(&path)
        .with_context(|| format!("failed to translate '{}'", path.display()))?;
    for unit in &units {
        tracing::info!(
            unit = %unit.name,
            header = %unit.header.path.display(),
            registration = %unit.registration.path.display(),
            "generated"
        );
    }
    Ok(())
}
