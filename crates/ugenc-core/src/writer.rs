//! All-or-nothing output.
//!
//! Every generated file is first written to a temporary file in its target
//! directory. Only when all of them are staged are they renamed into place,
//! so a failure while staging leaves no generated file behind.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::UgenError;

/// A rendered file waiting to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    /// Destination.
    pub path: PathBuf,
    /// Full contents.
    pub contents: String,
}

impl OutputFile {
    /// Pair a destination with its contents.
    pub fn new(path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }
}

/// Stage every file, then move them all into place.
pub fn write_all(files: &[OutputFile]) -> Result<(), UgenError> {
    let mut staged = Vec::with_capacity(files.len());
    for file in files {
        staged.push((stage(file)?, &file.path));
    }
    for (temp, path) in staged {
        temp.persist(path)
            .map_err(|e| UgenError::write_file(path, e.error))?;
        tracing::info!(path = %path.display(), "wrote");
    }
    Ok(())
}

fn stage(file: &OutputFile) -> Result<NamedTempFile, UgenError> {
    let dir = match file.path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp =
        NamedTempFile::new_in(dir).map_err(|e| UgenError::write_file(&file.path, e))?;
    temp.write_all(file.contents.as_bytes())
        .and_then(|()| temp.flush())
        .map_err(|e| UgenError::write_file(&file.path, e))?;
    Ok(temp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn writes_every_file() {
        let dir = tempfile::tempdir().unwrap();
        let files = [
            OutputFile::new(dir.path().join("sine.h"), "header\n"),
            OutputFile::new(dir.path().join("sine.cpp"), "registration\n"),
        ];
        write_all(&files).unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("sine.h")).unwrap(), "header\n");
        assert_eq!(
            fs::read_to_string(dir.path().join("sine.cpp")).unwrap(),
            "registration\n"
        );
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn staging_failure_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let files = [
            OutputFile::new(dir.path().join("sine.h"), "header\n"),
            OutputFile::new(dir.path().join("missing").join("sine.cpp"), "registration\n"),
        ];
        let err = write_all(&files).unwrap_err();
        assert!(matches!(err, UgenError::WriteFile { .. }));
        assert!(!dir.path().join("sine.h").exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn replaces_existing_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sine.h");
        fs::write(&path, "old").unwrap();
        write_all(&[OutputFile::new(&path, "new")]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
    }
}
