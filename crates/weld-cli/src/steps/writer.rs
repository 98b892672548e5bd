//! Output writing for the build steps.
//!
//! Every step hands its generated files to [`write_outputs`]. Names are
//! validated against the output directory, contents land in `.tmp` siblings
//! first and are renamed into place only once every temp file is written.

use std::fs;
use std::path::{Path, PathBuf};

use path_clean::PathClean;

use crate::error::BuildError;

/// A generated file: a name relative to the output directory and its bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub name: String,
    pub contents: Vec<u8>,
}

impl OutputFile {
    pub fn new(name: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
        }
    }
}

/// Write `files` under `dir`, creating it as needed.
///
/// Returns the written paths in input order. On failure no temp file is left
/// behind; files renamed before the failure stay in place.
pub fn write_outputs(dir: &Path, files: &[OutputFile]) -> Result<Vec<PathBuf>, BuildError> {
    let dir = dir.clean();
    fs::create_dir_all(&dir).map_err(|e| {
        BuildError::WriteFailed(format!(
            "Failed to create output directory '{}': {e}",
            dir.display()
        ))
    })?;

    let mut operations = Vec::with_capacity(files.len());
    for file in files {
        let target = validate_output_path(&dir, &file.name)?;
        operations.push((target, file.contents.as_slice()));
    }

    write_files_atomic(&operations)?;
    Ok(operations.into_iter().map(|(path, _)| path).collect())
}

/// Resolve `name` under `base_dir`, rejecting names that escape it.
pub(crate) fn validate_output_path(base_dir: &Path, name: &str) -> Result<PathBuf, BuildError> {
    if name.contains('\0') {
        return Err(BuildError::InvalidOutputPath(
            "File name contains a null byte".to_string(),
        ));
    }

    let full_path = base_dir.join(Path::new(name).clean()).clean();
    if !full_path.starts_with(base_dir) {
        return Err(BuildError::InvalidOutputPath(format!(
            "'{name}' escapes output directory '{}'",
            base_dir.display()
        )));
    }

    Ok(full_path)
}

fn write_files_atomic(operations: &[(PathBuf, &[u8])]) -> Result<(), BuildError> {
    let mut temp_files: Vec<(PathBuf, PathBuf)> = Vec::new();

    for (target, contents) in operations {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                cleanup_temp_files(&temp_files);
                BuildError::WriteFailed(format!(
                    "Failed to create directory '{}': {e}",
                    parent.display()
                ))
            })?;
        }

        let temp = temp_path(target);
        fs::write(&temp, contents).map_err(|e| {
            cleanup_temp_files(&temp_files);
            BuildError::WriteFailed(format!("Failed to write '{}': {e}", temp.display()))
        })?;
        temp_files.push((temp, target.clone()));
    }

    for (temp, target) in &temp_files {
        fs::rename(temp, target).map_err(|e| {
            cleanup_temp_files(&temp_files);
            BuildError::WriteFailed(format!(
                "Failed to rename '{}' to '{}': {e}",
                temp.display(),
                target.display()
            ))
        })?;
    }

    Ok(())
}

/// `app.js` -> `app.js.tmp`, so `app.js` and `app.css` never share a temp file.
fn temp_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

fn cleanup_temp_files(temp_files: &[(PathBuf, PathBuf)]) {
    for (temp, _) in temp_files {
        if temp.exists() {
            if let Err(e) = fs::remove_file(temp) {
                tracing::warn!("failed to remove temp file {}: {e}", temp.display());
            }
        }
    }
}
