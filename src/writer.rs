//! Writes generated artifacts to disk.
//!
//! Artifact paths are relative to the output directory and always use `/` separators;
//! they are joined component by component so the output tree is the same on every platform.

use anyhow::{bail, Context, Result};
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

use crate::artifact::GeneratedArtifact;

/// Writes every artifact under `out_dir`.
///
/// Missing directories are created. Existing files with the same path are overwritten;
/// nothing else in `out_dir` is touched.
///
/// # Arguments
///
/// * `artifacts` - The generated artifacts, in emission order
/// * `out_dir` - The output directory
///
/// # Returns
///
/// Returns the paths of the written files.
///
/// # Errors
///
/// Returns an error if an artifact path leaves `out_dir`, a directory cannot be created,
/// or a file cannot be written.
pub fn write_artifacts(artifacts: &[GeneratedArtifact], out_dir: &Path) -> Result<Vec<PathBuf>> {
    info!(
        "Writing {} files to {}",
        artifacts.len(),
        out_dir.display()
    );

    let mut written = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        let path = artifact_path(out_dir, &artifact.path)?;
        write_to_file(&artifact.content, &path)?;
        written.push(path);
    }
    Ok(written)
}

/// Location of an artifact under `out_dir`.
///
/// `.`, `..` and backslashes are refused so nothing is written outside `out_dir`.
pub fn artifact_path(out_dir: &Path, relative: &str) -> Result<PathBuf> {
    let mut path = out_dir.to_path_buf();
    for part in relative.split('/').filter(|part| !part.is_empty()) {
        if part == "." || part == ".." || part.contains('\\') {
            bail!("Refusing to write outside the output directory: {}", relative);
        }
        path.push(part);
    }
    Ok(path)
}

/// Writes string content to a file.
///
/// Creates the file if it doesn't exist, or overwrites it if it does.
/// Parent directories are created as needed.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written to.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    debug!("Writing content to file: {}", path.display());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(path, content)
        .with_context(|| format!("Failed to write to file: {}", path.display()))?;

    debug!("Wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexSet;
    use tempfile::TempDir;

    /// Helper function to build an artifact without references
    fn artifact(path: &str, content: &str) -> GeneratedArtifact {
        GeneratedArtifact {
            path: path.to_string(),
            content: content.to_string(),
            references: IndexSet::new(),
        }
    }

    #[test]
    fn test_artifact_path() {
        let out = Path::new("sdk");
        assert_eq!(
            artifact_path(out, "routes/pet/$petId/index.ts").unwrap(),
            Path::new("sdk").join("routes").join("pet").join("$petId").join("index.ts")
        );
        assert_eq!(
            artifact_path(out, "index.ts").unwrap(),
            Path::new("sdk").join("index.ts")
        );
    }

    #[test]
    fn test_artifact_path_stays_inside_output_directory() {
        let out = Path::new("sdk");
        for relative in ["routes/../../escape/index.ts", "./index.ts", "routes\\..\\x.ts"] {
            let message = artifact_path(out, relative).unwrap_err().to_string();
            assert!(message.contains("outside the output directory"), "{}", message);
        }

        let temp_dir = TempDir::new().unwrap();
        let out_dir = temp_dir.path().join("sdk");
        let result = write_artifacts(&[artifact("../escaped.ts", "")], &out_dir);
        assert!(result.is_err());
        assert!(!temp_dir.path().join("escaped.ts").exists());
    }

    #[test]
    fn test_write_artifacts_creates_directories() {
        let temp_dir = TempDir::new().unwrap();
        let out_dir = temp_dir.path().join("sdk");

        let artifacts = vec![
            artifact("schemas/pet.ts", "export const PetSchema = 1;\n"),
            artifact("routes/pet/$petId/index.ts", "export const routes = {};\n"),
            artifact("index.ts", "export {};\n"),
        ];
        let written = write_artifacts(&artifacts, &out_dir).unwrap();

        assert_eq!(written.len(), 3);
        assert_eq!(
            fs::read_to_string(out_dir.join("routes/pet/$petId/index.ts")).unwrap(),
            "export const routes = {};\n"
        );
        assert!(out_dir.join("schemas").is_dir());
    }

    #[test]
    fn test_write_overwrites_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.ts");
        fs::write(&path, "old").unwrap();

        write_to_file("new", &path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn test_write_fails_when_parent_is_a_file() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("routes");
        fs::write(&blocker, "not a directory").unwrap();

        let result = write_artifacts(&[artifact("routes/index.ts", "")], temp_dir.path());
        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("Failed to create directory"), "{}", message);
    }
}
