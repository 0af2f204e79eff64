//! Materialization of embedded sub-documents.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Upper bound on the collision-suffix scan.
const MAX_SUFFIX: u32 = 10_000;

/// Errors writing an embedded sub-document to disk.
///
/// Always non-fatal to the caller: the walker records the message on the
/// owning node and moves on.
#[derive(Debug, Error)]
pub enum MaterializeError {
    /// The extraction directory could not be created.
    #[error("Failed to create extraction directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The target file could not be created or written.
    #[error("Failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Every candidate filename was already taken.
    #[error("No free filename for '{base}' after {attempts} attempts")]
    Exhausted { base: String, attempts: u32 },
}

/// Writes `bytes` into `dir` as `embedded_{base_name}.psb`, appending `_1`,
/// `_2`, ... before the extension until a free name is found.
///
/// `base_name` is expected to have passed through [`crate::sanitize`]. The
/// target is opened in exclusive-create mode, so a file created between the
/// existence scan and the write surfaces as a collision and advances the
/// suffix instead of being overwritten.
pub fn materialize(bytes: &[u8], base_name: &str, dir: &Path) -> Result<PathBuf, MaterializeError> {
    fs::create_dir_all(dir).map_err(|source| MaterializeError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;

    for counter in 0..MAX_SUFFIX {
        let file_name = if counter == 0 {
            format!("embedded_{base_name}.psb")
        } else {
            format!("embedded_{base_name}_{counter}.psb")
        };
        let path = dir.join(file_name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                file.write_all(bytes)
                    .map_err(|source| MaterializeError::Write {
                        path: path.clone(),
                        source,
                    })?;
                return Ok(path);
            }
            Err(source) if source.kind() == ErrorKind::AlreadyExists => continue,
            Err(source) => return Err(MaterializeError::Write { path, source }),
        }
    }

    Err(MaterializeError::Exhausted {
        base: base_name.to_string(),
        attempts: MAX_SUFFIX,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_writes_bytes_to_fresh_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = materialize(b"8BPS....", "Logo", dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), "embedded_Logo.psb");
        assert_eq!(fs::read(&path).unwrap(), b"8BPS....");
    }

    #[test]
    fn test_collisions_get_numeric_suffixes() {
        let dir = tempfile::tempdir().unwrap();
        let first = materialize(b"one", "Foo", dir.path()).unwrap();
        let second = materialize(b"two", "Foo", dir.path()).unwrap();
        let third = materialize(b"three", "Foo", dir.path()).unwrap();

        assert_eq!(first.file_name().unwrap(), "embedded_Foo.psb");
        assert_eq!(second.file_name().unwrap(), "embedded_Foo_1.psb");
        assert_eq!(third.file_name().unwrap(), "embedded_Foo_2.psb");

        // Nothing was overwritten.
        assert_eq!(fs::read(&first).unwrap(), b"one");
        assert_eq!(fs::read(&second).unwrap(), b"two");
        assert_eq!(fs::read(&third).unwrap(), b"three");
    }

    #[test]
    fn test_creates_missing_directory_recursively() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b/c");
        let path = materialize(b"x", "Deep", &nested).unwrap();
        assert!(path.starts_with(&nested));
        assert!(path.exists());
    }

    #[test]
    fn test_unwritable_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocked = dir.path().join("blocked");
        // Occupy the directory path with a plain file.
        fs::write(&blocked, b"").unwrap();
        let err = materialize(b"x", "Foo", &blocked).unwrap_err();
        assert!(err.to_string().contains("blocked"));
    }
}
