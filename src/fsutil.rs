use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// Error that occurs when opening a file fails.
#[derive(Debug, thiserror::Error)]
#[error("failed to open file `{path}`: {source}")]
pub struct FileOpenError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Opens a file for appending, creating it if it does not exist.
///
/// # Errors
///
/// Returns a [`FileOpenError`] if the file cannot be opened or created.
///
/// # Example
/// ```no_run
/// # use docker_exporter::fsutil;
/// let log_file = fsutil::open_append("/var/log/docker-exporter.log")?;
/// # Ok::<(), fsutil::FileOpenError>(())
/// ```
pub fn open_append(path: impl AsRef<Path>) -> Result<File, FileOpenError> {
    let path = path.as_ref();
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| FileOpenError {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_open_append_creates_and_appends() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let path = dir.path().join("exporter.log");

        open_append(&path).unwrap().write_all(b"first\n").unwrap();
        open_append(&path).unwrap().write_all(b"second\n").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn test_open_append_error() {
        let result = open_append("/definitely/does/not/exist/exporter.log");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(
            err.path,
            PathBuf::from("/definitely/does/not/exist/exporter.log")
        );
        assert_eq!(err.source.kind(), std::io::ErrorKind::NotFound);
    }
}
