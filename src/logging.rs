//! Log initialization.

use std::io::{self, Write};
use std::path::Path;

use log::{LevelFilter, SetLoggerError};

use crate::fsutil;

/// Installs the global logger.
///
/// `RUST_LOG` directives, if set, take precedence over `level`. With a
/// `log_path` every line is also appended to that file; if the file cannot be
/// opened, logging continues on stderr only.
///
/// # Errors
///
/// Fails if a global logger is already installed.
pub fn init(level: LevelFilter, log_path: Option<&Path>) -> Result<(), SetLoggerError> {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }

    let mut file_error = None;
    if let Some(path) = log_path {
        match fsutil::open_append(path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(Tee::new(
                    io::stderr(),
                    file,
                ))));
            }
            Err(err) => file_error = Some(err),
        }
    }

    builder.try_init()?;
    if let Some(err) = file_error {
        log::warn!("{}, logging to stderr only", err);
    }
    Ok(())
}

/// Writes everything to two sinks.
struct Tee<A, B> {
    primary: A,
    secondary: B,
}

impl<A: Write, B: Write> Tee<A, B> {
    fn new(primary: A, secondary: B) -> Self {
        Self { primary, secondary }
    }
}

impl<A: Write, B: Write> Write for Tee<A, B> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.primary.write_all(buf)?;
        self.secondary.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.primary.flush()?;
        self.secondary.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tee_writes_both_sinks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exporter.log");
        let mut primary = Vec::new();
        {
            let mut tee = Tee::new(&mut primary, fsutil::open_append(&path).unwrap());
            writeln!(tee, "[INFO] listening").unwrap();
            tee.flush().unwrap();
        }
        assert_eq!(primary, b"[INFO] listening\n");
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "[INFO] listening\n"
        );
    }
}
