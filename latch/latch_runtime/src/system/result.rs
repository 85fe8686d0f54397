//! The attach result file.
//!
//! Every successful attach appends one `namespace;token;host;port` line.
//! The file is never truncated, so an operator tool can tail it.

use std::fs::OpenOptions;
use std::io::Write;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use latch_core::PersistError;
use parking_lot::Mutex;
use tracing::info;

/// Name of the result file in the user's home directory.
pub const RESULT_FILE: &str = ".latch.token";

/// Append-only sink for attach results
#[derive(Debug)]
pub struct ResultSink {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ResultSink {
    /// Create a sink writing to a path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// `~/.latch.token`
    pub fn default_location() -> Result<PathBuf, PersistError> {
        dirs::home_dir()
            .map(|home| home.join(RESULT_FILE))
            .ok_or(PersistError::NoLocation)
    }

    /// The result file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one result line.
    pub fn persist(
        &self,
        namespace: &str,
        token: &str,
        address: SocketAddr,
    ) -> Result<(), PersistError> {
        let _guard = self.lock.lock();

        if self.path.exists() && !self.path.is_file() {
            return Err(PersistError::NotWritable(self.path.clone()));
        }

        let line = format_line(namespace, token, address);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| self.io_error(source))?;
        file.write_all(line.as_bytes())
            .map_err(|source| self.io_error(source))?;

        info!("Recorded attach of '{}' in {}", namespace, self.path.display());
        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> PersistError {
        PersistError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

/// `namespace;token;host;port\n`
pub fn format_line(namespace: &str, token: &str, address: SocketAddr) -> String {
    format!(
        "{};{};{};{}\n",
        namespace,
        token,
        address.ip(),
        address.port()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_appends_lines_in_order() {
        let dir = TempDir::new().unwrap();
        let sink = ResultSink::new(dir.path().join("token"));

        sink.persist("n1", "t1", "127.0.0.1:4000".parse().unwrap())
            .unwrap();
        sink.persist("n2", "", "0.0.0.0:4001".parse().unwrap())
            .unwrap();

        let content = std::fs::read_to_string(sink.path()).unwrap();
        assert_eq!(content, "n1;t1;127.0.0.1;4000\nn2;;0.0.0.0;4001\n");
    }

    #[test]
    fn test_directory_is_not_writable() {
        let dir = TempDir::new().unwrap();
        let sink = ResultSink::new(dir.path());
        let err = sink
            .persist("n1", "t1", "127.0.0.1:4000".parse().unwrap())
            .unwrap_err();
        assert!(matches!(err, PersistError::NotWritable(_)));
    }

    #[test]
    fn test_missing_parent_is_io_error() {
        let dir = TempDir::new().unwrap();
        let sink = ResultSink::new(dir.path().join("absent").join("token"));
        let err = sink
            .persist("n1", "t1", "127.0.0.1:4000".parse().unwrap())
            .unwrap_err();
        assert!(matches!(err, PersistError::Io { .. }));
    }
}
