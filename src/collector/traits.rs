//! Abstractions for filesystem access to enable testing and mocking.
//!
//! The `FileSystem` trait allows the collector to work with both the real
//! `/proc` filesystem on Linux and mock implementations for testing on
//! other platforms or in CI.

use std::io;
use std::path::Path;

/// Abstraction for filesystem operations.
///
/// Every file the collector consumes is read through this trait, so tests
/// can substitute canned contents without touching the host.
pub trait FileSystem: Send + Sync {
    /// Reads the entire contents of a file as a string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Checks if a path exists.
    fn exists(&self, path: &Path) -> bool;
}

/// Real filesystem implementation that delegates to `std::fs`.
///
/// Use this in production to read from the actual `/proc` filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl RealFs {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for RealFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn real_fs_reads_files() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "sockets: used 42\n").unwrap();

        let fs = RealFs::new();
        assert!(fs.exists(file.path()));
        assert_eq!(fs.read_to_string(file.path()).unwrap(), "sockets: used 42\n");
    }

    #[test]
    fn real_fs_reports_missing_paths() {
        let fs = RealFs::new();
        assert!(!fs.exists(Path::new("/nonexistent/path/12345")));
        assert!(fs.read_to_string(Path::new("/nonexistent/path/12345")).is_err());
    }
}
