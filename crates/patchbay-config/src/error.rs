//! Configuration errors.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::validation::ValidationError;

/// Filesystem operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOp {
    /// Reading a config file.
    Read,
    /// Writing a config file.
    Write,
    /// Creating the directory that holds a config file.
    CreateDir,
}

impl fmt::Display for FileOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::CreateDir => "create directory",
        })
    }
}

/// Failure to load, save or check an [`EngineConfig`](crate::EngineConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A filesystem operation on `path` failed.
    #[error("cannot {op} '{}': {source}", path.display())]
    Io {
        /// What was attempted.
        op: FileOp,
        /// File or directory involved.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML or has unknown keys.
    #[error("malformed config: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// The config could not be rendered as TOML.
    #[error("cannot serialise config: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// A setting is outside its allowed range.
    #[error("invalid configuration: {0}")]
    Validation(#[from] ValidationError),
}

impl ConfigError {
    /// `map_err` adapter tagging an I/O error with `op` and `path`.
    pub(crate) fn io(op: FileOp, path: &Path) -> impl FnOnce(std::io::Error) -> Self {
        move |source| Self::Io {
            op,
            path: path.to_path_buf(),
            source,
        }
    }

    /// The failed filesystem operation, if this is an I/O error.
    pub fn file_op(&self) -> Option<FileOp> {
        match self {
            Self::Io { op, .. } => Some(*op),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::io::ErrorKind;

    fn denied() -> std::io::Error {
        std::io::Error::new(ErrorKind::PermissionDenied, "denied")
    }

    #[test]
    fn io_adapter_keeps_path_and_source() {
        let err = Err::<(), _>(denied())
            .map_err(ConfigError::io(FileOp::Write, Path::new("/etc/patchbay.toml")))
            .unwrap_err();
        assert_eq!(err.file_op(), Some(FileOp::Write));
        assert_eq!(
            err.to_string(),
            "cannot write '/etc/patchbay.toml': denied"
        );
        let source = err.source().unwrap();
        assert_eq!(source.to_string(), "denied");
    }

    #[test]
    fn create_dir_names_the_directory() {
        let err = ConfigError::io(FileOp::CreateDir, Path::new("/ro/conf"))(denied());
        assert_eq!(err.to_string(), "cannot create directory '/ro/conf': denied");
    }

    #[test]
    fn validation_wraps_range_errors() {
        let err = ConfigError::from(ValidationError::OutOfRange {
            field: "block_size".to_string(),
            value: 0.0,
            min: 1.0,
            max: 8192.0,
        });
        assert_eq!(err.file_op(), None);
        assert_eq!(
            err.to_string(),
            "invalid configuration: 'block_size' value 0 out of range [1, 8192]"
        );
    }
}
