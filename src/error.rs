use std::path::PathBuf;

use thiserror::Error;

/// Crate-wide error type
#[derive(Error, Debug)]
pub enum GadgetError {
    #[error("not found: {0}")]
    NotFound(PathBuf),

    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    #[error("already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("function {function} is already linked into {config}")]
    AlreadyLinked { function: String, config: String },

    #[error("function {function} is not linked into {config}")]
    NotLinked { function: String, config: String },

    #[error("function directory does not exist: {0}")]
    DanglingFunction(PathBuf),

    #[error("directory not empty: {0}")]
    DirectoryNotEmpty(PathBuf),

    #[error("no USB device controller available")]
    NoControllerAvailable,

    #[error("failed to resolve device name: {0}")]
    DeviceResolution(String),

    #[error("character {0:?} has no HID keyboard mapping")]
    UnsupportedCharacter(char),

    #[error("invalid value for attribute {attr:?}: {reason}")]
    InvalidValue { attr: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GadgetError {
    /// Classify an I/O error against the path it occurred on.
    ///
    /// Keeps the taxonomy coarse: ENOENT, EACCES, EEXIST and ENOTEMPTY get
    /// their own variants, everything else stays a plain I/O error.
    pub(crate) fn from_io(path: &std::path::Path, err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::NotFound => GadgetError::NotFound(path.to_path_buf()),
            ErrorKind::PermissionDenied => GadgetError::PermissionDenied(path.to_path_buf()),
            ErrorKind::AlreadyExists => GadgetError::AlreadyExists(path.to_path_buf()),
            _ if err.raw_os_error() == Some(libc::ENOTEMPTY) => {
                GadgetError::DirectoryNotEmpty(path.to_path_buf())
            }
            _ => GadgetError::Io(err),
        }
    }
}

/// Result type alias used throughout the crate
pub type Result<T> = std::result::Result<T, GadgetError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::Path;

    #[test]
    fn classifies_common_errno_values() {
        let p = Path::new("/tmp/x");

        let e = GadgetError::from_io(p, io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(e, GadgetError::NotFound(_)));

        let e = GadgetError::from_io(p, io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(e, GadgetError::PermissionDenied(_)));

        let e = GadgetError::from_io(p, io::Error::from_raw_os_error(libc::ENOTEMPTY));
        assert!(matches!(e, GadgetError::DirectoryNotEmpty(_)));
    }

    #[test]
    fn other_errors_stay_io() {
        let p = Path::new("/tmp/x");
        let e = GadgetError::from_io(p, io::Error::from_raw_os_error(libc::EIO));
        assert!(matches!(e, GadgetError::Io(_)));
    }
}
