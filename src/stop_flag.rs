use crate::error::{Error, ErrorKind, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// File-based cooperative cancellation signal.
///
/// The external controller creates the file (usually empty, to pre-stage the
/// path) and later rewrites it with the content `stop` to request
/// termination. The capture loop is the sole reader and deleter: once it
/// honors the request it removes the file, so the flag's presence is always a
/// fresh, unconsumed request.
pub struct StopFlag {
    path: PathBuf,
}

impl StopFlag {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        StopFlag { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true exactly when the flag file exists with content `stop`,
    /// deleting it in that case. A missing file, or a file with any other
    /// content (e.g. `pause`), is not a stop request and is left untouched.
    pub fn consume(&self) -> Result<bool> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => {
                return Err(Error::with_source(
                    ErrorKind::Persistence,
                    format!("failed to read stop flag {}", self.path.display()),
                    e,
                ))
            }
        };

        if contents.trim() != "stop" {
            return Ok(false);
        }

        fs::remove_file(&self.path).map_err(|e| {
            Error::with_source(
                ErrorKind::Persistence,
                format!("failed to delete stop flag {}", self.path.display()),
                e,
            )
        })?;
        Ok(true)
    }
}
