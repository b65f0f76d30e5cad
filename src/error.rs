use std::error::Error as StdError;
use std::fmt::{Display, Formatter};

pub type Result<T> = std::result::Result<T, Error>;

/// The four failure families the loop can die from. None of them are retried;
/// the process is meant to be restarted by whoever supervises it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad or missing region definitions (fatal at startup)
    Config,
    /// Screen capture failure (fatal, propagates mid-loop)
    Capture,
    /// OCR engine failure (fatal, propagates mid-loop)
    Recognition,
    /// Log or flag-file write failure (fatal, propagates mid-loop)
    Persistence,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Config => "config error",
            ErrorKind::Capture => "capture error",
            ErrorKind::Recognition => "recognition error",
            ErrorKind::Persistence => "persistence error",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
    pub source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_deref().map(|e| e as &(dyn StdError + 'static))
    }
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Error {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Wrap any standard Error, keeping it as the source.
    pub fn with_source<E>(kind: ErrorKind, message: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Error {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::Config, message)
    }

    pub fn capture(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::Capture, message)
    }

    pub fn recognition(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::Recognition, message)
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::Persistence, message)
    }

    /// Wrap any Display into a recognition error. Handy for the zoo of
    /// distinct error types the tesseract crate returns per call.
    pub fn recognition_from<E: Display>(e: E) -> Self {
        Error::new(ErrorKind::Recognition, e.to_string())
    }

    pub fn capture_from<E: Display>(e: E) -> Self {
        Error::new(ErrorKind::Capture, e.to_string())
    }
}

impl From<csv::Error> for Error {
    fn from(e: csv::Error) -> Self {
        Error::with_source(ErrorKind::Persistence, e.to_string(), e)
    }
}
