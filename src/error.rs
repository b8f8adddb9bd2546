//! Crate-wide error type.
//!
//! Only invalid input and I/O at the edges are errors. Numeric drift inside the
//! scheduler and stale stable-count snapshots are clamped instead.

/// Errors returned at the call boundary.
#[derive(Debug)]
pub enum Error {
    /// Rating outside again/hard/good/easy (or 1-4).
    InvalidRating(String),
    /// Scheduler parameter out of its domain (name, reason).
    InvalidParams(String, String),
    /// Timestamp that could not be parsed (input, reason).
    InvalidTimestamp(String, String),
    /// Snapshot store failure.
    Storage(String),
    /// JSON encode/decode failure.
    Serialization(String),
    /// Config file unreadable or malformed (path, reason).
    Config(String, String),
    /// Card file unreadable or unwritable (path, reason).
    Io(String, String),
    /// No card with this id in the collection.
    CardNotFound(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidRating(raw) => write!(f, "Invalid rating: {:?}", raw),
            Error::InvalidParams(name, reason) => {
                write!(f, "Invalid scheduler parameter '{}': {}", name, reason)
            }
            Error::InvalidTimestamp(raw, reason) => {
                write!(f, "Invalid timestamp {:?}: {}", raw, reason)
            }
            Error::Storage(err) => write!(f, "Snapshot storage error: {}", err),
            Error::Serialization(err) => write!(f, "Serialization error: {}", err),
            Error::Config(path, err) => write!(f, "Config error in {}: {}", path, err),
            Error::Io(path, err) => write!(f, "IO error on {}: {}", path, err),
            Error::CardNotFound(id) => write!(f, "Card not found: {}", id),
        }
    }
}

impl Error {
    /// Returns a user-facing error message without exposing paths or raw input.
    pub fn user_message(&self) -> &'static str {
        match self {
            Error::InvalidRating(_) => "Unknown rating",
            Error::InvalidParams(_, _) => "Invalid scheduler settings",
            Error::InvalidTimestamp(_, _) => "Invalid date",
            Error::Storage(_) => "Failed to load or save study counts",
            Error::Serialization(_) => "Failed to read card data",
            Error::Config(_, _) => "Failed to load settings",
            Error::Io(_, _) => "Failed to access card file",
            Error::CardNotFound(_) => "Card not found",
        }
    }
}

impl std::error::Error for Error {}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
