use std::fmt::{Display, Formatter};

/// Error type for reading and writing stored preferences.
#[derive(Debug)]
pub enum PrefsError {
    Io(std::io::Error),
    Parse(serde_json::Error),
}

impl Display for PrefsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "preferences i/o error: {}", err),
            Self::Parse(err) => write!(f, "malformed preferences: {}", err),
        }
    }
}

impl std::error::Error for PrefsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for PrefsError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for PrefsError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err)
    }
}
