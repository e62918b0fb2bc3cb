use std::path::PathBuf;
use thiserror::Error;

/// Failure to capture a watched file's current text
#[derive(Debug, Error)]
#[error("failed to read `{}`: {source}", .path.display())]
pub struct ReadError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

impl ReadError {
    pub fn is_missing(&self) -> bool {
        self.source.kind() == std::io::ErrorKind::NotFound
    }
}

/// Read a file as text. Invalid UTF-8 is replaced, never rejected.
pub(crate) fn read_text(path: PathBuf) -> Result<String, ReadError> {
    match std::fs::read(&path) {
        Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        Err(source) => Err(ReadError { path, source }),
    }
}
