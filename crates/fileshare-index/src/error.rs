//! Error types for the storage index

use std::fmt;

#[derive(Debug)]
pub enum IndexError {
    /// Blob root or record schema could not be provisioned. Fatal to startup.
    Init(String),
    /// No record exists for the identifier. Expected and normal; callers map
    /// this to a client-facing "does not exist" rather than a server error.
    NotFound(String),
    Database(sqlx::Error),
    Io(Box<std::io::Error>),
}

impl IndexError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, IndexError::NotFound(_))
    }
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexError::Init(msg) => write!(f, "Initialization error: {}", msg),
            IndexError::NotFound(id) => write!(f, "No such file: {}", id),
            IndexError::Database(err) => write!(f, "Database error: {}", err),
            IndexError::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for IndexError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IndexError::Database(err) => Some(err),
            IndexError::Io(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for IndexError {
    fn from(err: sqlx::Error) -> Self {
        IndexError::Database(err)
    }
}

impl From<std::io::Error> for IndexError {
    fn from(err: std::io::Error) -> Self {
        IndexError::Io(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, IndexError>;
