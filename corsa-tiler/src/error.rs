use std::fmt;

#[derive(Debug)]
pub enum TilerError {
    Io(String),
    Geometry { line: usize, message: String },
    Serialization(String),
}

impl fmt::Display for TilerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TilerError::Io(msg) => write!(f, "Ingest IO Error: {}", msg),
            TilerError::Geometry { line, message } => {
                write!(f, "Geometry Error at line {}: {}", line, message)
            }
            TilerError::Serialization(msg) => write!(f, "Serialization Error: {}", msg),
        }
    }
}

impl std::error::Error for TilerError {}

pub type TilerResult<T> = Result<T, TilerError>;
