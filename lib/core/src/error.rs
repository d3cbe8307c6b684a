use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Vector dimension mismatch at row {row}: expected {expected}, got {actual}")]
    DimensionMismatch { row: usize, expected: usize, actual: usize },

    #[error("Query dimension mismatch: expected {expected}, got {actual}")]
    QueryDimension { expected: usize, actual: usize },

    #[error("Failed to load artifacts: {0}")]
    ArtifactLoad(String),

    #[error("Invalid answer value {value} for question {question_id}: must be within [-2.0, 2.0]")]
    InvalidAnswer { question_id: u64, value: f32 },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
