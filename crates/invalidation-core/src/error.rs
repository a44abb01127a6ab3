use thiserror::Error;

#[derive(Error, Debug)]
pub enum InvalidationError {
    #[error("SQL parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, InvalidationError>;
