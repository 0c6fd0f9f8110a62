use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Document store error: {0}")]
    Store(String),

    #[error("Metadata cache error: {0}")]
    Cache(String),

    #[error("Language model error: {0}")]
    Llm(String),

    #[error("Error: {0}")]
    Other(String),
}
