use thiserror::Error;

#[derive(Error, Debug)]
pub enum StealthError {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Unknown scenario entity: {0}")]
    UnknownEntity(String),

    #[error("Duplicate scenario entity: {0}")]
    DuplicateEntity(String),

    #[error("Scenario parse error: {0}")]
    ScenarioParse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StealthError>;
