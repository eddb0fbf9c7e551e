use thiserror::Error;

#[derive(Error, Debug)]
pub enum PanelError {
    #[error("Default food '{0}' is not in the nutrition table")]
    MissingDefault(String),

    #[error("Failed to read nutrition table: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid nutrition table: {0}")]
    Json(#[from] serde_json::Error),
}
