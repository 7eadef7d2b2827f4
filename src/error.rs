use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcmonError {
    // Construction-time validation
    #[error("Invalid value for {field}: {value}")]
    Validation { field: &'static str, value: String },

    // IO-related errors
    #[error("Failed to read file: {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to access directory: {path}")]
    DirectoryAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Data processing errors
    #[error("Failed to parse JSON: {context}")]
    JsonParse {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize JSON: {path}")]
    JsonWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("No data to export for the {report} report")]
    EmptyExport { report: String },

    // Configuration errors
    #[error("Failed to parse configuration file: {path}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    // Concurrency
    #[error("Shared session lock poisoned")]
    LockPoisoned,

    #[error("Task failed")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("Failed to initialize thread pool")]
    ThreadPoolInit(#[from] rayon::ThreadPoolBuildError),
}

impl OcmonError {
    pub(crate) fn validation(field: &'static str, value: impl ToString) -> Self {
        OcmonError::Validation {
            field,
            value: value.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, OcmonError>;
