use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, CollectError>;

/// Error type covering the different failure cases that can occur while the
/// engine loads source reports, extracts regions, or writes the ledger.
#[derive(Debug, Error)]
pub enum CollectError {
    /// Wrapper for IO failures such as reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors bubbled up from the spreadsheet reader implementation.
    #[error("spreadsheet read error: {0}")]
    SheetRead(#[from] calamine::Error),

    /// Errors bubbled up from the spreadsheet writer implementation.
    #[error("spreadsheet write error: {0}")]
    SheetWrite(#[from] rust_xlsxwriter::XlsxError),

    /// Raised when a registry CSV record cannot be parsed.
    #[error("registry error: {0}")]
    Registry(#[from] csv::Error),

    /// Raised when the configuration file cannot be parsed.
    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    /// Raised when a source file name carries no month tag but the task
    /// requires one.
    #[error("no month tag in source file name '{0}'")]
    MissingMonthTag(String),

    /// Raised when the source directory cannot be enumerated.
    #[error("source directory not readable: {0}")]
    SourceDir(PathBuf),

    /// Raised when the destination path exists but is not a directory.
    #[error("destination path {0} is not a directory")]
    InvalidDestination(PathBuf),

    /// Raised when a task name in the configuration is not recognised.
    #[error("unsupported task '{0}'")]
    UnsupportedTask(String),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}
