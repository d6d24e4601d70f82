// quote-desk: error types for the client side and the command line

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Failed to create PDF: {0}")]
    PdfError(String),
    #[error("Failed to read selection file: {0}")]
    SelectionError(String),
    #[error("Failed to capture summary snapshot: {0}")]
    SnapshotError(String),
    #[error("Invalid date format: {0}")]
    DateError(String),
    #[error("Failed to load logo: {0}")]
    LogoError(String),
    #[error("Invalid contact details: {0}")]
    ValidationError(String),
    #[error("Submission failed: {0}")]
    SubmitError(String),
    #[error("A submission is already in progress")]
    SubmissionInProgress,
    #[error("Invalid configuration: {0}")]
    ConfigError(String),
    #[error("Store error: {0}")]
    StoreError(#[from] crate::store::StoreError),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
