//! Error types for the water portal forwarder.
//!
//! Each stage of the pipeline has its own error enum so failures can be
//! categorized at the boundary where they occur. Public pipeline operations
//! report success or failure to their callers; these types carry the reason
//! into the logs.

use thiserror::Error;

/// Result type alias using our custom error types.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Top-level error type that encompasses all application errors.
#[derive(Error, Debug)]
pub enum Error {
    /// Portal session and transport errors
    #[error("portal error")]
    Portal(#[from] PortalError),

    /// Readings table parsing errors
    #[error("table parse error")]
    TableParse(#[from] TableParseError),

    /// Historical ledger errors
    #[error("ledger error")]
    Ledger(#[from] LedgerError),

    /// Home Assistant publishing errors
    #[error("publish error")]
    Publish(#[from] PublishError),

    /// Generic errors that don't fit other categories
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Portal session and transport errors.
#[derive(Error, Debug)]
pub enum PortalError {
    /// HTTP request failed (network, timeout, invalid URL)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The portal root page carried no login form
    #[error("login form not found on portal page")]
    LoginFormMissing,

    /// Login submission went through but the readings page stayed locked.
    /// Bad credentials and expired sessions both land here.
    #[error("login rejected: readings page not accessible (status {status}, marker found: {marker_found})")]
    LoginRejected { status: u16, marker_found: bool },

    /// Server returned an error status
    #[error("server error (status {status}): {message}")]
    ServerError { status: u16, message: String },

    /// Selector plumbing failed while dissecting the login page
    #[error("selector error")]
    Selector(#[from] TableParseError),
}

/// Readings table parsing errors.
#[derive(Error, Debug)]
pub enum TableParseError {
    /// Invalid CSS selector
    #[error("invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    /// The readings table is missing from the page
    #[error("readings table not found: {selector}")]
    TableNotFound { selector: String },
}

/// Historical ledger errors.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Date string matched neither accepted format
    #[error("unparsable date '{0}', expected YYYY-MM-DD or DD.MM.YYYY")]
    BadDate(String),

    /// Delete addressed a meter the ledger has never seen
    #[error("unknown meter '{0}'")]
    UnknownMeter(String),

    /// Writing the backing document failed
    #[error("failed to write ledger file '{path}': {message}")]
    WriteFailed { path: String, message: String },

    /// Encoding the ledger document failed
    #[error("failed to encode ledger document: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Home Assistant publishing errors.
#[derive(Error, Debug)]
pub enum PublishError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Home Assistant rejected the update
    #[error("Home Assistant rejected '{entity_id}' (status {status}): {message}")]
    Rejected {
        entity_id: String,
        status: u16,
        message: String,
    },
}

impl PortalError {
    /// Creates a server error from HTTP status and response body.
    pub fn server_error(status: reqwest::StatusCode, body: String) -> Self {
        Self::ServerError {
            status: status.as_u16(),
            message: body,
        }
    }
}

impl TableParseError {
    /// Creates an invalid selector error.
    pub fn invalid_selector(selector: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::InvalidSelector {
            selector: selector.into(),
            message: err.to_string(),
        }
    }

    /// Creates a table not found error.
    pub fn table_not_found(selector: impl Into<String>) -> Self {
        Self::TableNotFound {
            selector: selector.into(),
        }
    }
}

impl LedgerError {
    /// Creates a write failed error.
    pub fn write_failed(path: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::WriteFailed {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

impl PublishError {
    /// Creates a rejection error from the entity, HTTP status and response body.
    pub fn rejected(entity_id: impl Into<String>, status: reqwest::StatusCode, body: String) -> Self {
        Self::Rejected {
            entity_id: entity_id.into(),
            status: status.as_u16(),
            message: body,
        }
    }
}
