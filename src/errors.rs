// errors.rs
use astra::Response;
use thiserror::Error;

/// Errors originating from either the server logic
/// (routing, validation, missing resources) or downstream layers (store, export).
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Bad Request: {0}")]
    BadRequest(String),
    /// The primary store is unreachable for this process.
    #[error("Service Unavailable: {0}")]
    Unavailable(String),
    #[error("Database Error: {0}")]
    DbError(String),
    #[error("Spreadsheet Error: {0}")]
    XlsxError(String),
    #[error("Internal Server Error: {0}")]
    Internal(String),
}

// Type alias commonly used by route handlers.
pub type ResultResp = Result<Response, ServerError>;

impl ServerError {
    pub fn status(&self) -> u16 {
        match self {
            ServerError::NotFound(_) => 404,
            ServerError::BadRequest(_) => 400,
            ServerError::Unavailable(_) => 503,
            ServerError::DbError(_) | ServerError::XlsxError(_) | ServerError::Internal(_) => 500,
        }
    }

    /// Message shown to API clients, without the status prefix.
    pub fn detail(&self) -> String {
        match self {
            ServerError::NotFound(msg)
            | ServerError::BadRequest(msg)
            | ServerError::Unavailable(msg)
            | ServerError::Internal(msg) => msg.clone(),
            ServerError::DbError(msg) => format!("Database error: {msg}"),
            ServerError::XlsxError(msg) => format!("Spreadsheet error: {msg}"),
        }
    }
}

impl From<rusqlite::Error> for ServerError {
    fn from(e: rusqlite::Error) -> Self {
        ServerError::DbError(e.to_string())
    }
}
