pub mod compare;
pub mod properties;
pub mod system;

use crate::errors::ServerError;
use serde::de::DeserializeOwned;

/// Decode a JSON request body, reporting problems as client errors.
pub(crate) fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, ServerError> {
    serde_json::from_slice(body).map_err(|e| ServerError::BadRequest(format!("Invalid JSON body: {e}")))
}
