use thiserror::Error;

use super::types::{ApiResponse, Operation};
use crate::modules::csm::clients::ClientError;

#[derive(Error, Debug)]
pub enum ReconcileError {
    /// The discriminating fields were missing or contradictory. Raised
    /// before anything is sent to the server.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The server answered with an error code that is not on the noop list.
    #[error("{operation} failed with {code}: {text}")]
    RemoteOperation {
        operation: Operation,
        code: String,
        text: String,
        response: Box<ApiResponse>,
    },

    #[error(transparent)]
    Transport(#[from] ClientError),
}

impl ReconcileError {
    /// The raw server body, when there is one.
    pub fn server_result(&self) -> Option<&ApiResponse> {
        match self {
            ReconcileError::RemoteOperation { response, .. } => Some(response.as_ref()),
            _ => None,
        }
    }
}
