use thiserror::Error;

/// Failures talking to the Beem cloud API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("failed to execute request: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{operation} failed with status code {status}: {body}")]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("failed to decode {operation} response: {source}")]
    Decode {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("no access token in login response")]
    MissingToken,
}

impl ApiError {
    /// The API refused the credentials or the bearer token.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Status { status: 401 | 403, .. })
    }
}
