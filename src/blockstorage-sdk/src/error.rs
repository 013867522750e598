/// Errors from the Block Storage client
#[derive(Debug, thiserror::Error)]
pub enum SdkError {
    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// API returned an error response
    #[error("{status} {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// OCI error code, e.g. `NotAuthorizedOrNotFound`
        code: String,
        /// Error message from the API
        message: String,
        /// `opc-request-id` of the failed call, when present
        request_id: Option<String>,
    },
    /// JSON deserialization error
    #[error("Deserialization error: {0}")]
    Deserialize(#[from] serde_json::Error),
    /// Request could not be signed
    #[error("Request signing failed: {0}")]
    Signing(String),
    /// Endpoint or path did not form a valid URL
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl SdkError {
    /// HTTP status of the failure, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            SdkError::Api { status, .. } => Some(*status),
            SdkError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
