use thiserror::Error;

/// Failure of an HTTP gateway call.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP 401 or envelope code 401. Credentials have been cleared.
    #[error("session expired, please log in again")]
    Unauthorized,

    /// Non-zero envelope code other than 401.
    #[error("{message}")]
    Application {
        /// Envelope code.
        code: i64,
        /// Server message, shown to the user as-is.
        message: String,
    },

    /// Transport-level failure (connection refused, timeout, bad status).
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body was not the expected JSON.
    #[error("unexpected response: {0}")]
    Decode(String),

    /// A successful envelope without the `data` the call needs.
    #[error("response carried no data")]
    MissingData,
}

impl ApiError {
    /// Whether this error ended the session.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}
