/// Errors from catalog requests.
///
/// Failures are cached alongside successes and handed to every caller
/// waiting on the same key, so the error carries owned, cloneable context
/// rather than the underlying transport error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The request could not be sent or the connection failed.
    #[error("request to {endpoint} failed: {message}")]
    Network {
        /// The request path.
        endpoint: String,
        /// Description of the transport failure.
        message: String,
    },

    /// The API returned a non-2xx status.
    #[error("API Error {status}: {body}")]
    Http {
        /// The request path.
        endpoint: String,
        /// HTTP status code.
        status: u16,
        /// Response body text.
        body: String,
    },

    /// The response body could not be decoded.
    #[error("invalid response from {endpoint}: {message}")]
    Decode {
        /// The request path.
        endpoint: String,
        /// Description of the decoding failure.
        message: String,
    },
}

impl FetchError {
    /// The request path that failed.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        match self {
            Self::Network { endpoint, .. }
            | Self::Http { endpoint, .. }
            | Self::Decode { endpoint, .. } => endpoint,
        }
    }

    /// The HTTP status, if the API responded.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Network { .. } | Self::Decode { .. } => None,
        }
    }

    /// Whether the API reported that the record does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Http { status: 404, .. })
    }
}
