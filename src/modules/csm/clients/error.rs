use thiserror::Error;

/// Failures raised by the CSM REST transport before a response could be
/// classified.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The HTTP exchange itself failed (connect, TLS, timeout, body read).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid server URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("cannot build endpoint for '{0}'")]
    InvalidEndpoint(String),

    #[error("invalid header '{0}'")]
    InvalidHeader(String),

    #[error("authentication with {host} failed: {reason}")]
    Authentication { host: String, reason: String },

    /// The server answered with something that is not JSON.
    #[error("server returned HTTP {status} with an unexpected body: {body}")]
    UnexpectedBody { status: u16, body: String },

    #[error("failed to decode server response: {0}")]
    Decode(String),

    #[error("failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to read certificate {path}: {source}")]
    Certificate {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
