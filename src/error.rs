use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    /// Transport failure, timeout, non-2xx status, or undecodable body.
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Unexpected payload: {0}")]
    Payload(String),
}
