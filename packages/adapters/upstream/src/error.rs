#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("request to {url} failed: {msg}")]
    Network { url: String, msg: String },
    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },
    #[error("unexpected response from {url}: {msg}")]
    Decode { url: String, msg: String },
    #[error("all {upstream} endpoints failed, last error: {last}")]
    Exhausted { upstream: String, last: Box<Error> },
    #[error("other error: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for services::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Network { .. }
            | Error::Status { .. }
            | Error::Decode { .. }
            | Error::Exhausted { .. } => {
                Self::UpstreamUnavailable(err.to_string())
            }
            Error::Other(e) => Self::Other(e),
        }
    }
}
