use std::path::PathBuf;

/// Errors produced by the logger and its collaborators.
///
/// Setup and offline replay return these to the caller; send operations
/// never do. Everything raised inside the dispatcher is logged and the
/// loop moves on to the next record.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("unable to serialize log entry: {0}")]
    Serialization(#[from] serde_json::Error),

    #[cfg(feature = "datadog")]
    #[error("unable to reach logs intake: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("error when sending logs | Status: {status} {body}")]
    Delivery { status: String, body: String },

    #[error("offline log storage failed at {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to decode offline log {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },
}

impl Error {
    pub(crate) fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Persistence {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn decode(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::Decode {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(feature = "datadog")]
impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Transport(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
