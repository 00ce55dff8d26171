use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Faults raised by the cache and the helpers.
///
/// Failures produced by a memoized function are never wrapped in this type;
/// they are handed back to the caller as the function returned them.
#[derive(Error, Debug)]
pub enum Error {
    #[error("function `{0}` has no stable identity, supply a name with FnId::named")]
    UnstableIdentity(&'static str),

    #[error("arguments of `{function}` cannot be represented in a cache key: {source}")]
    Unrepresentable {
        function: String,
        #[source]
        source: rmp_serde::encode::Error,
    },

    #[error("cached value for `{function}` is not a `{expected}`")]
    TypeMismatch {
        function: String,
        expected: &'static str,
    },

    #[error("invalid cache configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("password hashing failed: {0}")]
    Password(#[from] bcrypt::BcryptError),

    #[error("logging setup failed: {0}")]
    Logging(String),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl Error {
    /// True for faults caused by how the cache was called, as opposed to
    /// environment failures such as I/O.
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            Error::UnstableIdentity(_) | Error::Unrepresentable { .. } | Error::TypeMismatch { .. }
        )
    }
}
