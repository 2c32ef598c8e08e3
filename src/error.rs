use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid parameter set: {0}")]
    InvalidParameterSet(String),
    #[error("Key exhausted: all one-time signature indices have been used")]
    KeyExhausted,
    #[error("Malformed key: expected {0} bytes, found {1} bytes")]
    MalformedKey(usize, usize),
    #[error("Malformed signature: expected {0} bytes, found {1} bytes")]
    MalformedSignature(usize, usize),
    #[error("Failed to obtain entropy from the system RNG: {0}")]
    RngFailure(String),
    #[error("Failed to persist signing state: {0}")]
    StatePersistenceFailure(String),
    #[error("Key generation was cancelled")]
    Cancelled,
    #[error("State store internal error: {0}")]
    StoreInternalError(String),
}

impl From<rand::Error> for Error {
    fn from(e: rand::Error) -> Self {
        Error::RngFailure(e.to_string())
    }
}
