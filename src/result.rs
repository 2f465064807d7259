//! Error types and the related `Result<T>`

use thiserror::Error;

pub type MultiGzResult<T> = Result<T, MultiGzError>;

#[derive(Debug, Error)]
pub enum MultiGzError {
    /// An error from underlying I/O
    #[error("I/O Error")]
    Io(#[from] std::io::Error),

    /// The stream didn't contain a well-formed gzip member where one
    /// was expected (bad header, bad trailer, or a seek target that
    /// doesn't land on a member boundary).
    #[error("Invalid gzip stream: {0}")]
    InvalidGzip(&'static str),

    /// A seek asked for more decompressed bytes than the stream holds
    /// past the target member.
    #[error("Offset lies {0} bytes past the end of the stream")]
    ShortMember(u64),

    /// The caller misused the API (zero block size, double close, ...)
    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),
}
