//! Error types for cursor encoding and parsing.
//!
//! See [`CursorError`] for the main error type used throughout this crate.

/// Reason a cursor token was rejected.
///
/// Every variant means the same thing to a caller: the token did not come
/// from [`PagingCursor::to_token`] (or was altered on the way back) and
/// cannot be used to resume a listing.
///
/// [`PagingCursor::to_token`]: crate::PagingCursor::to_token
#[derive(Debug, thiserror::Error)]
pub enum MalformedToken {
    /// The token is longer than the configured limit.
    #[error("token length {length} exceeds the limit of {limit}")]
    TooLong { length: usize, limit: usize },

    /// The token is not valid URL-safe base64.
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The decoded bytes are not valid UTF-8.
    #[error("payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// The decoded text is not a `[metadata, ...values]` array.
    #[error("invalid payload: {0}")]
    Payload(#[from] serde_json::Error),

    /// The token carries more values than the configured limit.
    #[error("token carries {count} values, the limit is {limit}")]
    TooManyValues { count: usize, limit: usize },
}

/// Error type for all cursor operations.
#[derive(Debug, thiserror::Error)]
#[must_use = "cursor errors should be handled appropriately"]
pub enum CursorError {
    /// The token could not be parsed back into a cursor.
    ///
    /// Returned by [`PagingCursor::parse`] and by [`PagingCursor::compare`]
    /// when either side is given as a token.
    ///
    /// [`PagingCursor::parse`]: crate::PagingCursor::parse
    /// [`PagingCursor::compare`]: crate::PagingCursor::compare
    #[error("Malformed cursor token: {0}")]
    MalformedToken(#[from] MalformedToken),

    /// The cursor could not be serialized.
    #[error("Failed to encode cursor: {0}")]
    Encode(#[source] serde_json::Error),

    /// The encoded token would be rejected by the decoding codec.
    ///
    /// Returned by [`CursorCodec::encode`] instead of a token that can never
    /// be parsed back under the same limits.
    ///
    /// [`CursorCodec::encode`]: crate::CursorCodec::encode
    #[error("Cursor exceeds codec limits: {0}")]
    ExceedsLimits(#[source] MalformedToken),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CursorError {
    /// Returns whether this error was caused by client-supplied input.
    ///
    /// Callers usually map this to a `400 Bad Request`.
    #[inline]
    pub fn is_malformed(&self) -> bool {
        matches!(self, CursorError::MalformedToken(_))
    }
}

impl From<base64::DecodeError> for CursorError {
    fn from(value: base64::DecodeError) -> Self {
        Self::MalformedToken(value.into())
    }
}

impl From<std::str::Utf8Error> for CursorError {
    fn from(value: std::str::Utf8Error) -> Self {
        Self::MalformedToken(value.into())
    }
}

/// Specialized [`Result`] type for cursor operations.
pub type CursorResult<T, E = CursorError> = Result<T, E>;
