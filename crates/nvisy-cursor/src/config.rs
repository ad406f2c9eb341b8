//! Codec limits for parsing client-supplied cursor tokens.

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::{CursorError, CursorResult, TRACING_TARGET_CONFIG};

/// Default maximum token length in bytes.
pub const DEFAULT_MAX_TOKEN_LENGTH: usize = 4096;

/// Default maximum number of values a token may carry.
pub const DEFAULT_MAX_VALUES: usize = 32;

/// Limits applied when decoding cursor tokens.
///
/// Tokens arrive from clients, so both limits bound the work done before a
/// token is rejected.
///
/// ## Example
///
/// ```rust
/// use nvisy_cursor::{CursorCodec, CursorConfig};
///
/// let config = CursorConfig::default().with_max_values(4);
/// let codec = CursorCodec::new(config)?;
/// # Ok::<(), nvisy_cursor::CursorError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "cursor configurations must be used to create a codec"]
pub struct CursorConfig {
    /// Maximum accepted token length in bytes
    #[cfg_attr(
        feature = "config",
        arg(
            long = "cursor-max-token-length",
            env = "CURSOR_MAX_TOKEN_LENGTH",
            default_value_t = DEFAULT_MAX_TOKEN_LENGTH
        )
    )]
    #[serde(default = "default_max_token_length")]
    pub cursor_max_token_length: usize,

    /// Maximum number of sort-column values in a token
    #[cfg_attr(
        feature = "config",
        arg(
            long = "cursor-max-values",
            env = "CURSOR_MAX_VALUES",
            default_value_t = DEFAULT_MAX_VALUES
        )
    )]
    #[serde(default = "default_max_values")]
    pub cursor_max_values: usize,
}

fn default_max_token_length() -> usize {
    DEFAULT_MAX_TOKEN_LENGTH
}

fn default_max_values() -> usize {
    DEFAULT_MAX_VALUES
}

impl CursorConfig {
    /// Creates a configuration with explicit limits.
    pub fn new(max_token_length: usize, max_values: usize) -> Self {
        let this = Self {
            cursor_max_token_length: max_token_length,
            cursor_max_values: max_values,
        };

        tracing::debug!(
            target: TRACING_TARGET_CONFIG,
            max_token_length = this.cursor_max_token_length,
            max_values = this.cursor_max_values,
            "Created cursor configuration"
        );

        this
    }

    /// Returns a configuration without limits.
    ///
    /// Used by [`PagingCursor::parse`] and [`PagingCursor::to_token`], so any
    /// cursor they encode parses back.
    ///
    /// [`PagingCursor::parse`]: crate::PagingCursor::parse
    /// [`PagingCursor::to_token`]: crate::PagingCursor::to_token
    pub const fn unbounded() -> Self {
        Self {
            cursor_max_token_length: usize::MAX,
            cursor_max_values: usize::MAX,
        }
    }

    /// Sets the maximum accepted token length.
    pub fn with_max_token_length(mut self, max_token_length: usize) -> Self {
        self.cursor_max_token_length = max_token_length;
        self
    }

    /// Sets the maximum number of values per token.
    pub fn with_max_values(mut self, max_values: usize) -> Self {
        self.cursor_max_values = max_values;
        self
    }

    /// Returns the maximum accepted token length.
    #[inline]
    pub fn max_token_length(&self) -> usize {
        self.cursor_max_token_length
    }

    /// Returns the maximum number of values per token.
    #[inline]
    pub fn max_values(&self) -> usize {
        self.cursor_max_values
    }

    /// Validates the configuration.
    ///
    /// Both limits must be non-zero: an empty token never parses, and a
    /// cursor without values cannot position a page.
    pub fn validate(&self) -> CursorResult<()> {
        if self.cursor_max_token_length == 0 {
            return Err(CursorError::Config(
                "cursor_max_token_length must be greater than zero".into(),
            ));
        }

        if self.cursor_max_values == 0 {
            return Err(CursorError::Config(
                "cursor_max_values must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}

impl Default for CursorConfig {
    fn default() -> Self {
        Self {
            cursor_max_token_length: DEFAULT_MAX_TOKEN_LENGTH,
            cursor_max_values: DEFAULT_MAX_VALUES,
        }
    }
}
