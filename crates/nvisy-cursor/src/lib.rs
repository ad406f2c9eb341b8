#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

// Tracing target constants for consistent logging.

/// Tracing target for token encoding and parsing.
///
/// Use this target for logging encoded tokens and rejected client input.
pub const TRACING_TARGET_CODEC: &str = "nvisy_cursor::codec";

/// Tracing target for cursor comparison.
///
/// Use this target for logging comparisons that fall back to ties.
pub const TRACING_TARGET_COMPARE: &str = "nvisy_cursor::compare";

/// Tracing target for codec configuration.
pub const TRACING_TARGET_CONFIG: &str = "nvisy_cursor::config";

mod compare;
mod config;
mod cursor;
mod error;
pub mod pagination;
mod value;

pub use crate::compare::CursorInput;
pub use crate::config::{CursorConfig, DEFAULT_MAX_TOKEN_LENGTH, DEFAULT_MAX_VALUES};
pub use crate::cursor::{CursorCodec, PagingCursor};
pub use crate::error::{CursorError, CursorResult, MalformedToken};
pub use crate::pagination::{CursorPage, CursorPagination};
pub use crate::value::CursorValue;
