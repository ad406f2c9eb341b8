//! Keyset pagination requests and pages built on [`PagingCursor`] tokens.
//!
//! A request carries the cursor of the last row the client saw; a page hands
//! back tokens for the rows on either edge so the client can move forward or
//! backward without the server keeping state.

#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

use crate::{CursorResult, PagingCursor};

/// Maximum number of items per page.
pub const MAX_LIMIT: i64 = 100;

/// Page request positioned after a cursor.
///
/// The cursor serializes as its token, so this type can be read directly from
/// query strings and request bodies. A deserialized `limit` is clamped to
/// `1..=MAX_LIMIT`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct CursorPagination {
    /// Page size.
    #[serde(deserialize_with = "clamped_limit")]
    pub limit: i64,
    /// Cursor of the last row on the previous page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "schema", schemars(with = "Option<String>"))]
    pub after: Option<PagingCursor>,
    /// Whether the caller wants the total row count.
    #[serde(default)]
    pub include_count: bool,
}

fn clamped_limit<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    i64::deserialize(deserializer).map(|limit| limit.clamp(1, MAX_LIMIT))
}

impl CursorPagination {
    /// Requests the first page.
    pub fn new(limit: i64) -> Self {
        Self {
            limit: limit.clamp(1, MAX_LIMIT),
            after: None,
            include_count: false,
        }
    }

    /// Requests the page following `cursor`.
    pub fn after(limit: i64, cursor: PagingCursor) -> Self {
        Self {
            after: Some(cursor),
            ..Self::new(limit)
        }
    }

    /// Requests the page following an optional client token.
    ///
    /// A malformed token is an error rather than a silent restart from the
    /// first page.
    pub fn from_token(limit: i64, token: Option<&str>) -> CursorResult<Self> {
        let after = token.map(PagingCursor::parse).transpose()?;
        Ok(Self {
            after,
            ..Self::new(limit)
        })
    }

    /// Asks for the total row count as well.
    pub fn with_count(mut self) -> Self {
        self.include_count = true;
        self
    }

    /// Rows to fetch: one past the page size, to detect a following page.
    pub fn fetch_limit(&self) -> i64 {
        self.limit.saturating_add(1)
    }

    /// Whether the request resumes from a cursor.
    pub fn has_cursor(&self) -> bool {
        self.after.is_some()
    }
}

/// One page of rows with tokens for the neighbouring pages.
#[derive(Debug, Clone, Serialize)]
pub struct CursorPage<T> {
    /// Rows on this page.
    pub items: Vec<T>,
    /// Total matching rows, when the request asked for it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<i64>,
    /// Token positioned after the last row. Present only when more rows exist.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
    /// Token positioned before the first row, with its direction reversed.
    /// Present only when this page was requested with a cursor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_cursor: Option<String>,
}

impl<T> CursorPage<T> {
    /// Builds a page from rows fetched with [`CursorPagination::fetch_limit`].
    ///
    /// `cursor_fn` returns the cursor of a row. The look-ahead row, if
    /// present, is dropped and turns into `next_cursor`.
    pub fn new<F>(
        mut items: Vec<T>,
        total: Option<i64>,
        pagination: &CursorPagination,
        cursor_fn: F,
    ) -> CursorResult<Self>
    where
        F: Fn(&T) -> PagingCursor,
    {
        let page_size = usize::try_from(pagination.limit.max(0)).unwrap_or(usize::MAX);
        let has_more = items.len() > page_size;
        items.truncate(page_size);

        let next_cursor = match items.last() {
            Some(item) if has_more => Some(cursor_fn(item).to_token()?),
            _ => None,
        };

        let previous_cursor = match items.first() {
            Some(item) if pagination.has_cursor() => Some(backward(cursor_fn(item)).to_token()?),
            _ => None,
        };

        Ok(Self {
            items,
            total,
            next_cursor,
            previous_cursor,
        })
    }

    /// A page without rows.
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total: Some(0),
            next_cursor: None,
            previous_cursor: None,
        }
    }

    /// Whether `next_cursor` is set.
    pub fn has_more(&self) -> bool {
        self.next_cursor.is_some()
    }

    /// Converts the rows, keeping the tokens.
    pub fn map<U, F>(self, f: F) -> CursorPage<U>
    where
        F: FnMut(T) -> U,
    {
        CursorPage {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            next_cursor: self.next_cursor,
            previous_cursor: self.previous_cursor,
        }
    }
}

/// Flips a row cursor to walk backwards.
///
/// A cursor without flags is ascending on every column, so it gets explicit
/// `false` flags first; `reverse` leaves flagless cursors untouched.
fn backward(cursor: PagingCursor) -> PagingCursor {
    let cursor = match cursor.descending() {
        Some(_) => cursor,
        None => {
            let columns = cursor.values().len();
            cursor.with_descending(vec![false; columns])
        }
    };
    cursor.reversed()
}
