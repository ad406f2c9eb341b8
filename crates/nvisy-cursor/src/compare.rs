//! Ordering of cursors by their sort-column values.

use std::borrow::Cow;
use std::cmp::Ordering;

use crate::{CursorResult, PagingCursor, TRACING_TARGET_COMPARE};

/// Either a live cursor or its token, as accepted by [`PagingCursor::compare`].
#[derive(Debug, Clone, Copy)]
pub enum CursorInput<'a> {
    /// An already parsed cursor.
    Cursor(&'a PagingCursor),
    /// A token produced by [`PagingCursor::to_token`].
    Token(&'a str),
}

impl<'a> CursorInput<'a> {
    /// Resolves the input to a cursor, parsing tokens.
    pub fn resolve(self) -> CursorResult<Cow<'a, PagingCursor>> {
        match self {
            Self::Cursor(cursor) => Ok(Cow::Borrowed(cursor)),
            Self::Token(token) => PagingCursor::parse(token).map(Cow::Owned),
        }
    }
}

impl<'a> From<&'a PagingCursor> for CursorInput<'a> {
    #[inline]
    fn from(cursor: &'a PagingCursor) -> Self {
        Self::Cursor(cursor)
    }
}

impl<'a> From<&'a str> for CursorInput<'a> {
    #[inline]
    fn from(token: &'a str) -> Self {
        Self::Token(token)
    }
}

impl<'a> From<&'a String> for CursorInput<'a> {
    #[inline]
    fn from(token: &'a String) -> Self {
        Self::Token(token)
    }
}

impl PagingCursor {
    /// Compares two cursors, or tokens, by their values.
    ///
    /// The descending flags of `a` decide the direction of every column; the
    /// flags of `b` are ignored. Only the first `a.values().len()` positions
    /// are compared.
    ///
    /// Fails with [`CursorError::MalformedToken`] when a token side does not
    /// parse.
    ///
    /// [`CursorError::MalformedToken`]: crate::CursorError::MalformedToken
    pub fn compare<'a, 'b>(
        a: impl Into<CursorInput<'a>>,
        b: impl Into<CursorInput<'b>>,
    ) -> CursorResult<Ordering> {
        let a = a.into().resolve()?;
        let b = b.into().resolve()?;
        Ok(a.compare_to(&b))
    }

    /// Compares this cursor with `other` using this cursor's descending flags.
    ///
    /// Positions where the values have different types, or where `other`
    /// has no value, count as equal.
    pub fn compare_to(&self, other: &PagingCursor) -> Ordering {
        for (index, value) in self.values.iter().enumerate() {
            let Some(other_value) = other.values.get(index) else {
                tracing::debug!(
                    target: TRACING_TARGET_COMPARE,
                    position = index,
                    left = self.values.len(),
                    right = other.values.len(),
                    "Compared cursor has fewer values, treating the rest as equal"
                );
                break;
            };

            let Some(ordering) = value.compare_natural(other_value) else {
                tracing::debug!(
                    target: TRACING_TARGET_COMPARE,
                    position = index,
                    left = value.type_name(),
                    right = other_value.type_name(),
                    "Incomparable cursor values, treating as equal"
                );
                continue;
            };

            if ordering != Ordering::Equal {
                return if self.is_descending(index) {
                    ordering.reverse()
                } else {
                    ordering
                };
            }
        }

        Ordering::Equal
    }
}
