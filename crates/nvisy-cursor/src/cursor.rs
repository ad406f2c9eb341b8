//! Serializable paging cursor and its token codec.
//!
//! A token is the URL-safe, unpadded base64 encoding of the JSON array
//! `[metadata, value0, value1, ...]`, where `metadata` is an object with the
//! optional keys `$ctx` (opaque context) and `$dsc` (descending flags).

use std::fmt;
use std::str::FromStr;

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::prelude::*;
use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::{
    CursorConfig, CursorError, CursorResult, CursorValue, MalformedToken, TRACING_TARGET_CODEC,
};

/// URL-safe alphabet, emits no padding and accepts tokens with or without it.
const TOKEN_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// A position in a sorted result set.
///
/// The cursor holds the sort-column values of the last row seen, in
/// sort-column order, together with optional opaque context (active filter,
/// sort specification) and per-column descending flags. It is sent to clients
/// as an opaque token and parsed back on the next request.
///
/// Each cursor owns its data; [`reverse`] only affects the cursor it is
/// called on.
///
/// ## Example
///
/// ```rust
/// use nvisy_cursor::PagingCursor;
/// use serde_json::json;
///
/// let cursor = PagingCursor::new([false.into(), "hello".into(), 2.into()])
///     .with_context(json!({ "filter": "test" }))
///     .with_descending([false, false, true]);
///
/// let token = cursor.to_token()?;
/// assert_eq!(PagingCursor::parse(&token)?, cursor);
/// # Ok::<(), nvisy_cursor::CursorError>(())
/// ```
///
/// [`reverse`]: PagingCursor::reverse
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "String")]
pub struct PagingCursor {
    pub(crate) values: Vec<CursorValue>,
    pub(crate) context: Option<Value>,
    pub(crate) descending: Option<Vec<bool>>,
}

impl PagingCursor {
    /// Creates a cursor from the values identifying a row, in sort-column order.
    pub fn new(values: impl IntoIterator<Item = CursorValue>) -> Self {
        Self {
            values: values.into_iter().collect(),
            context: None,
            descending: None,
        }
    }

    /// Creates a cursor from all of its parts at once.
    pub fn from_parts(
        values: Vec<CursorValue>,
        context: Option<Value>,
        descending: Option<Vec<bool>>,
    ) -> Self {
        Self {
            values,
            context,
            descending,
        }
    }

    /// Attaches opaque context (e.g. filter or ordering) carried by the token.
    pub fn with_context(mut self, context: impl Into<Value>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Marks which columns are compared in descending order.
    pub fn with_descending(mut self, descending: impl IntoIterator<Item = bool>) -> Self {
        self.descending = Some(descending.into_iter().collect());
        self
    }

    /// Parses a cursor from a token produced by [`to_token`].
    ///
    /// No length or value-count limits apply. Decode client input through a
    /// [`CursorCodec`] built from a [`CursorConfig`] to bound it.
    ///
    /// [`to_token`]: PagingCursor::to_token
    pub fn parse(token: &str) -> CursorResult<Self> {
        CursorCodec::unbounded().decode(token)
    }

    /// Encodes the cursor as a URL-safe token.
    pub fn to_token(&self) -> CursorResult<String> {
        CursorCodec::unbounded().encode(self)
    }

    /// Returns the sort-column values.
    #[inline]
    pub fn values(&self) -> &[CursorValue] {
        &self.values
    }

    /// Returns the opaque context, if any.
    #[inline]
    pub fn context(&self) -> Option<&Value> {
        self.context.as_ref()
    }

    /// Returns the descending flags, if any.
    #[inline]
    pub fn descending(&self) -> Option<&[bool]> {
        self.descending.as_deref()
    }

    /// Returns whether the column at `index` is compared in descending order.
    ///
    /// Columns without a flag are ascending.
    #[inline]
    pub fn is_descending(&self, index: usize) -> bool {
        self.descending
            .as_ref()
            .and_then(|flags| flags.get(index).copied())
            .unwrap_or(false)
    }

    /// Reverses the direction of the cursor by inverting its descending flags.
    ///
    /// Turns a "next page" cursor into a "previous page" cursor. Does nothing
    /// when the cursor has no descending flags.
    pub fn reverse(&mut self) {
        if let Some(flags) = self.descending.as_mut() {
            for flag in flags.iter_mut().rev() {
                *flag = !*flag;
            }
        }
    }

    /// Returns the cursor with its direction reversed.
    pub fn reversed(mut self) -> Self {
        self.reverse();
        self
    }

    /// Consumes the cursor, returning its values.
    pub fn into_values(self) -> Vec<CursorValue> {
        self.values
    }
}

/// Encodes and decodes cursor tokens under a [`CursorConfig`].
///
/// The default codec applies the default limits. A token produced by
/// [`encode`] always passes [`decode`] on the same codec.
///
/// [`encode`]: CursorCodec::encode
/// [`decode`]: CursorCodec::decode
#[derive(Debug, Clone, Copy, Default)]
pub struct CursorCodec {
    config: CursorConfig,
}

impl CursorCodec {
    /// Creates a codec with the given limits.
    pub fn new(config: CursorConfig) -> CursorResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Creates a codec without limits.
    pub const fn unbounded() -> Self {
        Self {
            config: CursorConfig::unbounded(),
        }
    }

    /// Returns the codec configuration.
    #[inline]
    pub fn config(&self) -> &CursorConfig {
        &self.config
    }

    /// Encodes a cursor as a URL-safe token.
    ///
    /// Fails with [`CursorError::ExceedsLimits`] when the cursor has more
    /// values, or encodes to a longer token, than [`decode`] accepts.
    ///
    /// [`decode`]: CursorCodec::decode
    pub fn encode(&self, cursor: &PagingCursor) -> CursorResult<String> {
        let limit = self.config.max_values();
        if cursor.values.len() > limit {
            return Err(self.exceeds_limits(MalformedToken::TooManyValues {
                count: cursor.values.len(),
                limit,
            }));
        }

        let payload =
            serde_json::to_vec(&PayloadRef::from(cursor)).map_err(CursorError::Encode)?;
        let token = TOKEN_ENGINE.encode(payload);

        let limit = self.config.max_token_length();
        if token.len() > limit {
            return Err(self.exceeds_limits(MalformedToken::TooLong {
                length: token.len(),
                limit,
            }));
        }

        tracing::trace!(
            target: TRACING_TARGET_CODEC,
            values = cursor.values.len(),
            length = token.len(),
            "Encoded cursor token"
        );

        Ok(token)
    }

    /// Decodes a token produced by [`encode`].
    ///
    /// Fails with [`CursorError::MalformedToken`] when the token is too long,
    /// is not URL-safe base64, or does not hold a `[metadata, ...values]`
    /// array within the configured value limit.
    ///
    /// [`encode`]: CursorCodec::encode
    pub fn decode(&self, token: &str) -> CursorResult<PagingCursor> {
        self.try_decode(token).map_err(|reason| {
            tracing::debug!(
                target: TRACING_TARGET_CODEC,
                length = token.len(),
                reason = %reason,
                "Rejected malformed cursor token"
            );
            CursorError::MalformedToken(reason)
        })
    }

    fn exceeds_limits(&self, reason: MalformedToken) -> CursorError {
        tracing::warn!(
            target: TRACING_TARGET_CODEC,
            reason = %reason,
            "Refused to encode cursor beyond the codec limits"
        );
        CursorError::ExceedsLimits(reason)
    }

    fn try_decode(&self, token: &str) -> Result<PagingCursor, MalformedToken> {
        let limit = self.config.max_token_length();
        if token.len() > limit {
            return Err(MalformedToken::TooLong {
                length: token.len(),
                limit,
            });
        }

        let bytes = TOKEN_ENGINE.decode(token)?;
        let text = std::str::from_utf8(&bytes)?;
        let Payload { meta, values } = serde_json::from_str(text)?;

        let limit = self.config.max_values();
        if values.len() > limit {
            return Err(MalformedToken::TooManyValues {
                count: values.len(),
                limit,
            });
        }

        tracing::trace!(
            target: TRACING_TARGET_CODEC,
            values = values.len(),
            "Decoded cursor token"
        );

        Ok(PagingCursor {
            values,
            context: meta.context,
            descending: meta.descending,
        })
    }
}

/// Metadata record written as the first payload element.
#[derive(Serialize)]
struct MetaInfoRef<'a> {
    #[serde(rename = "$ctx", skip_serializing_if = "Option::is_none")]
    context: Option<&'a Value>,
    #[serde(rename = "$dsc", skip_serializing_if = "Option::is_none")]
    descending: Option<&'a [bool]>,
}

#[derive(Deserialize)]
struct MetaInfo {
    #[serde(rename = "$ctx", default, deserialize_with = "present")]
    context: Option<Value>,
    #[serde(rename = "$dsc", default)]
    descending: Option<Vec<bool>>,
}

/// Keeps an explicit `null` context distinct from a missing one.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

struct PayloadRef<'a> {
    meta: MetaInfoRef<'a>,
    values: &'a [CursorValue],
}

impl<'a> From<&'a PagingCursor> for PayloadRef<'a> {
    fn from(cursor: &'a PagingCursor) -> Self {
        Self {
            meta: MetaInfoRef {
                context: cursor.context.as_ref(),
                descending: cursor.descending.as_deref(),
            },
            values: &cursor.values,
        }
    }
}

impl Serialize for PayloadRef<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.values.len() + 1))?;
        seq.serialize_element(&self.meta)?;
        for value in self.values {
            seq.serialize_element(value)?;
        }
        seq.end()
    }
}

struct Payload {
    meta: MetaInfo,
    values: Vec<CursorValue>,
}

impl<'de> Deserialize<'de> for Payload {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_seq(PayloadVisitor)
    }
}

struct PayloadVisitor;

impl<'de> Visitor<'de> for PayloadVisitor {
    type Value = Payload;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an array of a metadata object followed by cursor values")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        // The metadata record must be a JSON object, not an array.
        let Some(meta) = seq.next_element::<Map<String, Value>>()? else {
            return Err(de::Error::invalid_length(0, &self));
        };
        let meta: MetaInfo = serde_json::from_value(Value::Object(meta))
            .map_err(<A::Error as de::Error>::custom)?;

        let mut values = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(value) = seq.next_element::<CursorValue>()? {
            values.push(value);
        }

        Ok(Payload { meta, values })
    }
}

impl fmt::Display for PagingCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = self.to_token().map_err(|_| fmt::Error)?;
        f.write_str(&token)
    }
}

impl FromStr for PagingCursor {
    type Err = CursorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for PagingCursor {
    type Error = CursorError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl TryFrom<String> for PagingCursor {
    type Error = CursorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl Serialize for PagingCursor {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let token = self
            .to_token()
            .map_err(<S::Error as serde::ser::Error>::custom)?;
        serializer.serialize_str(&token)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::DEFAULT_MAX_TOKEN_LENGTH;

    fn context() -> Value {
        json!({ "filter": "test", "sortBy": "+name" })
    }

    fn is_url_safe(token: &str) -> bool {
        token
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    }

    #[test]
    fn token_is_url_safe() {
        for code in 0u8..=255 {
            let text = char::from(code).to_string().repeat(usize::from(code) + 1);
            let token = PagingCursor::new([text.into()])
                .with_context(context())
                .to_token()
                .unwrap();
            assert!(is_url_safe(&token), "code {code} produced {token}");
        }
    }

    #[test]
    fn token_round_trips() {
        let cursor = PagingCursor::new([false.into(), 123.into(), "hello".into()])
            .with_context(context());
        let parsed = PagingCursor::parse(&cursor.to_token().unwrap()).unwrap();

        assert_eq!(parsed.values(), cursor.values());
        assert_eq!(parsed.context(), Some(&context()));
        assert_eq!(parsed.descending(), None);
    }

    #[test]
    fn token_round_trips_every_latin1_character() {
        for code in 0u8..=255 {
            let text = char::from(code).to_string().repeat(usize::from(code) + 1);
            let cursor = PagingCursor::new([text.into()]).with_context(context());
            let parsed = PagingCursor::parse(&cursor.to_token().unwrap()).unwrap();
            assert_eq!(parsed, cursor, "code {code}");
        }
    }

    #[test]
    fn round_trip_keeps_descending_and_null_context() {
        let cursor = PagingCursor::from_parts(
            vec![CursorValue::Null, 1.5.into(), (-7).into()],
            Some(Value::Null),
            Some(vec![false, true]),
        );
        let parsed = PagingCursor::parse(&cursor.to_token().unwrap()).unwrap();
        assert_eq!(parsed, cursor);
        assert_eq!(parsed.context(), Some(&Value::Null));
    }

    #[test]
    fn payload_layout() {
        let cursor = PagingCursor::new(["a".into(), 2.into()]).with_descending([true]);
        let token = cursor.to_token().unwrap();
        let payload = BASE64_URL_SAFE_NO_PAD.decode(&token).unwrap();
        let payload: Value = serde_json::from_slice(&payload).unwrap();
        assert_eq!(payload, json!([{ "$dsc": [true] }, "a", 2]));

        let empty = PagingCursor::new(Vec::new()).to_token().unwrap();
        let payload = BASE64_URL_SAFE_NO_PAD.decode(&empty).unwrap();
        assert_eq!(payload, b"[{}]");
    }

    #[test]
    fn context_keys_are_ordered() {
        let a = PagingCursor::new([1.into()]).with_context(json!({ "b": 1, "a": 2 }));
        let b = PagingCursor::new([1.into()]).with_context(json!({ "a": 2, "b": 1 }));
        assert_eq!(a.to_token().unwrap(), b.to_token().unwrap());
    }

    #[test]
    fn padded_tokens_are_accepted() {
        let cursor = PagingCursor::new(["x".into()]);
        let payload = serde_json::to_vec(&PayloadRef::from(&cursor)).unwrap();
        let padded = BASE64_URL_SAFE.encode(payload);
        assert!(padded.ends_with('='));
        assert_eq!(PagingCursor::parse(&padded).unwrap(), cursor);
    }

    #[test]
    fn invalid_base64_is_malformed() {
        let error = PagingCursor::parse("not-valid-base64!!!").unwrap_err();
        assert!(matches!(
            error,
            CursorError::MalformedToken(MalformedToken::Base64(_))
        ));
    }

    #[test]
    fn truncated_token_is_malformed() {
        let cursor = PagingCursor::new([false.into(), "hello".into(), 2.into()])
            .with_context(context());
        let token = cursor.to_token().unwrap();
        let error = PagingCursor::parse(&token[..token.len() - 1]).unwrap_err();
        assert!(error.is_malformed());
    }

    #[test]
    fn malformed_payloads_are_rejected() {
        let payloads = [
            "{}",
            "[]",
            "[1, 2]",
            "[[], 2]",
            "[{\"$dsc\": [1]}, 2]",
            "[{}, 1",
        ];

        for payload in payloads {
            let token = BASE64_URL_SAFE_NO_PAD.encode(payload);
            let error = PagingCursor::parse(&token).unwrap_err();
            assert!(
                matches!(error, CursorError::MalformedToken(MalformedToken::Payload(_))),
                "{payload} produced {error:?}"
            );
        }
    }

    #[test]
    fn nested_values_round_trip() {
        let token = BASE64_URL_SAFE_NO_PAD.encode(r#"[{},[1,2],{"a":1}]"#);
        let cursor = PagingCursor::parse(&token).unwrap();
        assert_eq!(cursor.values()[0].type_name(), "array");
        assert_eq!(cursor.values()[1].type_name(), "object");

        let reparsed = PagingCursor::parse(&cursor.to_token().unwrap()).unwrap();
        assert_eq!(reparsed, cursor);
        assert_eq!(cursor.to_token().unwrap(), token);
    }

    #[test]
    fn invalid_utf8_is_malformed() {
        let token = BASE64_URL_SAFE_NO_PAD.encode([0x5b, 0xff, 0x5d]);
        let error = PagingCursor::parse(&token).unwrap_err();
        assert!(matches!(
            error,
            CursorError::MalformedToken(MalformedToken::Utf8(_))
        ));
    }

    #[test]
    fn unknown_metadata_keys_are_ignored() {
        let token = BASE64_URL_SAFE_NO_PAD.encode(r#"[{"$ctx": 1, "$ver": 2}, "a"]"#);
        let cursor = PagingCursor::parse(&token).unwrap();
        assert_eq!(cursor.context(), Some(&json!(1)));
        assert_eq!(cursor.values(), &[CursorValue::from("a")]);
    }

    #[test]
    fn default_api_round_trips_large_cursors() {
        let cursor = PagingCursor::new((0..33).map(CursorValue::from));
        let parsed = PagingCursor::parse(&cursor.to_token().unwrap()).unwrap();
        assert_eq!(parsed, cursor);

        let cursor = PagingCursor::new(["x".repeat(3500).into()]);
        let token = cursor.to_token().unwrap();
        assert!(token.len() > DEFAULT_MAX_TOKEN_LENGTH);
        assert_eq!(PagingCursor::parse(&token).unwrap(), cursor);
    }

    #[test]
    fn codec_decode_enforces_limits() {
        let codec = CursorCodec::new(CursorConfig::new(64, 2)).unwrap();

        let token = PagingCursor::new([1.into(), 2.into(), 3.into()])
            .to_token()
            .unwrap();
        let error = codec.decode(&token).unwrap_err();
        assert!(matches!(
            error,
            CursorError::MalformedToken(MalformedToken::TooManyValues { count: 3, limit: 2 })
        ));

        let token = PagingCursor::new(["x".repeat(100).into()])
            .to_token()
            .unwrap();
        let error = codec.decode(&token).unwrap_err();
        assert!(matches!(
            error,
            CursorError::MalformedToken(MalformedToken::TooLong { limit: 64, .. })
        ));
    }

    #[test]
    fn codec_refuses_tokens_it_cannot_decode() {
        let codec = CursorCodec::new(CursorConfig::new(64, 2)).unwrap();

        let cursor = PagingCursor::new([1.into(), 2.into(), 3.into()]);
        let error = codec.encode(&cursor).unwrap_err();
        assert!(matches!(
            error,
            CursorError::ExceedsLimits(MalformedToken::TooManyValues { count: 3, limit: 2 })
        ));

        let cursor = PagingCursor::new(["x".repeat(100).into()]);
        let error = codec.encode(&cursor).unwrap_err();
        assert!(matches!(
            error,
            CursorError::ExceedsLimits(MalformedToken::TooLong { limit: 64, .. })
        ));

        let cursor = PagingCursor::new(["a".into(), 1.into()]);
        let token = codec.encode(&cursor).unwrap();
        assert_eq!(codec.decode(&token).unwrap(), cursor);
    }

    #[test]
    fn codec_rejects_invalid_config() {
        assert!(CursorCodec::new(CursorConfig::new(0, 1)).is_err());
    }

    #[test]
    fn reverse_inverts_flags() {
        let mut cursor = PagingCursor::new([1.into(), 2.into(), 3.into()])
            .with_descending([false, false, true]);

        cursor.reverse();
        assert_eq!(cursor.descending(), Some(&[true, true, false][..]));

        cursor.reverse();
        assert_eq!(cursor.descending(), Some(&[false, false, true][..]));
    }

    #[test]
    fn reverse_without_flags_is_noop() {
        let mut cursor = PagingCursor::new([1.into()]);
        cursor.reverse();
        assert_eq!(cursor.descending(), None);
        assert!(!cursor.is_descending(0));
    }

    #[test]
    fn reverse_only_affects_own_flags() {
        let flags = vec![true, false];
        let first = PagingCursor::new([1.into(), 2.into()]).with_descending(flags.clone());
        let second = first.clone().reversed();

        assert_eq!(first.descending(), Some(&flags[..]));
        assert_eq!(second.descending(), Some(&[false, true][..]));
    }

    #[test]
    fn missing_flags_default_to_ascending() {
        let cursor = PagingCursor::new([1.into(), 2.into()]).with_descending([true]);
        assert!(cursor.is_descending(0));
        assert!(!cursor.is_descending(1));
    }

    #[test]
    fn string_conversions() {
        let cursor = PagingCursor::new(["a".into()]).with_context(json!("ctx"));
        let token = cursor.to_string();
        assert_eq!(token, cursor.to_token().unwrap());
        assert_eq!(token.parse::<PagingCursor>().unwrap(), cursor);
        assert_eq!(PagingCursor::try_from(token.clone()).unwrap(), cursor);
        assert_eq!(PagingCursor::try_from(token.as_str()).unwrap(), cursor);
    }

    #[test]
    fn serde_uses_token_string() {
        let cursor = PagingCursor::new([10.into()]).with_descending([true]);
        let json = serde_json::to_value(&cursor).unwrap();
        assert_eq!(json, Value::String(cursor.to_token().unwrap()));

        let decoded: PagingCursor = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, cursor);

        assert!(serde_json::from_value::<PagingCursor>(json!("%%%")).is_err());
    }
}
