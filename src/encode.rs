//! Percent-encoding with the OAuth reserved character rules.
//!
//! Everything outside `A-Z a-z 0-9 - . _ ~` is escaped, `! * ' ( )` included,
//! and spaces become `%20`. Every place that puts text on the wire or into the
//! signature base string goes through [`encode`].

use std::borrow::Cow;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-encodes `text` for signature base strings and header values.
pub fn encode(text: &str) -> String {
    utf8_percent_encode(text, OAUTH_ENCODE_SET).to_string()
}

/// Reverses [`encode`].
///
/// `+` is left untouched; only `%XX` sequences are decoded.
pub fn decode(text: &str) -> Result<Cow<'_, str>, std::str::Utf8Error> {
    percent_decode_str(text).decode_utf8()
}

/// Encodes `(name, value)` pairs as `name=value&...`.
pub(crate) fn encode_pairs<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}
