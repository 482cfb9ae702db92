//! # StringView - UTF-8 Byte Span Codec
//!
//! `StringView` wraps a byte span holding UTF-8 text terminated by the first
//! zero byte (or the end of the span). It decodes zero-copy and mutates in
//! place; nothing here grows or shrinks the underlying buffer.
//!
//! ## Operations
//!
//! | Operation | Behavior |
//! |-----------|----------|
//! | `encode` | writes up to `max_bytes`, truncating on a char boundary, zero-fills the rest of a bounded span |
//! | `decode` | text before the first zero byte, lossy on invalid UTF-8 |
//! | `trim` | narrows the view past trailing zero bytes |
//! | `reverse` | reverses characters (not bytes) of the content in place |
//! | `search` | leftmost match at or after `from`, naive or bitap |
//! | `replace` | overwrites each match in place with the replacement bytes |
//!
//! ## Search Algorithms
//!
//! Short haystacks use a naive scan. Haystacks longer than
//! `BITAP_MIN_HAYSTACK_LEN` with needles of at most `BITAP_MAX_NEEDLE_LEN`
//! bytes use bitap (shift-or): a 256-entry mask table is populated from the
//! needle and a 64-bit register tracks every partial match in one shift and
//! one OR per haystack byte. The mask table lives in a reusable [`Searcher`].
//! Both scans return the same index for the same input.
//!
//! ## Replace Contract
//!
//! `replace` writes exactly `replacement.len()` bytes at each match start
//! (clamped to the span) and resumes after the written bytes. A longer
//! replacement overwrites whatever follows the match; a shorter one leaves the
//! tail of the match in place.

use eyre::{ensure, Result};
use std::borrow::Cow;

use crate::config::{BITAP_MAX_NEEDLE_LEN, BITAP_MIN_HAYSTACK_LEN};
use crate::layout::{Codec, StringType};
use crate::types::Value;

impl Codec for StringType {
    fn fixed_len(&self) -> Option<usize> {
        self.max_length
    }

    fn encoded_len(&self, value: &Value<'_>) -> Result<usize> {
        match value {
            Value::Null => Ok(0),
            Value::Text(s) => Ok(utf8_prefix_len(s, self.max_length.unwrap_or(usize::MAX))),
            other => eyre::bail!("expected text for string field, got {}", other.kind_name()),
        }
    }

    fn encode(&self, value: &Value<'_>, out: &mut [u8]) -> Result<usize> {
        let text = match value {
            Value::Null => "",
            Value::Text(s) => s.as_ref(),
            other => eyre::bail!("expected text for string field, got {}", other.kind_name()),
        };
        let limit = self.max_length.map_or(out.len(), |max| max.min(out.len()));
        let n = utf8_prefix_len(text, limit);
        out[..n].copy_from_slice(&text.as_bytes()[..n]);
        out[n..].fill(0);
        Ok(n)
    }

    fn decode<'a>(&self, data: &'a [u8]) -> Result<Value<'a>> {
        Ok(Value::Text(decode_content(data)))
    }
}

/// Length of the longest prefix of `s` that fits in `max` bytes and ends on a
/// char boundary.
pub fn utf8_prefix_len(s: &str, max: usize) -> usize {
    if s.len() <= max {
        return s.len();
    }
    let mut n = max;
    while !s.is_char_boundary(n) {
        n -= 1;
    }
    n
}

/// Bytes before the first zero byte.
pub fn content_len(data: &[u8]) -> usize {
    data.iter().position(|&b| b == 0).unwrap_or(data.len())
}

fn decode_content(data: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(&data[..content_len(data)])
}

#[derive(Debug, Clone)]
pub struct StringView<B> {
    data: B,
}

impl<B: AsRef<[u8]>> StringView<B> {
    pub fn new(data: B) -> Self {
        Self { data }
    }

    pub fn bytes(&self) -> &[u8] {
        self.data.as_ref()
    }

    pub fn byte_length(&self) -> usize {
        self.data.as_ref().len()
    }

    /// The text bytes, up to the first zero byte.
    pub fn content(&self) -> &[u8] {
        let data = self.data.as_ref();
        &data[..content_len(data)]
    }

    pub fn as_str(&self) -> Cow<'_, str> {
        decode_content(self.data.as_ref())
    }

    pub fn to_value(&self) -> Value<'_> {
        Value::Text(self.as_str())
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::String(self.as_str().into_owned())
    }

    /// Narrows the view to exclude trailing zero bytes.
    pub fn trim(&self) -> StringView<&[u8]> {
        let data = self.data.as_ref();
        let end = data.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        StringView::new(&data[..end])
    }

    /// Builds a fresh mask table; `search_with` reuses one.
    pub fn search(&self, needle: &[u8], from: usize) -> Option<usize> {
        Searcher::new().search(self.data.as_ref(), needle, from)
    }

    pub fn search_with(&self, searcher: &mut Searcher, needle: &[u8], from: usize) -> Option<usize> {
        searcher.search(self.data.as_ref(), needle, from)
    }

    pub fn into_inner(self) -> B {
        self.data
    }
}

/// Writes `value` at `start` of `buffer`, returning the number of text bytes
/// written.
///
/// With `max_bytes` the span `[start, start + max_bytes)` (clamped to the
/// buffer) is zero-filled past the text; without it only the text bytes are
/// touched.
pub fn encode(
    value: &str,
    buffer: &mut [u8],
    start: usize,
    max_bytes: Option<usize>,
) -> Result<usize> {
    ensure!(
        start <= buffer.len(),
        "string start {} is past the end of a {} byte buffer",
        start,
        buffer.len()
    );
    let end = match max_bytes {
        Some(max) => start.saturating_add(max).min(buffer.len()),
        None => buffer.len(),
    };
    let span = &mut buffer[start..end];
    let n = utf8_prefix_len(value, span.len());
    span[..n].copy_from_slice(&value.as_bytes()[..n]);
    if max_bytes.is_some() {
        span[n..].fill(0);
    }
    Ok(n)
}

/// Decodes `length` bytes at `start` of `buffer`.
pub fn decode(buffer: &[u8], start: usize, length: usize) -> Result<Cow<'_, str>> {
    ensure!(
        start.checked_add(length).is_some_and(|end| end <= buffer.len()),
        "string span {}+{} exceeds buffer of {} bytes",
        start,
        length,
        buffer.len()
    );
    Ok(decode_content(&buffer[start..start + length]))
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> StringView<B> {
    /// Overwrites the span with `value`, zero-filling the remainder.
    pub fn set(&mut self, value: &str) -> usize {
        let span = self.data.as_mut();
        let n = utf8_prefix_len(value, span.len());
        span[..n].copy_from_slice(&value.as_bytes()[..n]);
        span[n..].fill(0);
        n
    }

    /// Reverses the characters of the content in place.
    pub fn reverse(&mut self) {
        let data = self.data.as_mut();
        let len = content_len(data);
        reverse_utf8(&mut data[..len]);
    }

    /// Replaces every occurrence of `needle`, returning how many were written.
    pub fn replace(&mut self, needle: &[u8], replacement: &[u8]) -> usize {
        self.replace_with(&mut Searcher::new(), needle, replacement)
    }

    /// `replace` with a caller-owned mask table, for repeated calls.
    pub fn replace_with(&mut self, searcher: &mut Searcher, needle: &[u8], replacement: &[u8]) -> usize {
        if needle.is_empty() {
            return 0;
        }
        let data = self.data.as_mut();
        let mut from = 0;
        let mut count = 0;
        while let Some(idx) = searcher.search(data, needle, from) {
            let end = (idx + replacement.len()).min(data.len());
            data[idx..end].copy_from_slice(&replacement[..end - idx]);
            count += 1;
            from = idx + replacement.len().max(1);
            if from >= data.len() {
                break;
            }
        }
        count
    }
}

impl StringView<Vec<u8>> {
    /// Allocates a span of `max_length` bytes (or exactly the text length).
    pub fn from_str(value: &str, max_length: Option<usize>) -> Self {
        let mut data = vec![0u8; max_length.unwrap_or(value.len())];
        let n = utf8_prefix_len(value, data.len());
        data[..n].copy_from_slice(&value.as_bytes()[..n]);
        Self { data }
    }
}

/// Reverses UTF-8 text by characters: reverse all bytes, then put each
/// multi-byte sequence back in forward order using its lead byte.
pub fn reverse_utf8(bytes: &mut [u8]) {
    bytes.reverse();
    for i in 0..bytes.len() {
        let seq = match bytes[i] >> 4 {
            0xC | 0xD => 2,
            0xE => 3,
            0xF => 4,
            _ => 1,
        };
        if seq > 1 && i + 1 >= seq {
            bytes[i + 1 - seq..=i].reverse();
        }
    }
}

/// Leftmost occurrence of `needle` in `haystack` at or after `from`.
pub fn search_naive(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() {
        return None;
    }
    if needle.is_empty() {
        return Some(from);
    }
    if needle.len() > haystack.len() - from {
        return None;
    }
    (from..=haystack.len() - needle.len()).find(|&i| &haystack[i..i + needle.len()] == needle)
}

/// Reusable bitap mask table.
#[derive(Clone)]
pub struct Searcher {
    masks: [u64; 256],
}

impl Default for Searcher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Searcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Searcher").finish_non_exhaustive()
    }
}

impl Searcher {
    pub fn new() -> Self {
        Self { masks: [!0; 256] }
    }

    fn load(&mut self, needle: &[u8]) {
        self.masks.fill(!0);
        for (i, &b) in needle.iter().enumerate() {
            self.masks[b as usize] &= !(1u64 << i);
        }
    }

    /// Picks bitap for long haystacks and short needles, naive otherwise.
    pub fn search(&mut self, haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
        if haystack.len() > BITAP_MIN_HAYSTACK_LEN && needle.len() <= BITAP_MAX_NEEDLE_LEN {
            self.search_bitap(haystack, needle, from)
        } else {
            search_naive(haystack, needle, from)
        }
    }

    /// Shift-or scan. Needles longer than the register fall back to naive.
    pub fn search_bitap(&mut self, haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
        if from > haystack.len() {
            return None;
        }
        if needle.is_empty() {
            return Some(from);
        }
        let m = needle.len();
        if m > BITAP_MAX_NEEDLE_LEN {
            return search_naive(haystack, needle, from);
        }
        self.load(needle);
        let hit = 1u64 << (m - 1);
        let mut state = !0u64;
        for (j, &b) in haystack[from..].iter().enumerate() {
            state = (state << 1) | self.masks[b as usize];
            if state & hit == 0 {
                return Some(from + j + 1 - m);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn encode_truncates_on_char_boundary() {
        let mut buf = [0xFFu8; 6];
        let n = encode("aé€", &mut buf, 1, Some(4)).unwrap();
        assert_eq!(n, 3);
        assert_eq!(&buf, &[0xFF, b'a', 0xC3, 0xA9, 0, 0xFF]);
        assert_eq!(decode(&buf, 1, 4).unwrap(), "aé");
    }

    #[test]
    fn decode_stops_at_first_zero() {
        let buf = b"ab\0cd";
        assert_eq!(decode(buf, 0, 5).unwrap(), "ab");
        assert!(decode(buf, 3, 5).is_err());
    }

    #[test]
    fn trim_drops_trailing_zeros_only() {
        let view = StringView::new(&b"a\0b\0\0"[..]);
        assert_eq!(view.trim().bytes(), b"a\0b");
        let empty = StringView::new(&[0u8, 0][..]);
        assert_eq!(empty.trim().byte_length(), 0);
    }

    #[test]
    fn reverse_handles_multibyte_sequences() {
        let mut view = StringView::from_str("añ€😀z", Some(16));
        view.reverse();
        assert_eq!(view.as_str(), "z😀€ña");
        view.reverse();
        assert_eq!(view.as_str(), "añ€😀z");
        assert_eq!(view.bytes().len(), 16);
    }

    #[test]
    fn reverse_is_an_involution_on_random_text() {
        let mut rng = StdRng::seed_from_u64(7);
        let alphabet = ['a', 'z', 'é', 'ß', '中', '€', '😀', ' '];
        for _ in 0..200 {
            let len = rng.gen_range(0..40);
            let text: String = (0..len)
                .map(|_| alphabet[rng.gen_range(0..alphabet.len())])
                .collect();
            let mut view = StringView::from_str(&text, None);
            view.reverse();
            let reversed: String = text.chars().rev().collect();
            assert_eq!(view.as_str(), reversed);
            view.reverse();
            assert_eq!(view.bytes(), text.as_bytes());
        }
    }

    #[test]
    fn search_respects_from_index() {
        let view = StringView::new(&b"abcabc"[..]);
        assert_eq!(view.search(b"bc", 0), Some(1));
        assert_eq!(view.search(b"bc", 2), Some(4));
        assert_eq!(view.search(b"bc", 5), None);
        assert_eq!(view.search(b"", 6), Some(6));
        assert_eq!(view.search(b"", 7), None);
    }

    #[test]
    fn naive_and_bitap_agree_on_random_inputs() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut searcher = Searcher::new();
        for _ in 0..2000 {
            let hay_len = rng.gen_range(0..(BITAP_MIN_HAYSTACK_LEN * 2));
            let needle_len = rng.gen_range(0..=BITAP_MAX_NEEDLE_LEN.min(8));
            let haystack: Vec<u8> = (0..hay_len).map(|_| rng.gen_range(b'a'..=b'c')).collect();
            let needle: Vec<u8> = (0..needle_len).map(|_| rng.gen_range(b'a'..=b'c')).collect();
            let from = rng.gen_range(0..=hay_len + 1);
            let naive = search_naive(&haystack, &needle, from);
            let bitap = searcher.search_bitap(&haystack, &needle, from);
            assert_eq!(naive, bitap, "needle {:?} from {}", needle, from);
            assert_eq!(searcher.search(&haystack, &needle, from), naive);
        }
    }

    #[test]
    fn bitap_handles_full_register_needle() {
        let mut haystack = vec![b'x'; 1000];
        let needle = vec![b'q'; BITAP_MAX_NEEDLE_LEN];
        haystack[700..700 + needle.len()].copy_from_slice(&needle);
        let mut searcher = Searcher::new();
        assert_eq!(searcher.search_bitap(&haystack, &needle, 0), Some(700));
        assert_eq!(search_naive(&haystack, &needle, 0), Some(700));
    }

    #[test]
    fn replace_preserves_buffer_length() {
        let mut view = StringView::from_str("one two one", None);
        assert_eq!(view.replace(b"one", b"1"), 2);
        assert_eq!(view.as_str(), "1ne two 1ne");

        let mut view = StringView::from_str("ab-ab-", None);
        assert_eq!(view.replace(b"ab", b"XYZ"), 2);
        assert_eq!(view.as_str(), "XYZXYZ");

        let mut view = StringView::from_str("aaa", None);
        assert_eq!(view.replace(b"a", b"bbbb"), 1);
        assert_eq!(view.as_str(), "bbb");
    }

    #[test]
    fn shared_searcher_replaces_like_a_fresh_one() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut searcher = Searcher::new();
        for _ in 0..100 {
            let len = rng.gen_range(0..(BITAP_MIN_HAYSTACK_LEN * 2));
            let text: String = (0..len).map(|_| rng.gen_range(b'a'..=b'c') as char).collect();
            let needle: Vec<u8> = (0..rng.gen_range(1..4)).map(|_| rng.gen_range(b'a'..=b'c')).collect();
            let replacement: Vec<u8> = (0..rng.gen_range(0..4)).map(|_| b'x').collect();

            let mut fresh = StringView::from_str(&text, None);
            let mut shared = StringView::from_str(&text, None);
            let expected = fresh.replace(&needle, &replacement);
            assert_eq!(shared.replace_with(&mut searcher, &needle, &replacement), expected);
            assert_eq!(shared.bytes(), fresh.bytes());
        }
    }
}
