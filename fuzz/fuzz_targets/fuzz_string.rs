//! Fuzz testing for string span operations.
//!
//! Checks that bitap and the naive scan agree, that reversing twice restores
//! the content, and that bounded encodes never split a character.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use structview::views::string::{self, search_naive};
use structview::{Searcher, StringView};

#[derive(Debug, Arbitrary)]
struct StringInput {
    haystack: Vec<u8>,
    needle: Vec<u8>,
    from: u16,
    text: String,
    max_bytes: Option<u8>,
    replacement: Vec<u8>,
}

fuzz_target!(|input: StringInput| {
    let from = input.from as usize;
    let mut searcher = Searcher::new();
    assert_eq!(
        searcher.search_bitap(&input.haystack, &input.needle, from),
        search_naive(&input.haystack, &input.needle, from)
    );

    let max = input.max_bytes.map(usize::from);
    let mut view = StringView::from_str(&input.text, max);
    let before = view.content().to_vec();
    assert!(std::str::from_utf8(&before).is_ok());
    view.reverse();
    view.reverse();
    assert_eq!(view.content(), &before[..]);

    let mut buffer = vec![0u8; input.text.len() + 4];
    let written = string::encode(&input.text, &mut buffer, 2, max).expect("start is in bounds");
    assert!(input.text.is_char_boundary(written));
    let decoded = string::decode(&buffer, 2, written).expect("span is in bounds");
    assert!(input.text.starts_with(&*decoded) || input.text[..written].contains('\0'));

    let mut haystack = StringView::new(input.haystack.clone());
    let replaced = haystack.replace(&input.needle, &input.replacement);
    assert!(input.needle.is_empty() || replaced <= input.haystack.len());
    assert_eq!(haystack.byte_length(), input.haystack.len());

    let mut shared = StringView::new(input.haystack.clone());
    assert_eq!(shared.replace_with(&mut searcher, &input.needle, &input.replacement), replaced);
    assert_eq!(shared.bytes(), haystack.bytes());
});
