//! Input decoding for the two symbol models the evaluator supports.

/// How a program interprets the haystack's bytes.
///
/// Programs compiled in one mode only run correctly in that mode, so the
/// mode travels with the compiled program rather than with the search call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    /// UTF-8 text. Symbols are scalar values, decoded leniently: any
    /// invalid sequence yields U+FFFD and advances one byte.
    #[default]
    Char,
    /// Raw bytes. Every byte is one symbol, mapped through Latin-1 so byte
    /// `0xE9` compares equal to `'é'`.
    Byte,
}

/// Decodes the symbol beginning at byte offset `at`, returning it with its
/// width in bytes. Returns `None` at or past the end of the haystack.
pub(crate) fn decode(mode: Mode, haystack: &[u8], at: usize) -> Option<(char, usize)> {
    match mode {
        Mode::Byte => haystack.get(at).map(|&b| (char::from(b), 1)),
        Mode::Char => {
            if at >= haystack.len() {
                None
            } else {
                Some(decode_utf8_lossy(&haystack[at..]))
            }
        }
    }
}

/// Decodes the symbol ending at byte offset `at`, for zero-width lookbehind
/// checks. Returns `None` at offset 0.
pub(crate) fn decode_last(mode: Mode, haystack: &[u8], at: usize) -> Option<char> {
    match mode {
        Mode::Byte => at
            .checked_sub(1)
            .and_then(|prev| haystack.get(prev))
            .map(|&b| char::from(b)),
        Mode::Char => {
            if at == 0 || at > haystack.len() {
                return None;
            }

            // Walk back at most one scalar's worth of bytes to the nearest
            // non-continuation byte, then decode forward from there.
            let floor = at.saturating_sub(4);
            let mut start = at - 1;
            while start > floor && haystack[start] & 0b1100_0000 == 0b1000_0000 {
                start -= 1;
            }

            let (ch, width) = decode_utf8_lossy(&haystack[start..]);
            if start + width == at {
                Some(ch)
            } else {
                Some(char::REPLACEMENT_CHARACTER)
            }
        }
    }
}

/// Decodes the leading scalar of a non-empty byte slice, substituting
/// U+FFFD with a width of 1 for any invalid sequence.
fn decode_utf8_lossy(bytes: &[u8]) -> (char, usize) {
    let width = match bytes[0] {
        b if b < 0x80 => return (char::from(b), 1),
        b if b < 0xC0 => 1,
        b if b < 0xE0 => 2,
        b if b < 0xF0 => 3,
        b if b < 0xF8 => 4,
        _ => 1,
    };

    if bytes.len() < width {
        return (char::REPLACEMENT_CHARACTER, 1);
    }

    match std::str::from_utf8(&bytes[..width]) {
        Ok(s) => match s.chars().next() {
            Some(ch) => (ch, width),
            None => (char::REPLACEMENT_CHARACTER, 1),
        },
        Err(_) => (char::REPLACEMENT_CHARACTER, 1),
    }
}

/// The word-character class backing `\b` and `\B`: `[0-9A-Za-z_]`.
pub(crate) fn is_word_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}
