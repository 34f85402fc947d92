//! Narration text segmentation.
//!
//! Long slide notes are split into chunks the speech backend accepts,
//! preferring to cut after a sentence terminator, then after a clause
//! break, then at whitespace. Cuts are only taken from the back half of
//! the window so segments do not become needlessly short.

/// Sentence terminators, ASCII and full-width.
fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '?' | '!' | '。' | '？' | '！')
}

/// Comma and semicolon, ASCII and full-width.
fn is_clause_break(c: char) -> bool {
    matches!(c, ',' | ';' | '，' | '；')
}

/// Split `text` into segments of at most `max_len` characters.
///
/// The boundary character stays with the preceding segment. A trailing
/// whitespace-only remainder is dropped, so blank input yields no segments.
/// Lengths are counted in Unicode scalar values.
pub fn segment_text(text: &str, max_len: usize) -> Vec<String> {
    let max_len = max_len.max(1);
    let mut segments = Vec::new();
    let mut rest = text;

    while rest.chars().count() > max_len {
        let cut = split_point(rest, max_len);
        segments.push(rest[..cut].to_string());
        rest = &rest[cut..];
    }

    if !rest.trim().is_empty() {
        segments.push(rest.to_string());
    }
    segments
}

/// Byte offset just past the chosen boundary within the first `max_len` chars.
fn split_point(text: &str, max_len: usize) -> usize {
    let window: Vec<(usize, char)> = text.char_indices().take(max_len).collect();
    let hard_cut = text
        .char_indices()
        .nth(max_len)
        .map(|(byte, _)| byte)
        .unwrap_or(text.len());
    let min_offset = max_len / 2;

    let classes: [fn(char) -> bool; 3] = [is_terminator, is_clause_break, char::is_whitespace];
    for class in classes {
        let found = window
            .iter()
            .enumerate()
            .rev()
            .take_while(|(offset, _)| *offset > min_offset)
            .find(|(_, (_, c))| class(*c));
        if let Some((_, (byte, c))) = found {
            return byte + c.len_utf8();
        }
    }
    hard_cut
}
