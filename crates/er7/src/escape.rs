//! Escape sequences for delimiter characters embedded in text values.
//!
//! Supported sequences: `\F\` field, `\S\` component, `\T\` subcomponent, `\R\` repetition and
//! `\E\` escape (shown with the default escape character). Any other sequence, such as
//! highlighting or hex escapes, is left verbatim.

use crate::Delimiters;

/// Decode the delimiter escape sequences in `text`.
pub fn unescape(text: &str, delimiters: &Delimiters) -> String {
    let esc = delimiters.escape;
    if !text.contains(esc) {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find(esc) {
        out.push_str(&rest[..start]);
        let after = &rest[start + esc.len_utf8()..];

        let decoded = after.find(esc).and_then(|end| {
            let replacement = match &after[..end] {
                "F" => delimiters.field,
                "S" => delimiters.component,
                "T" => delimiters.subcomponent,
                "R" => delimiters.repetition,
                "E" => delimiters.escape,
                _ => return None,
            };
            Some((replacement, end))
        });

        match decoded {
            Some((ch, end)) => {
                out.push(ch);
                rest = &after[end + esc.len_utf8()..];
            }
            None => {
                out.push(esc);
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Encode delimiter characters in `text` so it can be placed inside a single field.
///
/// Segment terminators and line breaks are replaced by spaces; they cannot be escaped.
pub fn escape(text: &str, delimiters: &Delimiters) -> String {
    let esc = delimiters.escape;
    let mut out = String::with_capacity(text.len());

    for ch in text.chars() {
        match escape_code(ch, delimiters) {
            Some(code) => {
                out.push(esc);
                out.push(code);
                out.push(esc);
            }
            None if ch == '\r' || ch == '\n' => out.push(' '),
            None => out.push(ch),
        }
    }

    out
}

/// Longest prefix of `text` whose [`escape`]d form is at most `max_chars` characters.
///
/// The cut always falls between source characters, so an escape sequence is never split.
pub fn escaped_prefix<'a>(text: &'a str, delimiters: &Delimiters, max_chars: usize) -> &'a str {
    let mut used = 0;
    for (idx, ch) in text.char_indices() {
        let width = if escape_code(ch, delimiters).is_some() { 3 } else { 1 };
        if used + width > max_chars {
            return &text[..idx];
        }
        used += width;
    }
    text
}

fn escape_code(ch: char, delimiters: &Delimiters) -> Option<char> {
    if ch == delimiters.escape {
        Some('E')
    } else if ch == delimiters.field {
        Some('F')
    } else if ch == delimiters.component {
        Some('S')
    } else if ch == delimiters.subcomponent {
        Some('T')
    } else if ch == delimiters.repetition {
        Some('R')
    } else {
        None
    }
}
