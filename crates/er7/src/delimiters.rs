//! Delimiter characters declared by a message header.

use serde::Serialize;

/// The five separator characters of an ER7 message.
///
/// The field separator is the fourth character of the header segment; the other four come from
/// the encoding-characters field (MSH-2) in the order component, repetition, escape,
/// subcomponent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Delimiters {
    pub field: char,
    pub component: char,
    pub repetition: char,
    pub escape: char,
    pub subcomponent: char,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            field: '|',
            component: '^',
            repetition: '~',
            escape: '\\',
            subcomponent: '&',
        }
    }
}

impl Delimiters {
    /// Build delimiters from a field separator and an encoding-characters string.
    ///
    /// Characters missing from a short encoding string keep their default value, so a header
    /// declaring only `^~` still tokenises with `\` and `&`.
    pub fn from_encoding_characters(field: char, encoding: &str) -> Self {
        let defaults = Self::default();
        if encoding.chars().count() < 4 {
            tracing::trace!(encoding, "short encoding characters, filling from defaults");
        }
        let mut chars = encoding.chars();

        Self {
            field,
            component: chars.next().unwrap_or(defaults.component),
            repetition: chars.next().unwrap_or(defaults.repetition),
            escape: chars.next().unwrap_or(defaults.escape),
            subcomponent: chars.next().unwrap_or(defaults.subcomponent),
        }
    }

    /// Render the encoding-characters field (MSH-2) for these delimiters.
    pub fn encoding_characters(&self) -> String {
        [self.component, self.repetition, self.escape, self.subcomponent]
            .iter()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_standard_encoding_characters() {
        let d = Delimiters::from_encoding_characters('|', "^~\\&");
        assert_eq!(d, Delimiters::default());
        assert_eq!(d.encoding_characters(), "^~\\&");
    }

    #[test]
    fn short_encoding_falls_back_per_character() {
        let d = Delimiters::from_encoding_characters('#', "$");
        assert_eq!(d.field, '#');
        assert_eq!(d.component, '$');
        assert_eq!(d.repetition, '~');
        assert_eq!(d.escape, '\\');
        assert_eq!(d.subcomponent, '&');
    }
}
