//! Text canonicalization and word-boundary helpers.

/// Collapse whitespace runs into single spaces and trim both ends.
pub fn normalize(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Case-fold for keyword matching.
pub fn fold(text: &str) -> String {
    text.to_lowercase()
}

/// Remove every whitespace character.
pub fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Number of alphanumeric characters in `text`.
pub fn alnum_len(text: &str) -> usize {
    text.chars().filter(|c| c.is_alphanumeric()).count()
}

/// True when `hay[start..end]` is not glued to a neighbouring character
/// accepted by `joins`.
pub fn bounded_by(hay: &str, start: usize, end: usize, joins: impl Fn(char) -> bool) -> bool {
    let before = hay[..start].chars().next_back();
    let after = hay[end..].chars().next();
    !before.is_some_and(&joins) && !after.is_some_and(&joins)
}

/// Whole-word check on Unicode alphanumerics.
pub fn is_whole_word(hay: &str, start: usize, end: usize) -> bool {
    bounded_by(hay, start, end, char::is_alphanumeric)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_and_trims() {
        assert_eq!(normalize("  list\t over-exploited \n\n districts  "), "list over-exploited districts");
    }

    #[test]
    fn empty_and_blank() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize(" \t\n "), "");
    }

    #[test]
    fn fold_lowercases_unicode() {
        assert_eq!(fold("Pune RURAL"), "pune rural");
        assert_eq!(fold("तुलना"), "तुलना");
    }

    #[test]
    fn strip_and_count() {
        assert_eq!(strip_whitespace("Pune Rural "), "PuneRural");
        assert_eq!(alnum_len("Y.S.R."), 3);
        assert_eq!(alnum_len("Pune-Rural"), 9);
    }

    #[test]
    fn whole_word_boundaries() {
        let hay = "show up to uptown";
        assert!(is_whole_word(hay, 5, 7));
        assert!(!is_whole_word(hay, 11, 13));
        assert!(is_whole_word("j&k", 0, 3));
    }

    #[test]
    fn letter_only_boundaries_allow_digits() {
        let hay = "mehsana2020";
        assert!(bounded_by(hay, 0, 7, char::is_alphabetic));
        assert!(!is_whole_word(hay, 0, 7));
    }
}
