//! Display-name collation used by the release and namespace sort keys.
//!
//! Approximates the ICU root collation browsers use for `localeCompare`.
//! Both strings are decomposed to NFD first, then compared level by level:
//!
//! 1. primary: base characters with combining marks dropped and case
//!    folded; punctuation and symbols sort before digits, digits before
//!    letters;
//! 2. secondary: unaccented before accented, position by position;
//! 3. tertiary: lowercase before uppercase, position by position;
//! 4. code-point order as the final tie-break, so only identical strings
//!    compare equal.
//!
//! Stroke letters have no canonical decomposition (ø, ł, đ, ħ), so they
//! are mapped onto their base letter with a secondary difference. Letters
//! of different scripts compare by code point at the primary level, with
//! no per-script reordering.

use std::cmp::Ordering;

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

pub fn compare_text(a: &str, b: &str) -> Ordering {
    primary(a)
        .cmp(primary(b))
        .then_with(|| accent_weights(a).cmp(&accent_weights(b)))
        .then_with(|| case_weights(a).cmp(case_weights(b)))
        .then_with(|| a.cmp(b))
}

fn base_chars(s: &str) -> impl Iterator<Item = char> + '_ {
    s.nfd().filter(|c| !is_combining_mark(*c))
}

fn primary(s: &str) -> impl Iterator<Item = (u8, char)> + '_ {
    base_chars(s)
        .map(|c| stroke_base(c).unwrap_or(c))
        .flat_map(char::to_lowercase)
        .map(|c| (char_class(c), c))
}

fn char_class(c: char) -> u8 {
    if c.is_alphabetic() {
        2
    } else if c.is_numeric() {
        1
    } else {
        0
    }
}

fn accent_weights(s: &str) -> Vec<u8> {
    let mut weights: Vec<u8> = Vec::with_capacity(s.len());
    for c in s.nfd() {
        if is_combining_mark(c) {
            if let Some(last) = weights.last_mut() {
                *last = last.saturating_add(1);
            }
            continue;
        }
        weights.push(u8::from(stroke_base(c).is_some()));
    }
    weights
}

fn case_weights(s: &str) -> impl Iterator<Item = u8> + '_ {
    base_chars(s).map(|c| u8::from(c.is_uppercase()))
}

fn stroke_base(c: char) -> Option<char> {
    match c {
        'ø' => Some('o'),
        'Ø' => Some('O'),
        'ł' => Some('l'),
        'Ł' => Some('L'),
        'đ' => Some('d'),
        'Đ' => Some('D'),
        'ħ' => Some('h'),
        'Ħ' => Some('H'),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::cmp::Ordering;

    use crate::ranking::collation::compare_text;

    fn sorted(items: &[&str]) -> Vec<String> {
        let mut out = items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        out.sort_by(|a, b| compare_text(a, b));
        out
    }

    #[test]
    fn ignores_case_before_letters() {
        assert_eq!(
            sorted(&["banana", "Apple", "cherry", "apple"]),
            vec!["apple", "Apple", "banana", "cherry"]
        );
        assert_eq!(compare_text("Zeta", "alpha"), Ordering::Greater);
        assert_eq!(
            sorted(&["banana2", "Banana", "apple"]),
            vec!["apple", "Banana", "banana2"]
        );
        assert_eq!(sorted(&["b", "A", "a"]), vec!["a", "A", "b"]);
    }

    #[test]
    fn accents_are_secondary() {
        assert_eq!(compare_text("resume", "résumé"), Ordering::Less);
        assert_eq!(compare_text("résumé", "resumf"), Ordering::Less);
        // decomposed and precomposed forms tie until the code-point level
        assert_eq!(compare_text("e\u{0301}a", "éa"), Ordering::Less);
    }

    #[test]
    fn only_identical_strings_are_equal() {
        assert_eq!(compare_text("web", "web"), Ordering::Equal);
        assert_ne!(compare_text("Web", "web"), Ordering::Equal);
        assert_eq!(compare_text("", ""), Ordering::Equal);
        assert_eq!(compare_text("", "a"), Ordering::Less);
    }

    #[test]
    fn folds_accents_beyond_latin1() {
        assert_eq!(compare_text("šipka", "zeta"), Ordering::Less);
        assert_eq!(compare_text("čapek", "dog"), Ordering::Less);
        assert_eq!(
            sorted(&["zeta", "šipka", "tango", "ąbc", "őrs"]),
            vec!["ąbc", "őrs", "šipka", "tango", "zeta"]
        );
        assert_eq!(compare_text("sipka", "šipka"), Ordering::Less);
        assert_eq!(compare_text("łódź", "lodz"), Ordering::Greater);
        assert_eq!(compare_text("łódź", "mars"), Ordering::Less);
        assert_eq!(compare_text("øre", "pear"), Ordering::Less);
    }

    #[test]
    fn punctuation_before_digits_before_letters() {
        assert_eq!(compare_text("a_1", "a1"), Ordering::Less);
        assert_eq!(compare_text("a-b", "a1"), Ordering::Less);
        assert_eq!(compare_text("a9", "aa"), Ordering::Less);
    }

    #[test]
    fn dns_labels_sort_naturally() {
        assert_eq!(
            sorted(&["kube-system", "default", "cert-manager", "argo"]),
            vec!["argo", "cert-manager", "default", "kube-system"]
        );
    }
}
