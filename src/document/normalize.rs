//! Text normalization for fuzzy matching
//!
//! Header markers, labels and skill names are compared after lowercasing,
//! folding diacritics to their base letter and collapsing whitespace, so
//! "Kỹ  Năng" and "ky nang" compare equal.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Base letter followed by every precomposed variant that folds onto it
const FOLD_GROUPS: &[(char, &str)] = &[
    ('a', "àáảãạăằắẳẵặâầấẩẫậäåāą"),
    ('e', "èéẻẽẹêềếểễệëēę"),
    ('i', "ìíỉĩịîïī"),
    ('o', "òóỏõọôồốổỗộơờớởỡợöøō"),
    ('u', "ùúủũụưừứửữựûüū"),
    ('y', "ỳýỷỹỵÿ"),
    ('d', "đ"),
    ('c', "ç"),
    ('n', "ñ"),
];

static FOLD_TABLE: Lazy<HashMap<char, char>> = Lazy::new(|| {
    FOLD_GROUPS
        .iter()
        .flat_map(|(base, variants)| variants.chars().map(move |v| (v, *base)))
        .collect()
});

fn is_combining_mark(c: char) -> bool {
    matches!(c, '\u{0300}'..='\u{036F}')
}

/// Fold a single lowercase character to its base letter
pub fn fold_char(c: char) -> char {
    FOLD_TABLE.get(&c).copied().unwrap_or(c)
}

/// Lowercase, strip diacritics and collapse whitespace
pub fn normalize_text(text: &str) -> String {
    let folded: String = text
        .to_lowercase()
        .chars()
        .filter(|c| !is_combining_mark(*c))
        .map(fold_char)
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether `needle` occurs in `haystack` once both are normalized
pub fn contains_normalized(haystack: &str, needle: &str) -> bool {
    normalize_text(haystack).contains(&normalize_text(needle))
}
