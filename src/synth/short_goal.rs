//! Short-term goal derivation
//!
//! A long-term goal such as "Trẻ nói được câu 10-14 lần" is split into three
//! progressively larger targets. Each extractor below recognizes one kind of
//! number in the text and is tried in a fixed order; the first one that
//! matches produces the two reduced variants, and the original text always
//! fills the third row.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::{debug, warn};

/// Units a bare count must be followed by to be reduced
const COUNT_UNITS: &[&str] = &[
    "hoạt động",
    "đồ vật",
    "chữ cái",
    "con số",
    "lần",
    "từ",
    "câu",
    "bước",
    "phút",
    "giây",
    "hình",
    "màu",
    "bài",
];

static RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)(\s*[-–]\s*)(\d+)").expect("range pattern"));

static RATIO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)(\s*/\s*)(\d+)").expect("ratio pattern"));

static PERCENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(?:[.,]\d+)?)(\s*%)").expect("percent pattern"));

static COUNT: Lazy<Regex> = Lazy::new(|| {
    let units = COUNT_UNITS
        .iter()
        .map(|u| regex::escape(u))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)(\d+)(\s*(?:{units}))\b")).expect("count pattern")
});

/// Which extractor produced the variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitPattern {
    Range,
    Ratio,
    Percent,
    Count,
}

/// Three short-term goal texts, smallest first; the last is the original
pub fn split_short_goals(text: &str) -> [String; 3] {
    match derive_variants(text) {
        Some((pattern, [first, second])) => {
            debug!(?pattern, "derived short-term goals");
            [first, second, text.to_string()]
        }
        None => {
            warn!(goal = text, "no numeric target found, keeping full goal text");
            [text.to_string(), text.to_string(), text.to_string()]
        }
    }
}

/// Try every extractor in order and return the first match
pub fn derive_variants(text: &str) -> Option<(SplitPattern, [String; 2])> {
    split_range(text)
        .map(|v| (SplitPattern::Range, v))
        .or_else(|| split_ratio(text).map(|v| (SplitPattern::Ratio, v)))
        .or_else(|| split_percent(text).map(|v| (SplitPattern::Percent, v)))
        .or_else(|| split_count(text).map(|v| (SplitPattern::Count, v)))
}

fn number(caps: &Captures, group: usize) -> Option<i64> {
    caps.get(group)?.as_str().parse().ok()
}

fn replace_first(text: &str, caps: &Captures, replacement: &str) -> String {
    let Some(whole) = caps.get(0) else {
        return text.to_string();
    };
    format!("{}{}{}", &text[..whole.start()], replacement, &text[whole.end()..])
}

/// `a-b`: both bounds drop by two steps, then one step
///
/// The step is half the range width (at least 1). Bounds never fall below 1
/// and the upper bound stays above the lower one.
pub fn split_range(text: &str) -> Option<[String; 2]> {
    let caps = RANGE.captures(text)?;
    let (low, high) = (number(&caps, 1)?, number(&caps, 3)?);
    if low >= high {
        return None;
    }
    let separator = caps.get(2)?.as_str();
    let step = ((high - low) / 2).max(1);

    let variant = |steps: i64| {
        let new_low = (low - steps * step).max(1);
        let new_high = (high - steps * step).max(new_low + 1);
        replace_first(text, &caps, &format!("{new_low}{separator}{new_high}"))
    };
    Some([variant(2), variant(1)])
}

/// `x/y` with `x <= y`: the numerator drops by two, then one
pub fn split_ratio(text: &str) -> Option<[String; 2]> {
    let caps = RATIO.captures(text)?;
    let (num, den) = (number(&caps, 1)?, number(&caps, 3)?);
    if num > den {
        return None;
    }
    let separator = caps.get(2)?.as_str();
    let variant = |minus: i64| {
        let reduced = (num - minus).max(1);
        replace_first(text, &caps, &format!("{reduced}{separator}{den}"))
    };
    Some([variant(2), variant(1)])
}

/// `x%`: one third, then two thirds, rounded
pub fn split_percent(text: &str) -> Option<[String; 2]> {
    let caps = PERCENT.captures(text)?;
    let value: f64 = caps.get(1)?.as_str().replace(',', ".").parse().ok()?;
    let suffix = caps.get(2)?.as_str();
    let variant = |fraction: f64| {
        let reduced = (value * fraction).round() as i64;
        replace_first(text, &caps, &format!("{reduced}{suffix}"))
    };
    Some([variant(1.0 / 3.0), variant(2.0 / 3.0)])
}

/// `x <unit>`: the count drops by two, then one
pub fn split_count(text: &str) -> Option<[String; 2]> {
    let caps = COUNT.captures(text)?;
    let count = number(&caps, 1)?;
    let unit = caps.get(2)?.as_str();
    let variant = |minus: i64| {
        let reduced = (count - minus).max(1);
        replace_first(text, &caps, &format!("{reduced}{unit}"))
    };
    Some([variant(2), variant(1)])
}
