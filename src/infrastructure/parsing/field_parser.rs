//! Text normalization for listing fields
//!
//! Every function here is pure and never fails: text that cannot be turned
//! into a value yields `None`. Listing markup varies between sponsored and
//! organic items and between regional price formats, so each numeric field
//! is parsed defensively rather than with one fixed pattern.

use once_cell::sync::Lazy;
use regex::Regex;

/// First number with optional grouping commas and an optional decimal part.
/// The integer part may be missing (`.99`).
static PRICE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:\d[\d,]*)?\.?\d+").expect("valid price regex"));

static PRICE_WHOLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d[\d,]*").expect("valid whole-price regex"));

static PRICE_FRACTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{1,2}").expect("valid fraction regex"));

static RATING_OUT_OF_FIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)([0-9]+(?:\.[0-9])?)\s*out of\s*5").expect("valid rating regex")
});

static FIRST_DECIMAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]+(?:\.[0-9])?").expect("valid decimal regex"));

static REVIEW_COUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d[\d,]*").expect("valid review count regex"));

/// `$` followed by the amount; the sigil keeps rank ordinals ("#1") out.
static CURRENCY_AMOUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$([0-9,.]+)").expect("valid currency regex"));

pub const MAX_RATING: f64 = 5.0;

/// Collapse whitespace runs to a single space and trim.
pub fn normalize_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse a formatted price such as `"$1,234.56"`.
pub fn parse_price(raw: &str) -> Option<f64> {
    if raw.is_empty() {
        return None;
    }
    let cleaned = raw.replace('\u{a0}', " ");
    let number = PRICE_NUMBER.find(&cleaned)?;
    strip_grouping(number.as_str()).parse::<f64>().ok()
}

/// Compose a price split across whole and fraction nodes.
///
/// A missing fraction means the whole part is the full price.
pub fn compose_price(whole: Option<&str>, fraction: Option<&str>) -> Option<f64> {
    let whole = whole
        .and_then(|w| PRICE_WHOLE.find(w))
        .map(|m| strip_grouping(m.as_str()))?;
    let fraction = fraction.and_then(|f| PRICE_FRACTION.find(f)).map(|m| m.as_str());

    match fraction {
        Some(fraction) => format!("{whole}.{fraction}").parse::<f64>().ok(),
        None => whole.parse::<f64>().ok(),
    }
}

/// Parse a star rating, preferring the `"<n> out of 5"` phrasing.
///
/// Falls back to the first number in the text. Values are rounded to one
/// decimal place; anything above five stars is rejected.
pub fn parse_rating(raw: &str) -> Option<f64> {
    if raw.is_empty() {
        return None;
    }

    let number = RATING_OUT_OF_FIVE
        .captures(raw)
        .and_then(|c| c.get(1))
        .or_else(|| FIRST_DECIMAL.find(raw))?;

    let value = number.as_str().parse::<f64>().ok()?;
    let rounded = round_to_tenth(value);
    (0.0..=MAX_RATING).contains(&rounded).then_some(rounded)
}

/// Parse a review count such as `"2,345 ratings"`.
pub fn parse_review_count(raw: &str) -> Option<u64> {
    let digits = REVIEW_COUNT.find(raw)?;
    strip_grouping(digits.as_str()).parse::<u64>().ok()
}

/// Last-resort price scan over an item's full visible text.
pub fn parse_currency_fallback(inner_text: &str) -> Option<f64> {
    let text = normalize_text(inner_text);
    let amount = CURRENCY_AMOUNT.captures(&text)?.get(1)?;
    parse_price(amount.as_str())
}

fn strip_grouping(number: &str) -> String {
    number.replace(',', "")
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
