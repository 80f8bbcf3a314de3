//! Currency amount domain logic.
//!
//! This module encapsulates the price conventions of the catalogs: detection
//! patterns for symbol-prefixed and bare amounts, and a parser that accepts
//! both the `1.234,56` and `1,234.56` separator conventions.

use super::PatternMatcher;
use once_cell::sync::Lazy;
use regex::Regex;

/// Currency symbol printed in front of every price.
pub const CURRENCY_SYMBOL: &str = "R$";

/// Largest magnitude (in cents) that still formats without overflow.
const MAX_CENTS: f64 = 9.0e15;

/// Matcher for symbol-prefixed prices.
///
/// Accepts:
/// - R$ 14,00
/// - R$14.00
/// - R$ 1.234,56
/// - R$ 1,234.56
/// - R$ 1500,00 (ungrouped integer part)
/// - r$ 10 (case-insensitive symbol, optional fraction)
#[derive(Debug, Clone, Default)]
pub struct CurrencyMatcher;

impl CurrencyMatcher {
    pub fn new() -> Self {
        Self
    }

    fn regex() -> &'static Regex {
        static PATTERN: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r"(?i)R\$\s*(\d+(?:[.,]\d{3})*(?:[.,]\d{1,2})?)")
                .expect("Valid currency regex")
        });
        &PATTERN
    }

    /// Returns the first price in `text`, if any.
    pub fn find<'a>(&self, text: &'a str) -> Option<&'a str> {
        Self::regex().find(text).map(|m| m.as_str())
    }

    /// True if `text` contains the currency symbol in any letter case.
    pub fn has_symbol(text: &str) -> bool {
        text.to_lowercase().contains(&CURRENCY_SYMBOL.to_lowercase())
    }

    /// True if `token` is the bare symbol, optionally followed by `:` or `.`.
    pub fn is_bare_symbol(token: &str) -> bool {
        let token = token.trim().to_lowercase();
        let symbol = CURRENCY_SYMBOL.to_lowercase();
        token == symbol || token == format!("{}:", symbol) || token == format!("{}.", symbol)
    }
}

impl PatternMatcher for CurrencyMatcher {
    fn pattern(&self) -> &Regex {
        Self::regex()
    }

    fn extract_all<'a>(&self, text: &'a str) -> Vec<&'a str> {
        self.pattern().find_iter(text).map(|m| m.as_str()).collect()
    }
}

/// Matcher for bare amounts without a currency symbol.
///
/// An amount qualifies when it has an integer part, grouped or not, followed
/// by a separator and exactly two fraction digits, e.g. `14,00` or `1.234,56`.
#[derive(Debug, Clone, Default)]
pub struct AmountMatcher;

impl AmountMatcher {
    pub fn new() -> Self {
        Self
    }

    fn regex() -> &'static Regex {
        static PATTERN: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r"\d+(?:[.,]\d{3})*[.,]\d{2}").expect("Valid amount regex")
        });
        &PATTERN
    }

    pub fn find<'a>(&self, text: &'a str) -> Option<&'a str> {
        Self::regex().find(text).map(|m| m.as_str())
    }
}

impl PatternMatcher for AmountMatcher {
    fn pattern(&self) -> &Regex {
        Self::regex()
    }

    fn extract_all<'a>(&self, text: &'a str) -> Vec<&'a str> {
        self.pattern().find_iter(text).map(|m| m.as_str()).collect()
    }
}

/// True if `text` contains something shaped like a price even without the
/// currency symbol.
pub fn looks_like_price(text: &str) -> bool {
    AmountMatcher::regex().is_match(text)
}

/// Locale-tolerant price parsing and canonical price formatting.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumericFormatter;

impl NumericFormatter {
    /// Parses a price string into an amount.
    ///
    /// # Rules
    /// - No separator: parsed directly.
    /// - Only commas: the comma is the decimal point.
    /// - Only periods: several periods are thousands separators except the
    ///   last; a single period is decimal when it falls within the last three
    ///   characters, otherwise a thousands separator.
    /// - Both: the rightmost separator is the decimal point.
    ///
    /// Unparseable input yields `0.0`, which callers treat as "not a price".
    pub fn parse(text: &str) -> f64 {
        let stripped = strip_symbol(text);
        let clean: String = stripped.chars().filter(|c| !c.is_whitespace()).collect();

        let (negative, digits) = match clean.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, clean.as_str()),
        };

        if digits.is_empty()
            || !digits
                .chars()
                .all(|c| c.is_ascii_digit() || c == '.' || c == ',')
        {
            return 0.0;
        }

        let normalized = normalize_separators(digits);
        let value = match normalized.parse::<f64>() {
            Ok(v) if v.is_finite() => v,
            _ => return 0.0,
        };

        if negative {
            -value
        } else {
            value
        }
    }

    /// Formats an amount as `R$ 1.234,50`.
    ///
    /// Negative amounts keep their sign in front of the digits
    /// (`R$ -5,00`); amounts that round to zero cents print as `R$ 0,00`.
    pub fn format(value: f64) -> String {
        Self::try_format(value).unwrap_or_else(|| format!("{} 0,00", CURRENCY_SYMBOL))
    }

    /// Formats an amount, returning `None` when the value cannot be printed
    /// as a price (not finite or out of range).
    pub fn try_format(value: f64) -> Option<String> {
        if !value.is_finite() {
            return None;
        }
        let cents = (value * 100.0).round();
        if cents.abs() > MAX_CENTS {
            return None;
        }

        let cents = cents as i64;
        let sign = if cents < 0 { "-" } else { "" };
        let cents = cents.unsigned_abs();
        let integer = group_thousands(cents / 100);

        Some(format!(
            "{} {}{},{:02}",
            CURRENCY_SYMBOL,
            sign,
            integer,
            cents % 100
        ))
    }
}

fn strip_symbol(text: &str) -> String {
    let lower = text.to_lowercase();
    let symbol = CURRENCY_SYMBOL.to_lowercase();
    match lower.find(&symbol) {
        // Lowercasing keeps byte offsets for the ASCII symbol.
        Some(idx) if text.is_char_boundary(idx) && text.is_char_boundary(idx + symbol.len()) => {
            format!("{}{}", &text[..idx], &text[idx + symbol.len()..])
        }
        _ => text.to_string(),
    }
}

fn normalize_separators(digits: &str) -> String {
    let last_dot = digits.rfind('.');
    let last_comma = digits.rfind(',');

    match (last_dot, last_comma) {
        (None, None) => digits.to_string(),
        (None, Some(_)) => digits.replace(',', "."),
        (Some(dot), None) => {
            if digits.matches('.').count() > 1 {
                let (head, tail) = digits.split_at(dot);
                format!("{}{}", head.replace('.', ""), tail)
            } else if digits.len() - dot <= 3 {
                digits.to_string()
            } else {
                digits.replace('.', "")
            }
        }
        (Some(dot), Some(comma)) => {
            if comma > dot {
                digits.replace('.', "").replace(',', ".")
            } else {
                digits.replace(',', "")
            }
        }
    }
}

fn group_thousands(mut value: u64) -> String {
    let mut groups = Vec::new();
    loop {
        if value < 1000 {
            groups.push(value.to_string());
            break;
        }
        groups.push(format!("{:03}", value % 1000));
        value /= 1000;
    }
    groups.reverse();
    groups.join(".")
}
