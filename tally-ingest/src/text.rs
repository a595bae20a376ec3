//! Small text utilities shared by every statement format: whitespace
//! collapsing, money tokens, month names.

use std::str::FromStr;
use std::sync::OnceLock;

use chrono::Month;
use regex::Regex;

fn ws_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("ws regex"))
}

fn money_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(?:\d{1,3}(?:,\d{3})+|\d+)\.\d{2}").expect("money regex")
    })
}

pub fn collapse_ws(raw: &str) -> String {
    ws_re().replace_all(raw.trim(), " ").to_string()
}

/// A decimal amount found inside a line of statement text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoneyToken {
    pub value: f64,
    /// Byte offsets of the digits (sign and currency symbol excluded)
    pub start: usize,
    pub end: usize,
    /// `-` directly before the number, or the number wrapped in parentheses
    pub negative: bool,
    /// `+` directly before the number
    pub positive: bool,
    /// `CR` / `DR` printed directly after the number
    pub marker: Option<Marker>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Cr,
    Dr,
}

/// Every `digits.dd` amount in `s`, left to right. Matches followed by a
/// further digit (`1.234`) or by `.digit` (the `01.12` of `01.12.2024`) are
/// not amounts and are skipped.
pub fn money_tokens(s: &str) -> Vec<MoneyToken> {
    let bytes = s.as_bytes();
    money_re()
        .find_iter(s)
        .filter(|m| !continues_number(bytes, m.end()))
        .filter_map(|m| {
            let value: f64 = m.as_str().replace(',', "").parse().ok()?;
            let before = s[..m.start()].trim_end_matches(['£', '$', '€']);
            let negative = before.ends_with('-')
                || (before.ends_with('(') && s[m.end()..].starts_with(')'));
            let positive = before.ends_with('+');
            let after = s[m.end()..].trim_start_matches(')').trim_start();
            let marker = marker_at(after);
            Some(MoneyToken {
                value,
                start: m.start(),
                end: m.end(),
                negative,
                positive,
                marker,
            })
        })
        .collect()
}

fn marker_at(s: &str) -> Option<Marker> {
    let word: String = s.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    match word.to_ascii_uppercase().as_str() {
        "CR" => Some(Marker::Cr),
        "DR" => Some(Marker::Dr),
        _ => None,
    }
}

fn continues_number(bytes: &[u8], end: usize) -> bool {
    match bytes.get(end) {
        Some(b) if b.is_ascii_digit() => true,
        Some(b'.') => bytes.get(end + 1).is_some_and(u8::is_ascii_digit),
        _ => false,
    }
}

/// Parse a free-standing money cell: currency symbols, commas, spaces and
/// `CR`/`DR` suffixes are ignored, parentheses or a trailing `DR` mean
/// negative. Returns `None` for anything that is not a number.
pub fn parse_money(raw: &str) -> Option<f64> {
    let mut s: String = raw
        .chars()
        .filter(|c| !matches!(c, '£' | '$' | '€' | ',' | '"') && !c.is_whitespace())
        .collect();
    if s.is_empty() {
        return None;
    }
    let mut negative = false;
    let upper = s.to_ascii_uppercase();
    if upper.ends_with("DR") {
        negative = true;
        s.truncate(s.len() - 2);
    } else if upper.ends_with("CR") {
        s.truncate(s.len() - 2);
    }
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        negative = true;
        s = inner.to_string();
    }
    let value: f64 = s.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(if negative { -value.abs() } else { value })
}

/// Two amounts equal to the penny.
pub fn same_money(a: f64, b: f64) -> bool {
    (a - b).abs() < 0.005
}

/// Three-letter English month abbreviation for 1..=12.
pub fn month_abbr(month: u32) -> Option<&'static str> {
    const ABBR: [&str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];
    ABBR.get(month.checked_sub(1)? as usize).copied()
}

/// Month number from an English name or abbreviation (`Sept` tolerated).
pub fn month_number(name: &str) -> Option<u32> {
    let name = name.trim().trim_end_matches('.');
    if name.eq_ignore_ascii_case("sept") {
        return Some(9);
    }
    Month::from_str(name).ok().map(|m| m.number_from_month())
}

/// Text before the first amount, with trailing currency symbols removed.
pub fn text_before_first_amount(buffer: &str, tokens: &[MoneyToken]) -> String {
    let head = match tokens.first() {
        Some(t) => &buffer[..t.start],
        None => buffer,
    };
    collapse_ws(head.trim_end_matches(|c: char| matches!(c, '£' | '$' | '€' | '-' | '+' | '(') || c.is_whitespace()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(s: &str) -> Vec<f64> {
        money_tokens(s).iter().map(|t| t.value).collect()
    }

    #[test]
    fn test_money_tokens_grouped_and_plain() {
        assert_eq!(values("TESCO STORES 1,234.56 120.00"), vec![1234.56, 120.0]);
    }

    #[test]
    fn test_money_tokens_skip_dotted_dates() {
        assert_eq!(values("12.01.2024 45.00"), vec![45.0]);
        assert_eq!(values("Opening balance 01.12.2024 500.00"), vec![500.0]);
        assert_eq!(values("TOTAL 45.00."), vec![45.0]);
    }

    #[test]
    fn test_money_tokens_signs_and_markers() {
        let tokens = money_tokens("REFUND +12.00 FEE -3.50 INT (1.25) PAY 40.00CR");
        assert!(tokens[0].positive);
        assert!(tokens[1].negative);
        assert!(tokens[2].negative);
        assert_eq!(tokens[3].marker, Some(Marker::Cr));
    }

    #[test]
    fn test_money_tokens_ignore_three_decimals_and_glued_letters() {
        assert!(values("RATE 1.2345").is_empty());
        assert!(values("E45.57").is_empty());
        assert_eq!(values("£45.57"), vec![45.57]);
    }

    #[test]
    fn test_parse_money_cells() {
        assert_eq!(parse_money("£1,234.56"), Some(1234.56));
        assert_eq!(parse_money(" 4.50 "), Some(4.5));
        assert_eq!(parse_money("(50.00)"), Some(-50.0));
        assert_eq!(parse_money("12.00 DR"), Some(-12.0));
        assert_eq!(parse_money("12.00CR"), Some(12.0));
        assert_eq!(parse_money(""), None);
        assert_eq!(parse_money("n/a"), None);
    }

    #[test]
    fn test_month_lookup() {
        assert_eq!(month_number("Feb"), Some(2));
        assert_eq!(month_number("february"), Some(2));
        assert_eq!(month_number("Sept"), Some(9));
        assert_eq!(month_number("Foo"), None);
        assert_eq!(month_abbr(12), Some("Dec"));
        assert_eq!(month_abbr(0), None);
    }

    #[test]
    fn test_text_before_first_amount_drops_currency() {
        let buf = "TESCO STORES £45.57 120.00";
        let tokens = money_tokens(buf);
        assert_eq!(text_before_first_amount(buf, &tokens), "TESCO STORES");
    }
}
