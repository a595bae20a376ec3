//! Date grammars shared across formats.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::text::{month_abbr, month_number};

pub(crate) const MONTH_ALT: &str = "Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec";

/// Slash, ISO, `Mon DD, YYYY`, ordinal (`3rd Jan [2025]`) and `DD Mon YYYY`.
fn generic_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let pattern = format!(
            r"(?i)\b(?:\d{{1,2}}/\d{{1,2}}/\d{{2,4}}|\d{{4}}-\d{{2}}-\d{{2}}|(?:{m})[a-z]*\.?\s+\d{{1,2}},\s*\d{{4}}|\d{{1,2}}(?:st|nd|rd|th)\s+(?:{m})[a-z]*(?:\s+\d{{4}})?|\d{{1,2}}\s+(?:{m})[a-z]*\s+\d{{4}})\b",
            m = MONTH_ALT
        );
        Regex::new(&pattern).expect("generic date regex")
    })
}

fn four_digit_year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(19|20)\d{2}\b").expect("year regex"))
}

/// Byte span of the first generic date token in `line`.
pub fn find_date(line: &str) -> Option<(usize, usize)> {
    generic_date_re().find(line).map(|m| (m.start(), m.end()))
}

/// True when `line` starts with a generic date token.
pub fn starts_with_date(line: &str) -> bool {
    find_date(line).is_some_and(|(start, _)| start == 0)
}

/// First plausible four-digit year in `s`.
pub fn first_year(s: &str) -> Option<i32> {
    four_digit_year_re().find(s)?.as_str().parse().ok()
}

/// `DD Mon` plus a year, e.g. `("6", "feb", 2025)` → `06 Feb 2025`.
pub fn day_month_year(day: &str, month: &str, year: i32) -> Option<String> {
    let day: u32 = day.parse().ok()?;
    let month = month_number(month)?;
    NaiveDate::from_ymd_opt(year, month, day)?;
    Some(format!("{:02} {} {}", day, month_abbr(month)?, year))
}

/// `DD/MM/YYYY` → `DD Mon YYYY`.
pub fn slash_to_day_month_year(raw: &str) -> Option<String> {
    let date = NaiveDate::parse_from_str(raw.trim(), "%d/%m/%Y").ok()?;
    Some(date.format("%d %b %Y").to_string())
}
