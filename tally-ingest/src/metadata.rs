//! Best-effort statement-level facts: account number, sort code, period.

use std::sync::OnceLock;

use regex::Regex;
use tally_core::StatementMetadata;

use crate::classify::ParserId;
use crate::text::collapse_ws;

fn account_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\baccount\s*(?:number|no\.?)\s*:?\s*(\d{4}(?: ?\d{4}){1,3})\b")
            .expect("account number regex")
    })
}

fn sort_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{2})[- ](\d{2})[- ](\d{2})\b").expect("sort code regex"))
}

fn sort_code_label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bsort\s*code").expect("sort code label regex"))
}

fn period_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(\d{1,2}(?:st|nd|rd|th)?\s+[a-z]{3,9}(?:\s+\d{4})?)\s+(?:to|-|–)\s+(\d{1,2}(?:st|nd|rd|th)?\s+[a-z]{3,9}\s+\d{4})\b",
        )
        .expect("period regex")
    })
}

pub fn extract_metadata(text: &str, parser: ParserId) -> StatementMetadata {
    let account_number = account_number_re()
        .captures(text)
        .map(|c| c[1].replace(' ', ""));

    let sort_code = text.lines().find_map(|line| {
        let label = sort_code_label_re().find(line)?;
        let c = sort_code_re().captures(&line[label.end()..])?;
        Some(format!("{}-{}-{}", &c[1], &c[2], &c[3]))
    });

    let statement_period = statement_period(text);

    StatementMetadata {
        account_number,
        sort_code,
        statement_period,
        bank_name: parser.bank_name().map(str::to_string),
    }
}

/// `<start> to <end>` exactly as printed, e.g. `1st Jan 2025 to 31st Jan 2025`.
pub fn statement_period(text: &str) -> Option<String> {
    period_re()
        .captures(text)
        .map(|c| collapse_ws(&format!("{} to {}", &c[1], &c[2])))
}

/// Start of the statement period, when one is printed.
pub fn period_start(text: &str) -> Option<String> {
    period_re().captures(text).map(|c| collapse_ws(&c[1]))
}
