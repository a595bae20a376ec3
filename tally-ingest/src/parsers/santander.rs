//! Santander UK current-account statements.
//!
//! Expected extracted text:
//!   Your account summary for 1st Jan 2025 to 31st Jan 2025
//!   Date     Description                                       Money in  Money out   Balance
//!   1st Jan  Balance brought forward                                                1,000.00
//!   3rd Jan  CARD PAYMENT TO TESCO STORES, 12.50 GBP, RATE 1.00/GBP ON 01-01-2025
//!                                                                          12.50     987.50
//!
//! Card rows embed the original currency amount, the exchange rate and the
//! card date in the description. Those fragments are removed before amounts
//! are counted.

use std::sync::OnceLock;

use regex::Regex;
use tally_core::{Transaction, TxnType};
use tracing::debug;

use crate::dates::{MONTH_ALT, day_month_year, first_year};
use crate::metadata::period_start;
use crate::scan::{
    Columns, Ledger, LineRole, Lines, Step, balance_direction, candidate, keyword_direction,
    split_in_out,
};
use crate::text::{collapse_ws, money_tokens, parse_money, text_before_first_amount};
use crate::types::ParseOptions;

const CREDIT_WORDS: &[&str] = &[
    "receipt",
    "bank giro credit",
    "credit from",
    "interest paid",
    "transfer from",
    "refund",
    "deposit",
];

const NOISE_CONTAINS: &[&str] = &[
    "santander uk plc",
    "santander.co.uk",
    "registered office",
    "authorised by the prudential regulation authority",
    "financial conduct authority",
    "financial services compensation scheme",
];

const NOISE_PREFIXES: &[&str] = &[
    "date description",
    "money in money out",
    "page ",
    "account name",
    "account number",
    "sort code",
    "your account summary",
    "statement number",
    "continued",
    "average balance",
    "interest rate",
    "aer",
    "arranged overdraft",
];

const STOP_PREFIXES: &[&str] = &[
    "balance carried forward",
    "balance brought forward",
    "total money in",
    "total money out",
    "closing balance",
];

fn row_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"(?i)^(\d{{1,2}})(st|nd|rd|th)\s+((?:{MONTH_ALT})[a-z]*)\.?(?:\s+|$)"
        ))
        .expect("santander row regex")
    })
}

fn summary_year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)your\s+account\s+summary\s+for\s+[^\n]*").expect("santander summary regex")
    })
}

fn opening_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)balance\s+brought\s+forward\s+£?((?:\d{1,3}(?:,\d{3})+|\d+)\.\d{2})")
            .expect("santander opening balance regex")
    })
}

/// Foreign-currency amount, exchange rate and card-date fragments.
fn fx_fragment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r",?\s*\b(?:\d{1,3}(?:,\d{3})+|\d+)\.\d{2}\s+(?:GBP|USD|EUR|CHF|JPY|AUD|CAD|SEK|NOK|DKK|PLN|CZK|HUF|TRY|AED|INR|CNY|HKD|SGD|NZD|ZAR|MXN|THB)\b",
            r"|,?\s*\bRATE\s+\d+(?:\.\d+)?/[A-Z]{3}\b",
            r"|,?\s*\bON\s+\d{2}-\d{2}-\d{4}\b",
        ))
        .expect("santander fx regex")
    })
}

fn noise_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i),?\s*\bmandate\s+no\.?\s*\d+|,?\s*\bref\.?:?\s*[A-Z0-9/-]*\d[A-Z0-9/-]*")
            .expect("santander noise code regex")
    })
}

fn role(line: &str) -> LineRole {
    let lower = line.to_lowercase();
    if STOP_PREFIXES.iter().any(|p| lower.starts_with(p)) {
        LineRole::Stop
    } else if NOISE_CONTAINS.iter().any(|p| lower.contains(p))
        || NOISE_PREFIXES.iter().any(|p| lower.starts_with(p))
    {
        LineRole::Noise
    } else if row_re().is_match(line) {
        LineRole::Anchor
    } else {
        LineRole::Continuation
    }
}

fn statement_year(text: &str) -> Option<i32> {
    first_year(summary_year_re().find(text)?.as_str())
}

/// `3rd Jan` plus a year, keeping the printed ordinal: `3rd Jan 2025`.
fn ordinal_date(day: &str, suffix: &str, month: &str, year: i32) -> Option<String> {
    let normalized = day_month_year(day, month, year)?;
    let (_, month_year) = normalized.split_once(' ')?;
    let day: u32 = day.parse().ok()?;
    Some(format!("{day}{} {month_year}", suffix.to_lowercase()))
}

fn opening_balance(line: &str, text: &str, year: i32) -> Option<(String, f64)> {
    let c = opening_re().captures(line)?;
    let balance = parse_money(&c[1])?;
    let date = period_start(text)
        .map(|start| match first_year(&start) {
            Some(_) => start,
            None => format!("{start} {year}"),
        })
        .or_else(|| {
            let r = row_re().captures(line)?;
            ordinal_date(&r[1], &r[2], &r[3], year)
        })
        .unwrap_or_else(|| format!("1st Jan {year}"));
    Some((date, balance))
}

fn clean_description(raw: &str) -> String {
    let cleaned = noise_code_re().replace_all(raw, "");
    collapse_ws(&cleaned).trim_end_matches([',', ' ']).to_string()
}

fn direction(description: &str, previous: Option<f64>, amount: f64, balance: f64) -> TxnType {
    balance_direction(previous, amount, Some(balance))
        .or_else(|| keyword_direction(description, CREDIT_WORDS, &[]))
        .unwrap_or(TxnType::Debit)
}

fn step(lines: &Lines, at: usize, year: i32, previous: Option<f64>) -> Step {
    let (buffer, next) = lines.gather(at, role);
    let Some(c) = row_re().captures(&buffer) else {
        return Step::skip(None, next);
    };
    let Some(date) = ordinal_date(&c[1], &c[2], &c[3], year) else {
        return Step::skip(None, next);
    };
    let raw = &buffer[c.get(0).map_or(0, |m| m.end())..];

    let stripped = fx_fragment_re().replace_all(raw, " ");
    let tokens = money_tokens(&stripped);
    let description = clean_description(&text_before_first_amount(&stripped, &tokens));
    let values: Vec<f64> = tokens.iter().map(|t| t.value).collect();

    let record = match Columns::from_values(&values) {
        Columns::Empty => None,
        // Stripping took the amount with it: recover from the raw text.
        Columns::Single(_) => {
            let raw_values: Vec<f64> = money_tokens(raw).iter().map(|t| t.value).collect();
            match raw_values.as_slice() {
                [.., amount, balance] => {
                    let kind = direction(&description, previous, *amount, *balance);
                    candidate(&date, &description, *amount, Some(kind), Some(*balance))
                }
                _ => None,
            }
        }
        Columns::AmountBalance { amount, balance } => {
            let kind = direction(&description, previous, amount, balance);
            candidate(&date, &description, amount, Some(kind), Some(balance))
        }
        Columns::InOutBalance {
            money_in,
            money_out,
            balance,
        } => split_in_out(money_in, money_out)
            .and_then(|(amount, kind)| candidate(&date, &description, amount, Some(kind), Some(balance))),
    };

    Step {
        record,
        date: Some(date),
        next,
    }
}

pub fn parse(text: &str, opts: &ParseOptions) -> Vec<Transaction> {
    let year = statement_year(text).unwrap_or(opts.fallback_year);
    let lines = Lines::new(text);
    let mut ledger = Ledger::new();

    let mut at = 0;
    while let Some(line) = lines.get(at) {
        if let Some((date, balance)) = opening_balance(line, text, year) {
            ledger.open(date, balance);
            at += 1;
            continue;
        }
        if role(line) != LineRole::Anchor {
            at += 1;
            continue;
        }
        let step = step(&lines, at, year, ledger.last_balance());
        if let Some(record) = step.record {
            ledger.push(record);
        }
        at = step.next.max(at + 1);
    }

    debug!(year, dropped = ledger.dropped(), "santander scan finished");
    ledger.into_records()
}
