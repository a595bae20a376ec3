//! Barclays current-account statements.
//!
//! Expected extracted text:
//!   Date    Description                            Money out £   Money in £   Balance £
//!   1 Feb   Start balance                                                     2,000.00
//!   3 Feb   Card Payment to Tesco Stores
//!           On 01 Feb                              12.50                      1,987.50
//!           Direct Debit to British Gas
//!           Ref: 123456789                         45.00                      1,942.50
//!
//! Same-day rows carry no date of their own; they begin with one of a small
//! set of lead phrases.

use std::sync::OnceLock;

use regex::Regex;
use tally_core::{Transaction, TxnType};
use tracing::debug;

use crate::dates::{MONTH_ALT, day_month_year, first_year};
use crate::metadata::{period_start, statement_period};
use crate::scan::{
    Columns, Ledger, LineRole, Lines, Step, balance_direction, candidate, keyword_direction,
    split_in_out,
};
use crate::text::{collapse_ws, money_tokens, parse_money, text_before_first_amount};
use crate::types::ParseOptions;

const LEAD_PHRASES: &[&str] = &[
    "card payment to",
    "direct debit to",
    "received from",
    "bill payment to",
    "bill payment from",
    "transfer from",
    "transfer to",
    "cash machine withdrawal",
    "standing order to",
    "direct credit from",
    "refund from",
    "interest paid",
    "cheque",
];

const CREDIT_WORDS: &[&str] = &[
    "received from",
    "transfer from",
    "bill payment from",
    "direct credit",
    "refund",
    "interest paid",
    "salary",
    "giro credit",
];

const NOISE_CONTAINS: &[&str] = &[
    "barclays bank uk plc",
    "barclays.co.uk",
    "financial conduct authority",
    "prudential regulation authority",
    "financial services compensation scheme",
    "registered in england",
];

const NOISE_PREFIXES: &[&str] = &[
    "date description",
    "money out",
    "your statement",
    "sort code",
    "account no",
    "page ",
    "continued",
    "at a glance",
    "anything wrong",
    "swiftbic",
    "iban",
];

const STOP_PREFIXES: &[&str] = &[
    "end balance",
    "start balance",
    "balance carried forward",
    "balance brought forward",
    "total payments",
];

fn row_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"(?i)^(\d{{1,2}})\s+((?:{MONTH_ALT})[a-z]*)\.?(?:\s+|$)"))
            .expect("barclays row regex")
    })
}

fn opening_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)start\s+balance\s+£?((?:\d{1,3}(?:,\d{3})+|\d+)\.\d{2})")
            .expect("barclays opening balance regex")
    })
}

/// `On 01 Feb` card dates and `Ref: ...` tokens.
fn noise_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"(?i)\bon\s+\d{{1,2}}\s+(?:{MONTH_ALT})[a-z]*\b|\bref:\s*\S+"
        ))
        .expect("barclays noise code regex")
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
    } else if row_re().is_match(line) || LEAD_PHRASES.iter().any(|p| lower.starts_with(p)) {
        LineRole::Anchor
    } else {
        LineRole::Continuation
    }
}

fn statement_year(text: &str) -> Option<i32> {
    statement_period(text).as_deref().and_then(first_year)
}

fn opening_balance(line: &str, text: &str, year: i32) -> Option<(String, f64)> {
    let c = opening_re().captures(line)?;
    let balance = parse_money(&c[1])?;
    let date = row_re()
        .captures(line)
        .and_then(|r| day_month_year(&r[1], &r[2], year))
        .or_else(|| {
            let start = period_start(text)?;
            let mut parts = start.split_whitespace();
            day_month_year(parts.next()?, parts.next()?, year)
        })
        .unwrap_or_else(|| format!("01 Jan {year}"));
    Some((date, balance))
}

fn step(lines: &Lines, at: usize, year: i32, carried: Option<&str>, previous: Option<f64>) -> Step {
    let (buffer, next) = lines.gather(at, role);

    let (date, body) = match row_re().captures(&buffer) {
        Some(c) => {
            let Some(date) = day_month_year(&c[1], &c[2], year) else {
                return Step::skip(None, next);
            };
            let end = c.get(0).map_or(0, |m| m.end());
            (date, &buffer[end..])
        }
        None => match carried {
            Some(date) => (date.to_string(), buffer.as_str()),
            None => return Step::skip(None, next),
        },
    };

    let body = noise_code_re().replace_all(body, " ");
    let tokens = money_tokens(&body);
    let description = collapse_ws(&text_before_first_amount(&body, &tokens));
    let values: Vec<f64> = tokens.iter().map(|t| t.value).collect();

    let record = match Columns::from_values(&values) {
        Columns::Empty | Columns::Single(_) => None,
        Columns::AmountBalance { amount, balance } => {
            let kind = balance_direction(previous, amount, Some(balance))
                .or_else(|| keyword_direction(&description, CREDIT_WORDS, &[]))
                .unwrap_or(TxnType::Debit);
            candidate(&date, &description, amount, Some(kind), Some(balance))
        }
        // Money out is printed before money in.
        Columns::InOutBalance {
            money_in: out,
            money_out: paid_in,
            balance,
        } => split_in_out(paid_in, out)
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
    let mut carried: Option<String> = None;

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
        let step = step(&lines, at, year, carried.as_deref(), ledger.last_balance());
        if step.date.is_some() {
            carried = step.date;
        }
        if let Some(record) = step.record {
            ledger.push(record);
        }
        at = step.next.max(at + 1);
    }

    debug!(year, dropped = ledger.dropped(), "barclays scan finished");
    ledger.into_records()
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATEMENT: &str = r#"
Barclays Bank UK PLC
Your statement
Sort Code 20-00-00 Account No 12345678
1 Feb - 28 Feb 2025
Date Description Money out £ Money in £ Balance £
1 Feb Start balance 2,000.00
3 Feb Card Payment to Tesco Stores
On 01 Feb 12.50 1,987.50
Direct Debit to British Gas
Ref: 123456789 45.00 1,942.50
5 Feb Received From Acme Ltd 1,500.00 3,442.50
Bill Payment to J Smith 100.00 3,342.50
End balance 3,342.50
"#;

    #[test]
    fn test_start_balance_is_opening_record() {
        let txns = parse(STATEMENT, &ParseOptions::default());
        assert!(txns[0].is_brought_forward());
        assert_eq!(txns[0].date, "01 Feb 2025");
        assert_eq!(txns[0].balance, Some(2000.0));
    }

    #[test]
    fn test_lead_phrases_inherit_carried_date() {
        let txns = parse(STATEMENT, &ParseOptions::default());
        assert_eq!(txns.len(), 5);

        assert_eq!(txns[1].date, "03 Feb 2025");
        assert_eq!(txns[1].description, "Card Payment to Tesco Stores");
        assert_eq!(txns[1].kind, Some(TxnType::Debit));

        assert_eq!(txns[2].date, "03 Feb 2025");
        assert_eq!(txns[2].description, "Direct Debit to British Gas");
        assert_eq!(txns[2].balance, Some(1942.5));

        assert_eq!(txns[3].date, "05 Feb 2025");
        assert_eq!(txns[3].kind, Some(TxnType::Credit));

        assert_eq!(txns[4].date, "05 Feb 2025");
        assert_eq!(txns[4].description, "Bill Payment to J Smith");
        assert_eq!(txns[4].kind, Some(TxnType::Debit));
    }

    #[test]
    fn test_lead_phrase_before_any_date_is_ignored() {
        let text = "Barclays Bank UK PLC\nCard Payment to Nowhere 1.00 2.00";
        assert!(parse(text, &ParseOptions::default()).is_empty());
    }
}
