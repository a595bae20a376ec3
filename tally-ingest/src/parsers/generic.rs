//! Fallback for statements no institution parser claims.
//!
//! The strict tier reads one transaction per line: the first recognizable
//! date and the first amount after it. Only when that finds nothing does
//! the lenient tier run, which looks for the transaction table header and
//! then reads either a label/value layout or wrapped rows with looser dates.

use std::sync::OnceLock;

use regex::Regex;
use tally_core::{Transaction, TxnType};
use tracing::debug;

use crate::dates::{MONTH_ALT, find_date, first_year};
use crate::metadata::{period_start, statement_period};
use crate::parsers::columnar;
use crate::scan::{Columns, Ledger, LineRole, Lines, Step, candidate, split_in_out};
use crate::text::{Marker, collapse_ws, money_tokens, text_before_first_amount};
use crate::types::ParseOptions;

const DEBIT_WORDS: &[&str] = &[
    "card payment",
    "payment to",
    "direct debit",
    "standing order",
    "withdrawal",
    "purchase",
    "debit",
    "charges",
    "bank fee",
];

const CREDIT_WORDS: &[&str] = &[
    "salary",
    "refund",
    "deposit",
    "interest",
    "credit",
    "received",
    "transfer from",
    "payment from",
];

const HEADER_COMPANIONS: &[&str] = &[
    "description",
    "details",
    "balance",
    "amount",
    "money in",
    "paid in",
    "transaction",
];

const CLOSING_MARKERS: &[&str] = &[
    "closing balance",
    "balance carried forward",
    "end balance",
];

fn opening_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:opening\s+balance|balance\s+brought\s+forward|start\s+balance)\b")
            .expect("generic opening balance regex")
    })
}

/// Row dates the strict grammar rejects: `12 Jan`, `12/01`, `12.01.2024`.
fn loose_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"(?i)^(?:\d{{1,2}}[./-]\d{{1,2}}[./-]\d{{2,4}}|\d{{1,2}}/\d{{1,2}}|\d{{1,2}}(?:st|nd|rd|th)?\s+(?:{m})[a-z]*\.?(?:\s+\d{{4}})?|(?:{m})[a-z]*\.?\s+\d{{1,2}}(?:,?\s+\d{{4}})?)\b",
            m = MONTH_ALT
        ))
        .expect("loose date regex")
    })
}

fn is_closing(line: &str) -> bool {
    let lower = line.to_lowercase();
    CLOSING_MARKERS.iter().any(|m| lower.contains(m))
}

/// Debit wording is checked before credit wording: "credit card payment"
/// is money out.
fn keyword_type(description: &str) -> Option<TxnType> {
    let lower = description.to_lowercase();
    if DEBIT_WORDS.iter().any(|k| lower.contains(k)) {
        Some(TxnType::Debit)
    } else if CREDIT_WORDS.iter().any(|k| lower.contains(k)) {
        Some(TxnType::Credit)
    } else {
        None
    }
}

fn is_opening(line: &str) -> bool {
    opening_re().is_match(line)
}

/// The balance is the first amount after the marker. Dates printed between
/// them, dotted ones included, are never amounts.
fn opening_balance(line: &str, text: &str, year: i32) -> Option<(String, f64)> {
    let m = opening_re().find(line)?;
    let balance = money_tokens(&line[m.end()..]).first()?.value;
    let date = find_date(line)
        .map(|(start, end)| line[start..end].to_string())
        .or_else(|| period_start(text))
        .unwrap_or_else(|| format!("01 Jan {year}"));
    Some((date, balance))
}

fn statement_year(text: &str, opts: &ParseOptions) -> i32 {
    statement_period(text)
        .as_deref()
        .and_then(first_year)
        .unwrap_or(opts.fallback_year)
}

/// One line, one transaction: first date, first amount after it, and a
/// second amount as the balance.
fn strict_line(line: &str, threshold: f64) -> Option<Transaction> {
    let (start, end) = find_date(line)?;
    let date = &line[start..end];
    let rest = &line[end..];
    let tokens = money_tokens(rest);
    let first = tokens.first()?;

    let mut description = text_before_first_amount(rest, &tokens);
    if description.is_empty() {
        description = collapse_ws(&line[..start]);
    }

    let kind = match first.marker {
        Some(Marker::Cr) => TxnType::Credit,
        Some(Marker::Dr) => TxnType::Debit,
        None if first.negative => TxnType::Debit,
        None if first.positive => TxnType::Credit,
        None => keyword_type(&description).unwrap_or(if first.value < threshold {
            TxnType::Debit
        } else {
            TxnType::Credit
        }),
    };

    candidate(date, &description, first.value, Some(kind), tokens.get(1).map(|t| t.value))
}

fn strict_tier(text: &str, opts: &ParseOptions, year: i32) -> Vec<Transaction> {
    let mut ledger = Ledger::new();
    for line in Lines::new(text).iter() {
        if let Some((date, balance)) = opening_balance(line, text, year) {
            ledger.open(date, balance);
            continue;
        }
        if is_closing(line) {
            continue;
        }
        if let Some(record) = strict_line(line, opts.debit_threshold) {
            ledger.push(record);
        }
    }
    debug!(dropped = ledger.dropped(), "generic strict tier finished");
    ledger.into_records()
}

fn is_header(line: &str) -> bool {
    let lower = line.to_lowercase();
    lower.contains("date") && HEADER_COMPANIONS.iter().any(|c| lower.contains(c))
}

fn lenient_role(line: &str) -> LineRole {
    if is_closing(line) || is_opening(line) {
        LineRole::Stop
    } else if line.to_lowercase().starts_with("page ") || is_header(line) {
        LineRole::Noise
    } else if loose_date_re().is_match(line) {
        LineRole::Anchor
    } else {
        LineRole::Continuation
    }
}

/// Give a year-less date the statement year.
fn complete_date(raw: &str, year: i32) -> String {
    let raw = collapse_ws(raw);
    if first_year(&raw).is_some() || raw.matches(['/', '.', '-']).count() >= 2 {
        raw
    } else if raw.contains('/') {
        format!("{raw}/{year}")
    } else {
        format!("{raw} {year}")
    }
}

fn inline_step(lines: &Lines, at: usize, year: i32) -> Step {
    let (buffer, next) = lines.gather(at, lenient_role);
    let Some(m) = loose_date_re().find(&buffer) else {
        return Step::skip(None, next);
    };
    let date = complete_date(m.as_str(), year);
    let body = &buffer[m.end()..];
    let tokens = money_tokens(body);
    let description = text_before_first_amount(body, &tokens);
    let values: Vec<f64> = tokens.iter().map(|t| t.value).collect();

    let record = match Columns::from_values(&values) {
        Columns::Empty | Columns::Single(_) => None,
        // No balance evidence is trusted here: wording decides, or nothing.
        Columns::AmountBalance { amount, balance } => {
            candidate(&date, &description, amount, keyword_type(&description), Some(balance))
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

fn lenient_tier(text: &str, year: i32) -> Vec<Transaction> {
    let all = Lines::new(text);
    let start = all.iter().position(is_header).map_or(0, |i| i + 1);
    let body: Vec<&str> = all.iter().skip(start).collect();

    // An opening balance printed above the table header still leads.
    let mut ledger = Ledger::new();
    if let Some((date, balance)) = all
        .iter()
        .take(start)
        .find_map(|line| opening_balance(line, text, year))
    {
        ledger.open(date, balance);
    }

    if columnar::looks_columnar(body.iter().copied()) {
        debug!(start, "generic lenient tier: label/value layout");
        for record in columnar::parse(&body) {
            ledger.push(record);
        }
        return ledger.into_records();
    }

    debug!(start, "generic lenient tier: inline rows");
    let joined = body.join("\n");
    let lines = Lines::new(&joined);
    let mut at = 0;
    while let Some(line) = lines.get(at) {
        if let Some((date, balance)) = opening_balance(line, text, year) {
            ledger.open(date, balance);
            at += 1;
            continue;
        }
        if lenient_role(line) != LineRole::Anchor {
            at += 1;
            continue;
        }
        let step = inline_step(&lines, at, year);
        if let Some(record) = step.record {
            ledger.push(record);
        }
        at = step.next.max(at + 1);
    }
    ledger.into_records()
}

fn has_movements(records: &[Transaction]) -> bool {
    records.iter().any(|t| !t.is_brought_forward())
}

pub fn parse(text: &str, opts: &ParseOptions) -> Vec<Transaction> {
    let year = statement_year(text, opts);
    let strict = strict_tier(text, opts, year);
    if has_movements(&strict) {
        return strict;
    }

    debug!("generic strict tier found no rows, trying lenient tier");
    let lenient = lenient_tier(text, year);
    if has_movements(&lenient) { lenient } else { strict }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slash_date_row_defaults_to_debit_below_threshold() {
        let txns = parse("01/12/2024 TESCO STORES 45.57 120.00", &ParseOptions::default());
        assert_eq!(txns.len(), 1);
        let t = &txns[0];
        assert_eq!(t.date, "01/12/2024");
        assert_eq!(t.description, "TESCO STORES");
        assert_eq!(t.amount, 45.57);
        assert_eq!(t.balance, Some(120.0));
        assert_eq!(t.kind, Some(TxnType::Debit));
    }

    #[test]
    fn test_strict_type_evidence_order() {
        let opts = ParseOptions::default();
        let text = "\
2024-12-02 SHOP 20.00CR 140.00
2024-12-03 REFUND DESK -5.00 135.00
2024-12-04 PAYROLL +2,000.00 2,135.00
Dec 5, 2024 CREDIT CARD PAYMENT 50.00 2,085.00
3rd Dec 2024 INTEREST 0.85 2,085.85
06 Dec 2024 MYSTERY 1,500.00 3,585.85";
        let txns = parse(text, &opts);
        let kinds: Vec<_> = txns.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                Some(TxnType::Credit),
                Some(TxnType::Debit),
                Some(TxnType::Credit),
                Some(TxnType::Debit),
                Some(TxnType::Credit),
                Some(TxnType::Credit),
            ]
        );
        assert_eq!(txns[1].amount, 5.0);
    }

    #[test]
    fn test_threshold_is_configurable() {
        let opts = ParseOptions {
            debit_threshold: 5000.0,
            ..ParseOptions::default()
        };
        let txns = parse("06/12/2024 MYSTERY 1,500.00", &opts);
        assert_eq!(txns[0].kind, Some(TxnType::Debit));
    }

    #[test]
    fn test_opening_balance_marker() {
        let text = "Opening balance 01/12/2024 500.00\n02/12/2024 BAKERY 3.20 496.80\nClosing balance 31/12/2024 496.80";
        let txns = parse(text, &ParseOptions::default());
        assert_eq!(txns.len(), 2);
        assert!(txns[0].is_brought_forward());
        assert_eq!(txns[0].date, "01/12/2024");
        assert_eq!(txns[0].balance, Some(500.0));
        assert_eq!(txns[1].description, "BAKERY");
    }

    #[test]
    fn test_opening_balance_skips_dotted_date() {
        let text = "Opening balance 01.12.2024 500.00\n02/12/2024 BAKERY 3.20 496.80";
        let txns = parse(text, &ParseOptions::default());
        assert_eq!(txns.len(), 2);
        assert!(txns[0].is_brought_forward());
        assert_eq!(txns[0].balance, Some(500.0));
        assert_eq!(txns[1].balance, Some(496.8));
        assert!(!is_opening("Closing balance 496.80"));
    }

    #[test]
    fn test_lenient_keeps_opening_balance_above_header() {
        let text = "\
Opening balance 500.00
Date Description Amount Balance
12 Mar TESCO STORES 4.50 495.50
14 Mar SALARY ACME 1,000.00 1,495.50";
        let opts = ParseOptions {
            fallback_year: 2025,
            ..ParseOptions::default()
        };
        let txns = parse(text, &opts);
        assert_eq!(txns.len(), 3);
        assert!(txns[0].is_brought_forward());
        assert_eq!(txns[0].balance, Some(500.0));
        assert_eq!(txns[0].date, "01 Jan 2025");
        assert_eq!(txns[1].description, "TESCO STORES");
        assert_eq!(txns[1].kind, None);
        assert_eq!(txns[2].kind, Some(TxnType::Credit));
    }

    #[test]
    fn test_lenient_inline_rows() {
        let text = "\
Statement 1 Mar 2024 to 31 Mar 2024
Date Description Amount Balance
12 Mar TESCO STORES
4.50 95.50
14 Mar SALARY ACME 1,000.00 1,095.50
15 Mar MYSTERY SHOP 7.00 1,088.50
16 Mar CLOSING FIGURE 1,088.50
18.03.2024 TRANSFER 0.00 10.00 1,078.50";
        let txns = parse(text, &ParseOptions::default());
        assert_eq!(txns.len(), 4);
        assert_eq!(txns[0].date, "12 Mar 2024");
        assert_eq!(txns[0].description, "TESCO STORES");
        assert_eq!(txns[0].balance, Some(95.5));
        assert_eq!(txns[1].kind, Some(TxnType::Credit));
        assert_eq!(txns[2].kind, None);
        assert_eq!(txns[3].date, "18.03.2024");
        assert_eq!(txns[3].amount, 10.0);
        assert_eq!(txns[3].kind, Some(TxnType::Debit));
    }

    #[test]
    fn test_lenient_columnar_after_header() {
        let text = "\
Transactions
Date
01/01/2024
Description
Coffee Shop
Money Out
4.50
Balance
95.50";
        let txns = parse(text, &ParseOptions::default());
        assert_eq!(txns.len(), 1);
        assert_eq!(txns[0].amount, 4.5);
        assert_eq!(txns[0].kind, Some(TxnType::Debit));
    }

    #[test]
    fn test_nothing_found_is_empty() {
        assert!(parse("Dear customer, thank you for banking with us.", &ParseOptions::default()).is_empty());
    }
}
