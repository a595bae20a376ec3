//! Nationwide Building Society current-account statements.
//!
//! Expected extracted text:
//!   Date    Description                                  £Out       £In    £Balance
//!           Balance from statement 47 dated 05/02/2025                      313.41
//!   06 Feb  Contactless payment TESCO STORES             12.50              300.91
//!           Transfer to SAVINGS                          100.00             200.91
//!
//! Rows print `DD Mon` only; the year comes from the `Statement date` header.
//! Several rows on one day print the date once, so a line opening with a
//! known transaction lead phrase starts a row on the carried date.

use std::sync::OnceLock;

use regex::Regex;
use tally_core::{Transaction, TxnType};
use tracing::debug;

use crate::dates::{MONTH_ALT, day_month_year, slash_to_day_month_year};
use crate::scan::{
    Columns, Ledger, LineRole, Lines, Step, balance_direction, candidate, keyword_direction,
    split_in_out,
};
use crate::text::{collapse_ws, money_tokens, parse_money, text_before_first_amount};
use crate::types::ParseOptions;

const LEAD_PHRASES: &[&str] = &[
    "contactless payment",
    "visa purchase",
    "visa credit",
    "direct debit",
    "standing order",
    "transfer to",
    "transfer from",
    "bank credit",
    "payment to",
    "payment from",
    "cash withdrawal",
    "cash credit",
    "interest credited",
    "interest earned",
    "faster payment",
    "refund",
    "cheque",
];

const CREDIT_WORDS: &[&str] = &[
    "bank credit",
    "transfer from",
    "interest credited",
    "interest earned",
    "refund",
    "payment from",
    "salary",
    "deposit",
    "cash credit",
    "visa credit",
];

const NOISE_CONTAINS: &[&str] = &[
    "nationwide building society",
    "nationwide.co.uk",
    "prudential regulation authority",
    "financial conduct authority",
    "financial services compensation scheme",
    "registered office",
    "firm reference number",
];

const NOISE_PREFIXES: &[&str] = &[
    "date description",
    "£out",
    "statement no",
    "statement date",
    "sort code",
    "account number",
    "flexaccount",
    "page ",
    "continued",
    "aer ",
    "gross rate",
    "interest rate",
    "arranged overdraft",
    "average balance",
];

const STOP_PREFIXES: &[&str] = &[
    "balance carried forward",
    "balance brought forward",
    "balance from statement",
    "closing balance",
    "total",
];

fn row_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"(?i)^(\d{{1,2}})\s+((?:{MONTH_ALT})[a-z]*)\.?(?:\s+|$)"))
            .expect("nationwide row regex")
    })
}

fn statement_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)statement\s+date:?\s*\d{1,2}\s+[a-z]{3,9}\s+(\d{4})")
            .expect("nationwide statement date regex")
    })
}

fn opening_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)balance\s+from\s+statement\s+\d+\s+dated\s+(\d{1,2}/\d{1,2}/\d{4})\s+£?((?:\d{1,3}(?:,\d{3})+|\d+)\.\d{2})",
        )
        .expect("nationwide opening balance regex")
    })
}

fn noise_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\bmandate\s+no\.?\s*\d+|\bref:\s*\S+|\bref\s+\d\S*").expect("nationwide noise code regex")
    })
}

fn country_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\s+(?:GB|GBR|UK|IE|IRL|LU|LUX|FR|FRA|DE|DEU|ES|ESP|NL|NLD|US|USA)$")
            .expect("nationwide country code regex")
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
    statement_date_re().captures(text)?[1].parse().ok()
}

fn opening_balance(line: &str) -> Option<(String, f64)> {
    let c = opening_re().captures(line)?;
    Some((slash_to_day_month_year(&c[1])?, parse_money(&c[2])?))
}

fn clean_description(raw: &str) -> String {
    let cleaned = collapse_ws(raw);
    country_code_re().replace(&cleaned, "").into_owned()
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
    let description = clean_description(&text_before_first_amount(&body, &tokens));
    let values: Vec<f64> = tokens.iter().map(|t| t.value).collect();

    let record = match Columns::from_values(&values) {
        // A lone figure on these statements is a balance line.
        Columns::Empty | Columns::Single(_) => None,
        Columns::AmountBalance { amount, balance } => {
            let kind = balance_direction(previous, amount, Some(balance))
                .or_else(|| keyword_direction(&description, CREDIT_WORDS, &[]))
                .unwrap_or(TxnType::Debit);
            candidate(&date, &description, amount, Some(kind), Some(balance))
        }
        // £Out is printed before £In.
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
        if let Some((date, balance)) = opening_balance(line) {
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

    debug!(year, dropped = ledger.dropped(), "nationwide scan finished");
    ledger.into_records()
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATEMENT: &str = r#"
Nationwide Building Society
FlexAccount
Sort code 07-01-16 Account number 12345678
Statement date: 05 Mar 2025
Date Description £Out £In £Balance
Balance from statement 47 dated 05/02/2025 313.41
06 Feb Contactless payment TESCO STORES 12.50 300.91
07 Feb Bank credit ACME LTD 1,500.00 1,800.91
10 Feb Direct debit
BRITISH GAS Mandate no 0045 45.00 1,755.91
Page 1 of 2
Nationwide Building Society is authorised by the Prudential Regulation Authority
Date Description £Out £In £Balance
Balance brought forward 1,755.91
Transfer to SAVINGS 100.00 1,655.91
14 Feb Visa purchase AMAZON MARKETPLACE LU 20.00 1,635.91
Balance carried forward 1,635.91
"#;

    #[test]
    fn test_opening_balance_first_and_only_once() {
        let txns = parse(STATEMENT, &ParseOptions::default());
        let opening: Vec<_> = txns.iter().filter(|t| t.is_brought_forward()).collect();
        assert_eq!(opening.len(), 1);
        assert!(txns[0].is_brought_forward());
        assert_eq!(txns[0].date, "05 Feb 2025");
        assert_eq!(txns[0].amount, 0.0);
        assert_eq!(txns[0].balance, Some(313.41));
    }

    #[test]
    fn test_rows_directions_and_wrapped_descriptions() {
        let txns = parse(STATEMENT, &ParseOptions::default());
        assert_eq!(txns.len(), 6);

        assert_eq!(txns[1].date, "06 Feb 2025");
        assert_eq!(txns[1].description, "Contactless payment TESCO STORES");
        assert_eq!(txns[1].kind, Some(TxnType::Debit));

        assert_eq!(txns[2].amount, 1500.0);
        assert_eq!(txns[2].kind, Some(TxnType::Credit));

        assert_eq!(txns[3].description, "Direct debit BRITISH GAS");
        assert_eq!(txns[3].balance, Some(1755.91));

        // Undated row after a page break keeps the carried date.
        assert_eq!(txns[4].date, "10 Feb 2025");
        assert_eq!(txns[4].description, "Transfer to SAVINGS");
        assert_eq!(txns[4].kind, Some(TxnType::Debit));

        assert_eq!(txns[5].description, "Visa purchase AMAZON MARKETPLACE");
    }

    #[test]
    fn test_fallback_year_without_header() {
        let text = "Nationwide Building Society\n06 Feb Refund ACME 5.00 105.00";
        let opts = ParseOptions {
            fallback_year: 2023,
            ..ParseOptions::default()
        };
        let txns = parse(text, &opts);
        assert_eq!(txns.len(), 1);
        assert_eq!(txns[0].date, "06 Feb 2023");
        assert_eq!(txns[0].kind, Some(TxnType::Credit));
    }

    #[test]
    fn test_balance_only_line_is_skipped() {
        let text = "Statement date: 05 Mar 2025\n06 Feb Closing figures 300.91";
        assert!(parse(text, &ParseOptions::default()).is_empty());
    }
}
