//! HSBC UK current-account statements.
//!
//! Expected extracted text:
//!   Date       Payment type and details          Paid out    Paid in    Balance
//!   01 Jan 24  BALANCE BROUGHT FORWARD                                  1,000.00
//!   02 Jan 24  VIS TESCO STORES 3297
//!              LONDON                               12.50
//!              CR  ACME LTD SALARY                             1,500.00  2,487.50
//!
//! The date is printed once per day and the balance once per day, so rows
//! are opened by their payment-type code and a lone figure is the amount.

use std::sync::OnceLock;

use regex::Regex;
use tally_core::{Transaction, TxnType};
use tracing::debug;

use crate::dates::{MONTH_ALT, day_month_year};
use crate::metadata::period_start;
use crate::scan::{
    Columns, Ledger, LineRole, Lines, Step, balance_direction, candidate, keyword_direction,
    split_in_out,
};
use crate::text::{collapse_ws, money_tokens, parse_money, text_before_first_amount};
use crate::types::ParseOptions;

const CREDIT_WORDS: &[&str] = &["salary", "refund", "interest", "transfer from", "received"];

const NOISE_CONTAINS: &[&str] = &[
    "hsbc uk bank plc",
    "hsbc.co.uk",
    "prudential regulation authority",
    "financial conduct authority",
    "financial services compensation scheme",
    "registered in england",
];

const NOISE_PREFIXES: &[&str] = &[
    "date payment type",
    "your statement",
    "account summary",
    "opening balance",
    "payments in",
    "payments out",
    "sortcode",
    "sort code",
    "account name",
    "account number",
    "international bank account",
    "branch identifier",
    "page ",
    "continued",
    "arranged overdraft",
    "credit interest",
    "aer",
    "ear ",
];

const STOP_PREFIXES: &[&str] = &[
    "balance carried forward",
    "balance brought forward",
    "closing balance",
];

/// Payment-type code at the start of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Code {
    DirectDebit,
    Visa,
    Credit,
    BillPayment,
    StandingOrder,
    CashMachine,
    Transfer,
    Debit,
    Cheque,
    OnlineBillPayment,
    Contactless,
}

impl Code {
    fn parse(raw: &str) -> Option<Code> {
        Some(match raw {
            "DD" => Code::DirectDebit,
            "VIS" => Code::Visa,
            "CR" => Code::Credit,
            "BP" => Code::BillPayment,
            "SO" => Code::StandingOrder,
            "ATM" => Code::CashMachine,
            "TFR" => Code::Transfer,
            "DR" => Code::Debit,
            "CHQ" => Code::Cheque,
            "OBP" => Code::OnlineBillPayment,
            ")))" => Code::Contactless,
            _ => return None,
        })
    }

    /// `CR` is always money in and card/debit codes are always money out.
    /// Payments and transfers go either way.
    fn fixed_direction(&self) -> Option<TxnType> {
        match self {
            Code::Credit => Some(TxnType::Credit),
            Code::BillPayment | Code::Transfer | Code::OnlineBillPayment => None,
            _ => Some(TxnType::Debit),
        }
    }
}

fn row_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"(?i)^(\d{{1,2}})\s+((?:{MONTH_ALT})[a-z]*)\s+(\d{{4}}|\d{{2}})(?:\s+|$)"
        ))
        .expect("hsbc row regex")
    })
}

fn code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(DD|VIS|CR|BP|SO|ATM|TFR|DR|CHQ|OBP|\)\)\))(?:\s+|$)").expect("hsbc code regex")
    })
}

fn opening_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)balance\s+brought\s+forward\s+£?((?:\d{1,3}(?:,\d{3})+|\d+)\.\d{2})")
            .expect("hsbc opening balance regex")
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
    } else if row_re().is_match(line) || code_re().is_match(line) {
        LineRole::Anchor
    } else {
        LineRole::Continuation
    }
}

fn row_date(day: &str, month: &str, year: &str) -> Option<String> {
    let year: i32 = year.parse().ok()?;
    let year = if year < 100 { 2000 + year } else { year };
    day_month_year(day, month, year)
}

fn opening_balance(line: &str, text: &str, fallback_year: i32) -> Option<(String, f64)> {
    let c = opening_re().captures(line)?;
    let balance = parse_money(&c[1])?;
    let date = row_re()
        .captures(line)
        .and_then(|r| row_date(&r[1], &r[2], &r[3]))
        .or_else(|| period_start(text))
        .unwrap_or_else(|| format!("01 Jan {fallback_year}"));
    Some((date, balance))
}

/// `running` is the balance implied by every record so far, so payments
/// and transfers can be told apart even on days with a single printed
/// balance.
fn step(lines: &Lines, at: usize, carried: Option<&str>, running: Option<f64>) -> Step {
    let (buffer, next) = lines.gather(at, role);

    let (date, rest) = match row_re().captures(&buffer) {
        Some(c) => {
            let Some(date) = row_date(&c[1], &c[2], &c[3]) else {
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

    let (code, body) = match code_re().captures(rest) {
        Some(c) => (Code::parse(&c[1]), &rest[c.get(0).map_or(0, |m| m.end())..]),
        None => (None, rest),
    };

    let tokens = money_tokens(body);
    let description = collapse_ws(&text_before_first_amount(body, &tokens));
    let values: Vec<f64> = tokens.iter().map(|t| t.value).collect();

    let (amount, balance, printed) = match Columns::from_values(&values) {
        Columns::Empty => return Step::skip(Some(date), next),
        Columns::Single(amount) => (amount, None, None),
        Columns::AmountBalance { amount, balance } => (amount, Some(balance), None),
        // Paid out is printed before paid in.
        Columns::InOutBalance {
            money_in: paid_out,
            money_out: paid_in,
            balance,
        } => match split_in_out(paid_in, paid_out) {
            Some((amount, kind)) => (amount, Some(balance), Some(kind)),
            None => return Step::skip(Some(date), next),
        },
    };

    let kind = printed
        .or_else(|| code.and_then(|c| c.fixed_direction()))
        .or_else(|| balance_direction(running, amount, balance))
        .or_else(|| keyword_direction(&description, CREDIT_WORDS, &[]))
        .unwrap_or(TxnType::Debit);

    Step {
        record: candidate(&date, &description, amount, Some(kind), balance),
        date: Some(date),
        next,
    }
}

pub fn parse(text: &str, opts: &ParseOptions) -> Vec<Transaction> {
    let lines = Lines::new(text);
    let mut ledger = Ledger::new();
    let mut carried: Option<String> = None;
    let mut running: Option<f64> = None;

    let mut at = 0;
    while let Some(line) = lines.get(at) {
        if let Some((date, balance)) = opening_balance(line, text, opts.fallback_year) {
            ledger.open(date, balance);
            running = Some(balance);
            at += 1;
            continue;
        }
        if role(line) != LineRole::Anchor {
            at += 1;
            continue;
        }
        let step = step(&lines, at, carried.as_deref(), running);
        if step.date.is_some() {
            carried = step.date;
        }
        if let Some(record) = step.record {
            running = match record.balance {
                Some(balance) => Some(balance),
                None => running.map(|r| r + record.signed_amount()),
            };
            ledger.push(record);
        }
        at = step.next.max(at + 1);
    }

    debug!(dropped = ledger.dropped(), "hsbc scan finished");
    ledger.into_records()
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATEMENT: &str = r#"
HSBC UK Bank plc
Your Statement
01 January to 31 January 2024
Account Summary
Opening Balance 1,000.00
Date Payment type and details Paid out Paid in Balance
01 Jan 24 BALANCE BROUGHT FORWARD 1,000.00
02 Jan 24 VIS TESCO STORES 3297
LONDON 12.50
DD BRITISH GAS 45.00
CR ACME LTD SALARY 1,500.00 2,442.50
05 Jan 24 ))) COSTA COFFEE 3.20
SO LANDLORD RENT 800.00 1,639.30
BP J SMITH RENT SHARE 200.00 1,839.30
BALANCE CARRIED FORWARD 1,839.30
"#;

    #[test]
    fn test_opening_balance_uses_row_date() {
        let txns = parse(STATEMENT, &ParseOptions::default());
        assert!(txns[0].is_brought_forward());
        assert_eq!(txns[0].date, "01 Jan 2024");
        assert_eq!(txns[0].balance, Some(1000.0));
    }

    #[test]
    fn test_codes_open_rows_on_carried_date() {
        let txns = parse(STATEMENT, &ParseOptions::default());
        assert_eq!(txns.len(), 7);

        assert_eq!(txns[1].date, "02 Jan 2024");
        assert_eq!(txns[1].description, "TESCO STORES 3297 LONDON");
        assert_eq!(txns[1].amount, 12.5);
        assert_eq!(txns[1].balance, None);
        assert_eq!(txns[1].kind, Some(TxnType::Debit));

        assert_eq!(txns[2].date, "02 Jan 2024");
        assert_eq!(txns[2].description, "BRITISH GAS");

        assert_eq!(txns[3].kind, Some(TxnType::Credit));
        assert_eq!(txns[3].balance, Some(2442.5));

        assert_eq!(txns[4].date, "05 Jan 2024");
        assert_eq!(txns[4].description, "COSTA COFFEE");
        assert_eq!(txns[5].date, "05 Jan 2024");
    }

    #[test]
    fn test_bill_payment_direction_from_running_balance() {
        let txns = parse(STATEMENT, &ParseOptions::default());
        assert_eq!(txns[6].description, "J SMITH RENT SHARE");
        assert_eq!(txns[6].kind, Some(TxnType::Credit));
    }
}
