//! Spreadsheet exports: one transaction per row, columns found by name.

use std::collections::HashMap;

use tally_core::{Result, Transaction, TxnType};
use tracing::debug;

use crate::scan::split_in_out;
use crate::text::parse_money;

/// Header name → cell value.
pub type Row = HashMap<String, String>;

const DATE_COLUMNS: &[&str] = &[
    "Date",
    "Transaction Date",
    "Posting Date",
    "Posted Date",
    "Value Date",
    "Booking Date",
];
const DESCRIPTION_COLUMNS: &[&str] = &[
    "Description",
    "Details",
    "Transaction Description",
    "Narrative",
    "Payee",
    "Merchant",
    "Memo",
    "Reference",
];
const AMOUNT_COLUMNS: &[&str] = &["Amount", "Transaction Amount", "Value", "Amount (GBP)"];
const DEBIT_COLUMNS: &[&str] = &[
    "Debit",
    "Debit Amount",
    "Money Out",
    "Paid Out",
    "Withdrawals",
    "Out",
];
const CREDIT_COLUMNS: &[&str] = &[
    "Credit",
    "Credit Amount",
    "Money In",
    "Paid In",
    "Deposits",
    "In",
];
const BALANCE_COLUMNS: &[&str] = &["Balance", "Running Balance", "Account Balance"];
const TYPE_COLUMNS: &[&str] = &["Type", "Transaction Type", "Debit/Credit", "CR/DR"];

/// First synonym present in `row`, exact header match before a trimmed
/// case-insensitive one.
fn lookup<'a>(row: &'a Row, names: &[&str]) -> Option<&'a str> {
    names
        .iter()
        .find_map(|name| row.get(*name))
        .or_else(|| {
            names.iter().find_map(|name| {
                row.iter()
                    .find(|(header, _)| header.trim().eq_ignore_ascii_case(name))
                    .map(|(_, value)| value)
            })
        })
        .map(|v| v.trim())
}

fn positive_money(row: &Row, names: &[&str]) -> f64 {
    lookup(row, names)
        .and_then(parse_money)
        .map(f64::abs)
        .unwrap_or(0.0)
}

fn type_column(raw: &str) -> Option<TxnType> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "dr" | "debit" | "d" => Some(TxnType::Debit),
        "cr" | "credit" | "c" => Some(TxnType::Credit),
        _ => None,
    }
}

pub fn parse_row(row: &Row) -> Option<Transaction> {
    let date = lookup(row, DATE_COLUMNS).filter(|d| !d.is_empty())?;
    let description = lookup(row, DESCRIPTION_COLUMNS).unwrap_or_default();

    let debit = positive_money(row, DEBIT_COLUMNS);
    let credit = positive_money(row, CREDIT_COLUMNS);
    let (amount, kind) = match split_in_out(credit, debit) {
        Some(split) => split,
        None => {
            let signed = lookup(row, AMOUNT_COLUMNS).and_then(parse_money)?;
            if signed == 0.0 {
                return None;
            }
            let kind = lookup(row, TYPE_COLUMNS)
                .and_then(type_column)
                .unwrap_or(if signed < 0.0 { TxnType::Debit } else { TxnType::Credit });
            (signed.abs(), kind)
        }
    };

    let balance = lookup(row, BALANCE_COLUMNS).and_then(parse_money);
    Some(Transaction::new(date, description, amount, Some(kind)).with_balance(balance))
}

/// Rows in file order. Rows without a date or a usable amount are dropped.
pub fn parse_rows(rows: &[Row]) -> Vec<Transaction> {
    let out: Vec<Transaction> = rows.iter().filter_map(parse_row).collect();
    debug!(rows = rows.len(), parsed = out.len(), "csv rows parsed");
    out
}

fn is_header(record: &csv::StringRecord) -> bool {
    let filled = record.iter().filter(|f| !f.trim().is_empty()).count();
    filled >= 2
        && record.iter().any(|field| {
            let field = field.trim().trim_start_matches('\u{feff}');
            DATE_COLUMNS.iter().any(|d| field.eq_ignore_ascii_case(d))
        })
}

/// Decode a CSV export into rows. Lines before the header row (account
/// name, export date and similar preamble) are skipped.
pub fn read_rows(bytes: &[u8]) -> Result<Vec<Row>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let mut headers: Option<Vec<String>> = None;
    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        if headers.is_none() {
            if is_header(&record) {
                headers = Some(
                    record
                        .iter()
                        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
                        .collect(),
                );
            }
            continue;
        }
        let Some(names) = &headers else { continue };
        if record.iter().all(|f| f.is_empty()) {
            continue;
        }
        let row: Row = names
            .iter()
            .zip(record.iter())
            .map(|(name, value)| (name.clone(), value.to_string()))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}
