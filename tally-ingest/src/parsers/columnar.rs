//! Label/value layouts, where every field of a transaction sits on its own
//! line below its label:
//!
//!   Date
//!   01/01/2024
//!   Description
//!   Coffee Shop
//!   Money Out
//!   4.50
//!   Balance
//!   95.50
//!
//! A record ends at its `Balance` value, at the next `Date` label, or after
//! six fields.

use tally_core::{Transaction, TxnType};

use crate::scan::{candidate, split_in_out};
use crate::text::{collapse_ws, parse_money};

pub const MAX_FIELDS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Date,
    Description,
    Type,
    MoneyIn,
    MoneyOut,
    Balance,
}

impl Field {
    /// The field a label line names, if it is one.
    pub fn from_label(line: &str) -> Option<Field> {
        let label = line
            .trim()
            .trim_end_matches(':')
            .trim_end_matches("(£)")
            .trim_end_matches('£')
            .trim()
            .to_lowercase();
        Some(match label.as_str() {
            "date" => Field::Date,
            "description" | "details" => Field::Description,
            "type" => Field::Type,
            "money in" | "paid in" => Field::MoneyIn,
            "money out" | "paid out" => Field::MoneyOut,
            "balance" => Field::Balance,
            _ => return None,
        })
    }
}

/// True when enough distinct field labels stand alone on their own lines
/// for the text to be a label/value layout.
pub fn looks_columnar<'a>(lines: impl IntoIterator<Item = &'a str>) -> bool {
    let mut seen: Vec<Field> = Vec::new();
    for field in lines.into_iter().filter_map(Field::from_label) {
        if !seen.contains(&field) {
            seen.push(field);
        }
    }
    seen.contains(&Field::Date) && seen.len() >= 3
}

#[derive(Debug, Default)]
struct Draft {
    date: Option<String>,
    description: Option<String>,
    kind: Option<String>,
    money_in: Option<f64>,
    money_out: Option<f64>,
    balance: Option<f64>,
    fields: usize,
}

impl Draft {
    fn set(&mut self, field: Field, value: &str) {
        self.fields += 1;
        let value = value.trim();
        let text = (!value.is_empty()).then(|| collapse_ws(value));
        match field {
            Field::Date => self.date = text,
            Field::Description => self.description = text,
            Field::Type => self.kind = text,
            Field::MoneyIn => self.money_in = parse_money(value).map(f64::abs),
            Field::MoneyOut => self.money_out = parse_money(value).map(f64::abs),
            Field::Balance => self.balance = parse_money(value),
        }
    }

    fn is_blank(&self) -> bool {
        self.fields == 0
    }

    fn finish(self) -> Option<Transaction> {
        let date = self.date?;
        let (amount, kind): (f64, TxnType) =
            split_in_out(self.money_in.unwrap_or(0.0), self.money_out.unwrap_or(0.0))?;
        // The type column reads like "Card payment": use it when nothing
        // more specific was printed.
        let description = self.description.or(self.kind).unwrap_or_default();
        candidate(&date, &description, amount, Some(kind), self.balance)
    }
}

/// Label at `at`, its value, and the index after the pair. A label directly
/// followed by another label has an empty value.
fn read_pair<'a>(lines: &[&'a str], at: usize) -> Option<(Field, &'a str, usize)> {
    let field = Field::from_label(lines.get(at)?)?;
    let mut value_at = at + 1;
    while lines.get(value_at).is_some_and(|l| l.trim().is_empty()) {
        value_at += 1;
    }
    match lines.get(value_at) {
        Some(&value) if Field::from_label(value).is_none() => Some((field, value, value_at + 1)),
        _ => Some((field, "", value_at)),
    }
}

pub fn parse(lines: &[&str]) -> Vec<Transaction> {
    let mut out = Vec::new();
    let mut draft = Draft::default();

    let mut at = 0;
    while at < lines.len() {
        let Some((field, value, next)) = read_pair(lines, at) else {
            at += 1;
            continue;
        };
        if field == Field::Date && draft.date.is_some() {
            out.extend(std::mem::take(&mut draft).finish());
        }
        draft.set(field, value);
        if field == Field::Balance || draft.fields >= MAX_FIELDS {
            out.extend(std::mem::take(&mut draft).finish());
        }
        at = next;
    }
    if !draft.is_blank() {
        out.extend(draft.finish());
    }
    out
}
