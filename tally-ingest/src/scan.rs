//! Line scanning shared by the statement parsers.
//!
//! A statement is an immutable list of trimmed lines walked by an index.
//! Each extraction step takes the index of an anchor line and returns the
//! record it found (if any) together with the index to resume from, so no
//! step ever mutates a loop counter it does not own.

use tally_core::{Transaction, TxnType};

use crate::text::same_money;

/// What a line means to the parser currently scanning it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineRole {
    /// Starts a new transaction.
    Anchor,
    /// Boilerplate (headers, footers, legal text); skipped wherever it appears.
    Noise,
    /// Ends the transaction being gathered without starting a new one
    /// (carried-forward lines, section ends).
    Stop,
    /// Belongs to the transaction being gathered.
    Continuation,
}

pub struct Lines<'a> {
    lines: Vec<&'a str>,
}

impl<'a> Lines<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines().map(str::trim).collect(),
        }
    }

    pub fn get(&self, at: usize) -> Option<&'a str> {
        self.lines.get(at).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.lines.iter().copied()
    }

    /// Join the anchor line at `start` with every continuation line after it.
    /// Noise lines are skipped, the next anchor or stop line ends the span.
    /// Returns the logical text and the index of the first line not consumed.
    pub fn gather(&self, start: usize, role: impl Fn(&str) -> LineRole) -> (String, usize) {
        let mut buffer = self.get(start).unwrap_or_default().to_string();
        let mut at = start + 1;
        while let Some(line) = self.get(at) {
            if line.is_empty() {
                at += 1;
                continue;
            }
            match role(line) {
                LineRole::Anchor | LineRole::Stop => break,
                LineRole::Noise => {}
                LineRole::Continuation => {
                    buffer.push(' ');
                    buffer.push_str(line);
                }
            }
            at += 1;
        }
        (buffer, at)
    }
}

/// Result of one extraction step: the record found at an anchor (if any),
/// the date that anchor established for later undated rows, and the index
/// to resume scanning from.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub record: Option<Transaction>,
    pub date: Option<String>,
    pub next: usize,
}

impl Step {
    pub fn skip(date: Option<String>, next: usize) -> Self {
        Self {
            record: None,
            date,
            next,
        }
    }
}

/// Build a candidate record. A description that cleans down to nothing
/// means the line was not a transaction.
pub fn candidate(
    date: &str,
    description: &str,
    amount: f64,
    kind: Option<TxnType>,
    balance: Option<f64>,
) -> Option<Transaction> {
    if description.trim().is_empty() {
        return None;
    }
    Some(Transaction::new(date, description, amount, kind).with_balance(balance))
}

/// Column layout implied by how many amounts a transaction span contains.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Columns {
    Empty,
    /// A lone number: most often a balance-only line.
    Single(f64),
    AmountBalance { amount: f64, balance: f64 },
    InOutBalance { money_in: f64, money_out: f64, balance: f64 },
}

impl Columns {
    /// Three or more values use the last three (`in`, `out`, `balance`).
    pub fn from_values(values: &[f64]) -> Self {
        match values {
            [] => Columns::Empty,
            [only] => Columns::Single(*only),
            [amount, balance] => Columns::AmountBalance {
                amount: *amount,
                balance: *balance,
            },
            [.., money_in, money_out, balance] => Columns::InOutBalance {
                money_in: *money_in,
                money_out: *money_out,
                balance: *balance,
            },
        }
    }
}

/// Amount and direction for the in/out/balance layout. Money in wins when
/// both columns are non-zero.
pub fn split_in_out(money_in: f64, money_out: f64) -> Option<(f64, TxnType)> {
    if money_in > 0.0 {
        Some((money_in, TxnType::Credit))
    } else if money_out > 0.0 {
        Some((money_out, TxnType::Debit))
    } else {
        None
    }
}

/// Direction implied by the running balance moving from `previous` to
/// `balance` by `amount`. `None` when the figures do not reconcile.
pub fn balance_direction(previous: Option<f64>, amount: f64, balance: Option<f64>) -> Option<TxnType> {
    let (previous, balance) = (previous?, balance?);
    if same_money(previous - amount, balance) {
        Some(TxnType::Debit)
    } else if same_money(previous + amount, balance) {
        Some(TxnType::Credit)
    } else {
        None
    }
}

/// Case-insensitive keyword lookup: credit phrases are checked first.
pub fn keyword_direction(description: &str, credit: &[&str], debit: &[&str]) -> Option<TxnType> {
    let lower = description.to_lowercase();
    if credit.iter().any(|k| lower.contains(k)) {
        Some(TxnType::Credit)
    } else if debit.iter().any(|k| lower.contains(k)) {
        Some(TxnType::Debit)
    } else {
        None
    }
}

/// Collects records in document order while enforcing the emission rules:
/// positive amounts only, an opening balance only before anything else.
#[derive(Debug, Default)]
pub struct Ledger {
    records: Vec<Transaction>,
    last_balance: Option<f64>,
    dropped: usize,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Balance of the most recent record that printed one.
    pub fn last_balance(&self) -> Option<f64> {
        self.last_balance
    }

    /// Record the opening balance. Ignored once any record exists, since
    /// multi-page statements repeat the marker at every page top.
    pub fn open(&mut self, date: impl Into<String>, balance: f64) -> bool {
        if !self.records.is_empty() {
            return false;
        }
        self.records.push(Transaction::brought_forward(date, balance));
        self.last_balance = Some(balance);
        true
    }

    pub fn push(&mut self, txn: Transaction) {
        if txn.amount <= 0.0 || !txn.amount.is_finite() || txn.date.trim().is_empty() {
            self.dropped += 1;
            return;
        }
        if txn.balance.is_some() {
            self.last_balance = txn.balance;
        }
        self.records.push(txn);
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn into_records(self) -> Vec<Transaction> {
        self.records
    }
}
