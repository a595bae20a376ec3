//! Statement record types shared by every parser and the pipeline

use serde::{Deserialize, Serialize};

/// Description used when nothing readable survives cleanup.
pub const PLACEHOLDER_DESCRIPTION: &str = "Transaction";

/// Direction of a transaction. Sign lives here, never in `amount`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TxnType {
    #[serde(rename = "credit")]
    Credit,
    #[serde(rename = "debit")]
    Debit,
    /// Opening balance marker: `amount` is zero and only `balance` is set.
    #[serde(rename = "brought_forward")]
    BroughtForward,
}

impl TxnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxnType::Credit => "credit",
            TxnType::Debit => "debit",
            TxnType::BroughtForward => "brought_forward",
        }
    }
}

/// One financial movement on a statement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    /// Date exactly as the institution prints it (not normalized)
    pub date: String,
    pub description: String,
    /// Magnitude only
    pub amount: f64,
    /// Running balance after this transaction, when the source shows it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<f64>,
    /// `None` only for rows the lenient tier could not orient
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<TxnType>,
}

impl Transaction {
    pub fn debit(date: impl Into<String>, description: impl Into<String>, amount: f64) -> Self {
        Self::new(date, description, amount, Some(TxnType::Debit))
    }

    pub fn credit(date: impl Into<String>, description: impl Into<String>, amount: f64) -> Self {
        Self::new(date, description, amount, Some(TxnType::Credit))
    }

    /// Opening-balance record with a zero amount.
    pub fn brought_forward(date: impl Into<String>, balance: f64) -> Self {
        Self {
            date: date.into(),
            description: "Balance brought forward".to_string(),
            amount: 0.0,
            balance: Some(balance),
            kind: Some(TxnType::BroughtForward),
        }
    }

    pub fn new(
        date: impl Into<String>,
        description: impl Into<String>,
        amount: f64,
        kind: Option<TxnType>,
    ) -> Self {
        let description = description.into();
        let description = if description.trim().is_empty() {
            PLACEHOLDER_DESCRIPTION.to_string()
        } else {
            description
        };
        Self {
            date: date.into(),
            description,
            amount: amount.abs(),
            balance: None,
            kind,
        }
    }

    pub fn with_balance(mut self, balance: Option<f64>) -> Self {
        self.balance = balance;
        self
    }

    /// Type as downstream consumers see it: unknown rows count as debits.
    pub fn effective_type(&self) -> TxnType {
        self.kind.unwrap_or(TxnType::Debit)
    }

    pub fn is_brought_forward(&self) -> bool {
        self.kind == Some(TxnType::BroughtForward)
    }

    /// Signed amount from the account holder's point of view.
    pub fn signed_amount(&self) -> f64 {
        match self.effective_type() {
            TxnType::Credit => self.amount,
            TxnType::Debit => -self.amount,
            TxnType::BroughtForward => 0.0,
        }
    }

    /// Record invariants: dated, described, non-negative, and zero only for
    /// an opening balance.
    pub fn is_valid(&self) -> bool {
        if self.date.trim().is_empty() || self.description.trim().is_empty() {
            return false;
        }
        if !self.amount.is_finite() || self.amount < 0.0 {
            return false;
        }
        if self.is_brought_forward() {
            return self.amount == 0.0 && self.balance.is_some();
        }
        self.amount > 0.0
    }
}

/// Best-effort facts about the statement as a whole
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatementMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement_period: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_name: Option<String>,
}

impl StatementMetadata {
    pub fn is_empty(&self) -> bool {
        self.account_number.is_none()
            && self.sort_code.is_none()
            && self.statement_period.is_none()
            && self.bank_name.is_none()
    }
}

/// Output of a single parser run, in document order
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ParsedStatement {
    pub transactions: Vec<Transaction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<StatementMetadata>,
}

impl ParsedStatement {
    pub fn new(transactions: Vec<Transaction>) -> Self {
        Self {
            transactions,
            metadata: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }
}

/// What the pipeline hands back to its caller
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatementResult {
    pub transactions: Vec<Transaction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<StatementMetadata>,
    #[serde(rename = "usedOCR")]
    pub used_ocr: bool,
    /// Recognition confidence (0-100), present only when OCR ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    /// Key of the parser that produced the transactions
    pub parser: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<usize>,
}

impl StatementResult {
    pub fn totals(&self) -> (f64, f64) {
        self.transactions
            .iter()
            .fold((0.0, 0.0), |(money_in, money_out), t| match t.kind {
                Some(TxnType::Credit) => (money_in + t.amount, money_out),
                Some(TxnType::BroughtForward) => (money_in, money_out),
                _ => (money_in, money_out + t.amount),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_is_stored_as_magnitude() {
        let t = Transaction::debit("01/12/2024", "TESCO STORES", -45.57);
        assert_eq!(t.amount, 45.57);
        assert_eq!(t.signed_amount(), -45.57);
        assert!(t.is_valid());
    }

    #[test]
    fn test_empty_description_gets_placeholder() {
        let t = Transaction::credit("01/12/2024", "   ", 10.0);
        assert_eq!(t.description, PLACEHOLDER_DESCRIPTION);
    }

    #[test]
    fn test_zero_amount_only_valid_for_brought_forward() {
        assert!(!Transaction::debit("01/12/2024", "X", 0.0).is_valid());
        assert!(Transaction::brought_forward("05 Feb 2025", 313.41).is_valid());
    }

    #[test]
    fn test_unknown_type_is_treated_as_debit() {
        let t = Transaction::new("01/12/2024", "MYSTERY", 12.0, None);
        assert_eq!(t.effective_type(), TxnType::Debit);
        assert!(t.is_valid());
    }

    #[test]
    fn test_transaction_json_shape() {
        let t = Transaction::debit("01/12/2024", "TESCO STORES", 45.57).with_balance(Some(120.0));
        let v = serde_json::to_value(&t).unwrap();
        assert_eq!(v["type"], "debit");
        assert_eq!(v["balance"], 120.0);

        let unknown = Transaction::new("01/12/2024", "X", 1.0, None);
        let v = serde_json::to_value(&unknown).unwrap();
        assert!(v.get("type").is_none());
        assert!(v.get("balance").is_none());
    }

    #[test]
    fn test_result_json_uses_caller_field_names() {
        let r = StatementResult {
            transactions: vec![],
            metadata: None,
            used_ocr: true,
            confidence: Some(87.5),
            parser: "generic".to_string(),
            page_count: Some(2),
        };
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["usedOCR"], true);
        assert_eq!(v["confidence"], 87.5);
        assert_eq!(v["pageCount"], 2);
    }

    #[test]
    fn test_totals_split_in_and_out() {
        let r = StatementResult {
            transactions: vec![
                Transaction::brought_forward("1 Jan", 100.0),
                Transaction::credit("2 Jan", "PAY", 50.0),
                Transaction::debit("3 Jan", "SHOP", 20.0),
                Transaction::new("4 Jan", "?", 5.0, None),
            ],
            metadata: None,
            used_ocr: false,
            confidence: None,
            parser: "generic".to_string(),
            page_count: None,
        };
        assert_eq!(r.totals(), (50.0, 25.0));
    }
}
