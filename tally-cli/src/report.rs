//! Plain-text rendering for the `parse` and `inspect` commands.

use std::fmt::Write;

use tally_core::{StatementMetadata, StatementResult};

pub fn render_table(result: &StatementResult) -> String {
    let mut out = String::new();
    let _ = write!(out, "Parser: {}", result.parser);
    if let Some(pages) = result.page_count {
        let _ = write!(out, " | pages: {pages}");
    }
    if result.used_ocr {
        match result.confidence {
            Some(c) => {
                let _ = write!(out, " | OCR confidence: {c:.1}");
            }
            None => out.push_str(" | OCR"),
        }
    }
    out.push('\n');
    if let Some(meta) = &result.metadata {
        out.push_str(&render_metadata(meta));
    }
    out.push('\n');

    let _ = writeln!(
        out,
        "{:<16} {:<15} {:>12} {:>12}  Description",
        "Date", "Type", "Amount", "Balance"
    );
    for t in &result.transactions {
        let kind = t.kind.map(|k| k.as_str()).unwrap_or("unknown");
        let balance = t.balance.map(|b| format!("{b:.2}")).unwrap_or_default();
        let _ = writeln!(
            out,
            "{:<16} {:<15} {:>12.2} {:>12}  {}",
            t.date, kind, t.amount, balance, t.description
        );
    }

    let (money_in, money_out) = result.totals();
    let _ = writeln!(
        out,
        "\n{} transactions | in: {money_in:.2} | out: {money_out:.2}",
        result.transactions.len()
    );
    out
}

pub fn render_metadata(meta: &StatementMetadata) -> String {
    let mut out = String::new();
    let fields = [
        ("Bank", &meta.bank_name),
        ("Account", &meta.account_number),
        ("Sort code", &meta.sort_code),
        ("Period", &meta.statement_period),
    ];
    for (label, value) in fields {
        if let Some(v) = value {
            let _ = writeln!(out, "{label}: {v}");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::Transaction;

    fn result() -> StatementResult {
        StatementResult {
            transactions: vec![
                Transaction::brought_forward("05 Feb 2025", 313.41),
                Transaction::debit("06 Feb 2025", "TESCO STORES", 12.5).with_balance(Some(300.91)),
                Transaction::new("07 Feb 2025", "MYSTERY", 3.0, None),
            ],
            metadata: Some(StatementMetadata {
                bank_name: Some("Nationwide Building Society".to_string()),
                sort_code: Some("07-01-16".to_string()),
                ..StatementMetadata::default()
            }),
            used_ocr: true,
            confidence: Some(88.4),
            parser: "nationwide".to_string(),
            page_count: Some(2),
        }
    }

    #[test]
    fn test_table_has_header_rows_and_totals() {
        let out = render_table(&result());
        assert!(out.starts_with("Parser: nationwide | pages: 2 | OCR confidence: 88.4"));
        assert!(out.contains("Bank: Nationwide Building Society\nSort code: 07-01-16\n"));
        assert!(out.contains("TESCO STORES"));
        assert!(out.contains("unknown"));
        assert!(out.contains("3 transactions | in: 0.00 | out: 15.50"));
    }

    #[test]
    fn test_empty_metadata_renders_nothing() {
        assert!(render_metadata(&StatementMetadata::default()).is_empty());
    }
}
