use tally_core::{Transaction, TxnType};
use tally_ingest::{ParseOptions, ParserId, parse_statement, repair_ocr_text};

const NATIONWIDE: &str = r#"
Nationwide Building Society
FlexAccount
Sort code 07-01-16 Account number 12345678
Statement date: 05 Mar 2025
Date Description £Out £In £Balance
Balance from statement 47 dated 05/02/2025 313.41
06 Feb Contactless payment TESCO STORES 12.50 300.91
07 Feb Bank credit ACME LTD 1,500.00 1,800.91
Balance carried forward 1,800.91
"#;

const SANTANDER: &str = r#"
Santander UK plc
Account number: 1234 5678 Sort Code 09-01-28
Your account summary for 1st Jan 2025 to 31st Jan 2025
1st Jan Balance brought forward 1,000.00
3rd Jan CARD PAYMENT TO TESCO STORES, 12.50 GBP, RATE 1.00/GBP ON 01-01-2025 12.50 987.50
5th Jan FASTER PAYMENTS RECEIPT FROM J DOE 20.00 1,007.50
"#;

const HSBC: &str = r#"
HSBC UK Bank plc
01 January to 31 January 2024
01 Jan 24 BALANCE BROUGHT FORWARD 1,000.00
02 Jan 24 VIS TESCO STORES 12.50
CR ACME LTD SALARY 1,500.00 2,487.50
"#;

const BARCLAYS: &str = r#"
Barclays Bank UK PLC
Sort Code 20-00-00 Account No 12345678
1 Feb - 28 Feb 2025
1 Feb Start balance 2,000.00
3 Feb Card Payment to Tesco Stores
On 01 Feb 12.50 1,987.50
Received From Acme Ltd 1,500.00 3,487.50
"#;

fn assert_invariants(txns: &[Transaction]) {
    for (i, t) in txns.iter().enumerate() {
        assert!(t.amount >= 0.0, "negative amount in {t:?}");
        assert!(t.is_valid(), "invalid record {t:?}");
        if t.is_brought_forward() {
            assert_eq!(i, 0, "opening balance must come first");
            assert_eq!(t.amount, 0.0);
        } else {
            assert!(t.amount > 0.0);
        }
    }
}

#[test]
fn test_each_institution_is_classified_and_parsed() {
    let opts = ParseOptions::default();
    for (text, expected, count) in [
        (NATIONWIDE, ParserId::Nationwide, 3),
        (SANTANDER, ParserId::Santander, 3),
        (HSBC, ParserId::Hsbc, 3),
        (BARCLAYS, ParserId::Barclays, 3),
    ] {
        let (parser, parsed) = parse_statement(text, &opts);
        assert_eq!(parser, expected);
        assert_eq!(parsed.len(), count, "{parser}: {:#?}", parsed.transactions);
        assert!(parsed.transactions[0].is_brought_forward(), "{parser}");
        assert_invariants(&parsed.transactions);
        assert_eq!(
            parsed.metadata.and_then(|m| m.bank_name),
            expected.bank_name().map(str::to_string)
        );
    }
}

#[test]
fn test_document_order_is_preserved() {
    let (_, parsed) = parse_statement(SANTANDER, &ParseOptions::default());
    let dates: Vec<&str> = parsed.transactions.iter().map(|t| t.date.as_str()).collect();
    assert_eq!(dates, vec!["1st Jan 2025", "3rd Jan 2025", "5th Jan 2025"]);
    assert_eq!(parsed.transactions[2].kind, Some(TxnType::Credit));
}

#[test]
fn test_nationwide_opening_balance_record() {
    let (_, parsed) = parse_statement(NATIONWIDE, &ParseOptions::default());
    let opening = &parsed.transactions[0];
    assert_eq!(opening.kind, Some(TxnType::BroughtForward));
    assert_eq!(opening.amount, 0.0);
    assert_eq!(opening.balance, Some(313.41));
    assert_eq!(opening.date, "05 Feb 2025");
}

#[test]
fn test_generic_slash_row() {
    let (parser, parsed) = parse_statement("01/12/2024 TESCO STORES 45.57 120.00", &ParseOptions::default());
    assert_eq!(parser, ParserId::Generic);
    let t = &parsed.transactions[0];
    assert_eq!(
        (t.date.as_str(), t.description.as_str(), t.amount, t.balance, t.kind),
        ("01/12/2024", "TESCO STORES", 45.57, Some(120.0), Some(TxnType::Debit))
    );
}

#[test]
fn test_repaired_ocr_text_parses() {
    let repaired = repair_ocr_text("O1/12/2024 TESCO STORES E45.S7");
    assert_eq!(repaired, "01/12/2024 TESCO STORES £45.57");
    let (_, parsed) = parse_statement(&repaired, &ParseOptions::default());
    assert_eq!(parsed.len(), 1);
    assert_eq!(parsed.transactions[0].amount, 45.57);
}

#[test]
fn test_parsing_is_stateless() {
    let opts = ParseOptions::default();
    let first = parse_statement(BARCLAYS, &opts);
    let second = parse_statement(BARCLAYS, &opts);
    assert_eq!(first, second);
}
