//! Repair of systematic OCR character confusions.
//!
//! Every rule is anchored to a numeric or date context. Prose is left alone:
//! merchant names full of O, I, S, B and l must survive untouched.

use std::sync::OnceLock;

use regex::{Captures, Regex};

/// `Â£` / `Ã‚Â£` mojibake, or a token-initial `E` standing in for `£`, before
/// something shaped like a decimal amount.
fn currency_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(^|[\s(])(?:Ã‚Â£|Â£|E)(\d[\d,OoIl]*\.[0-9OoSBIl]{2})\b").expect("currency regex")
    })
}

fn letter_before_digit_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b([OoIl])(\d)").expect("leading letter regex"))
}

fn letter_after_digit_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d)([OoIl])\b").expect("trailing letter regex"))
}

fn date_letter_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(^|\s)[A-Za-z](\d/\d{2}/\d{4})").expect("date letter regex")
    })
}

fn decimal_letter_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d\.)([SB])(\d)").expect("decimal letter regex"))
}

fn digit_for(letter: &str) -> &'static str {
    match letter {
        "O" | "o" => "0",
        "I" | "l" => "1",
        "S" => "5",
        "B" => "8",
        _ => "",
    }
}

/// Upper bound on repair passes. Every pass that changes the text turns at
/// least one letter into a digit or `£`, so real input settles in two or three.
const MAX_PASSES: usize = 16;

/// Correct OCR confusions in numeric and date contexts. Idempotent: a
/// repaired digit can complete the context of a neighbouring rule
/// (`10.B2.B01` takes two passes), so passes repeat until nothing changes.
pub fn repair_ocr_text(text: &str) -> String {
    let mut current = repair_pass(text);
    for _ in 1..MAX_PASSES {
        let next = repair_pass(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn repair_pass(text: &str) -> String {
    let text = currency_re().replace_all(text, "${1}£${2}");

    let text = letter_before_digit_re().replace_all(&text, |c: &Captures| {
        format!("{}{}", digit_for(&c[1]), &c[2])
    });
    let text = letter_after_digit_re().replace_all(&text, |c: &Captures| {
        format!("{}{}", &c[1], digit_for(&c[2]))
    });

    let text = date_letter_re().replace_all(&text, "${1}0${2}");

    let text = decimal_letter_re().replace_all(&text, |c: &Captures| {
        format!("{}{}{}", &c[1], digit_for(&c[2]), &c[3])
    });

    text.into_owned()
}
