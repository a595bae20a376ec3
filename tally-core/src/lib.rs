//! tally-core: statement record types and the error taxonomy shared by the
//! parsing engine and the pipeline.

pub mod error;
pub mod statement;

pub use error::{Result, TallyError};
pub use statement::{
    ParsedStatement, StatementMetadata, StatementResult, Transaction, TxnType,
    PLACEHOLDER_DESCRIPTION,
};

/// Longest excerpt of raw text attached to an empty-result failure.
pub const EXCERPT_CHARS: usize = 500;

/// First `EXCERPT_CHARS` characters of `text`, cut on a char boundary.
pub fn excerpt(text: &str) -> String {
    text.trim().chars().take(EXCERPT_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excerpt_is_char_safe() {
        let text = "£".repeat(EXCERPT_CHARS + 10);
        let e = excerpt(&text);
        assert_eq!(e.chars().count(), EXCERPT_CHARS);
    }
}
