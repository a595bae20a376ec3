//! One module per statement format, dispatched through [`ParserId`].

pub mod barclays;
pub mod columnar;
pub mod generic;
pub mod hsbc;
pub mod nationwide;
pub mod santander;

use tally_core::ParsedStatement;
use tracing::debug;

use crate::classify::{ParserId, classify};
use crate::metadata::extract_metadata;
use crate::types::ParseOptions;

impl ParserId {
    /// Run this parser over extracted statement text. Never fails: lines
    /// that do not parse are skipped, and a document with nothing in it
    /// yields an empty statement.
    pub fn parse(&self, text: &str, opts: &ParseOptions) -> ParsedStatement {
        let transactions = match self {
            ParserId::Nationwide => nationwide::parse(text, opts),
            ParserId::Santander => santander::parse(text, opts),
            ParserId::Hsbc => hsbc::parse(text, opts),
            ParserId::Barclays => barclays::parse(text, opts),
            ParserId::Generic => generic::parse(text, opts),
        };
        debug!(parser = %self, count = transactions.len(), "statement parsed");

        let metadata = extract_metadata(text, *self);
        ParsedStatement {
            transactions,
            metadata: (!metadata.is_empty()).then_some(metadata),
        }
    }
}

/// Classify `text`, then parse it with the chosen parser.
pub fn parse_statement(text: &str, opts: &ParseOptions) -> (ParserId, ParsedStatement) {
    let parser = classify(text);
    (parser, parser.parse(text, opts))
}
