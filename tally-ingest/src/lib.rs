//! tally-ingest: statement text analysis and parsing.
//!
//! Everything here is synchronous and pure. Text goes in, records come out;
//! no file or process I/O happens in this crate.

pub mod classify;
pub mod dates;
pub mod detect;
pub mod metadata;
pub mod parsers;
pub mod repair;
pub mod scan;
pub mod tabular;
pub mod text;
pub mod types;

pub use classify::{ALL_PARSERS, ParserId, classify};
pub use detect::{ScanReason, ScanVerdict, assess, is_likely_scanned};
pub use metadata::extract_metadata;
pub use parsers::parse_statement;
pub use repair::repair_ocr_text;
pub use tabular::{Row, parse_rows, read_rows};
pub use types::{DEFAULT_DEBIT_THRESHOLD, FALLBACK_STATEMENT_YEAR, ParseOptions};
