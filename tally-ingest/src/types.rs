use serde::{Deserialize, Serialize};

/// Year used when a statement prints day/month rows and no header year can
/// be found. A wrong year here is silent, so it is overridable per run.
pub const FALLBACK_STATEMENT_YEAR: i32 = 2025;

/// Generic-parser guess when nothing on the line says which way money moved:
/// amounts below this are assumed to be debits, the rest credits. Crude, kept
/// as observed, and configurable.
pub const DEFAULT_DEBIT_THRESHOLD: f64 = 1000.0;

/// Knobs shared by every statement parser
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    pub fallback_year: i32,
    pub debit_threshold: f64,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            fallback_year: FALLBACK_STATEMENT_YEAR,
            debit_threshold: DEFAULT_DEBIT_THRESHOLD,
        }
    }
}
