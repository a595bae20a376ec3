//! Institution classification by fixed marker strings.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Which statement parser handles a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParserId {
    Nationwide,
    Santander,
    Hsbc,
    Barclays,
    Generic,
}

/// Priority order. Earlier entries win when markers of two banks co-occur.
pub const CLASSIFY_ORDER: &[ParserId] = &[
    ParserId::Nationwide,
    ParserId::Santander,
    ParserId::Hsbc,
    ParserId::Barclays,
];

pub const ALL_PARSERS: &[ParserId] = &[
    ParserId::Nationwide,
    ParserId::Santander,
    ParserId::Hsbc,
    ParserId::Barclays,
    ParserId::Generic,
];

impl ParserId {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Nationwide => "nationwide",
            Self::Santander => "santander",
            Self::Hsbc => "hsbc",
            Self::Barclays => "barclays",
            Self::Generic => "generic",
        }
    }

    pub fn bank_name(&self) -> Option<&'static str> {
        match self {
            Self::Nationwide => Some("Nationwide Building Society"),
            Self::Santander => Some("Santander UK"),
            Self::Hsbc => Some("HSBC UK"),
            Self::Barclays => Some("Barclays"),
            Self::Generic => None,
        }
    }

    pub fn from_key(key: &str) -> Option<ParserId> {
        ALL_PARSERS
            .iter()
            .find(|p| p.key().eq_ignore_ascii_case(key.trim()))
            .copied()
    }

    /// Legal-name and domain markers, matched case-insensitively.
    fn name_markers(&self) -> &'static [&'static str] {
        match self {
            Self::Nationwide => &["nationwide building society", "nationwide.co.uk"],
            Self::Santander => &["santander uk plc", "santander.co.uk"],
            Self::Hsbc => &["hsbc uk bank plc", "hsbc.co.uk"],
            Self::Barclays => &["barclays bank uk plc", "barclays.co.uk"],
            Self::Generic => &[],
        }
    }

    /// Sort-code prefix printed after a "sort code" label.
    fn sort_code_prefix(&self) -> Option<&'static str> {
        match self {
            Self::Nationwide => Some("07"),
            Self::Santander => Some("09"),
            Self::Hsbc => Some("40"),
            Self::Barclays => Some("20"),
            Self::Generic => None,
        }
    }

    fn matches(&self, lower: &str, sort_codes: &[String]) -> bool {
        if self.name_markers().iter().any(|m| lower.contains(m)) {
            return true;
        }
        self.sort_code_prefix()
            .is_some_and(|prefix| sort_codes.iter().any(|sc| sc.starts_with(prefix)))
    }
}

impl std::fmt::Display for ParserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

fn sort_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\bsort\s*code\s*:?\s*(\d{2})[- ](\d{2})[- ](\d{2})\b").expect("sort code regex")
    })
}

/// Pick the parser for `text`. Pure: the same text always gets the same answer.
pub fn classify(text: &str) -> ParserId {
    let lower = text.to_lowercase();
    let sort_codes: Vec<String> = sort_code_re()
        .captures_iter(text)
        .map(|c| format!("{}-{}-{}", &c[1], &c[2], &c[3]))
        .collect();

    CLASSIFY_ORDER
        .iter()
        .find(|p| p.matches(&lower, &sort_codes))
        .copied()
        .unwrap_or(ParserId::Generic)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legal_names() {
        assert_eq!(classify("Nationwide Building Society\nFlexAccount"), ParserId::Nationwide);
        assert_eq!(classify("Santander UK plc. Registered Office"), ParserId::Santander);
        assert_eq!(classify("HSBC UK Bank plc\nYour Statement"), ParserId::Hsbc);
        assert_eq!(classify("Barclays Bank UK PLC. Authorised"), ParserId::Barclays);
    }

    #[test]
    fn test_domains_and_sort_codes() {
        assert_eq!(classify("visit www.santander.co.uk"), ParserId::Santander);
        assert_eq!(classify("Sort code 40-12-34 Account 12345678"), ParserId::Hsbc);
        assert_eq!(classify("SORT CODE: 20 45 67"), ParserId::Barclays);
    }

    #[test]
    fn test_bare_bank_name_in_description_does_not_match() {
        let text = "01/02/2025 TRANSFER TO NATIONWIDE 50.00 100.00";
        assert_eq!(classify(text), ParserId::Generic);
    }

    #[test]
    fn test_priority_when_markers_co_occur() {
        let text = "HSBC UK Bank plc\nSwitching from Nationwide Building Society";
        assert_eq!(classify(text), ParserId::Nationwide);
    }

    #[test]
    fn test_classify_is_deterministic() {
        let text = "Barclays Bank UK PLC\nSort Code 20-00-00";
        let first = classify(text);
        for _ in 0..10 {
            assert_eq!(classify(text), first);
        }
    }

    #[test]
    fn test_from_key_round_trips() {
        for p in ALL_PARSERS {
            assert_eq!(ParserId::from_key(p.key()), Some(*p));
        }
        assert_eq!(ParserId::from_key("monzo"), None);
    }
}
