// src/process/extract.rs

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{ProcessError, Result};

/// Tenor label → yield in percent, e.g. `"10_year" → 3.5`, in the order
/// the tenors were supplied.
pub type YieldMap = IndexMap<String, f64>;

/// The maturity buckets the extractor knows how to find in free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tenor {
    TenYear,
    TwoYear,
    ThirtyYear,
}

static TEN_YEAR: Lazy<Regex> = Lazy::new(|| yield_pattern("10"));
static TWO_YEAR: Lazy<Regex> = Lazy::new(|| yield_pattern("2"));
static THIRTY_YEAR: Lazy<Regex> = Lazy::new(|| yield_pattern("30"));

/// `<n>-year Treasury|bond yield[: ]<number>`, case-insensitive, loose whitespace.
fn yield_pattern(years: &str) -> Regex {
    Regex::new(&format!(
        r"(?i){years}\s*-\s*year\s*(?:Treasury|bond)\s*yield[:\s]+([\d.]+)"
    ))
    .expect("yield pattern should compile")
}

impl Tenor {
    /// Scan order; also the order failures are reported in.
    pub const ALL: [Tenor; 3] = [Tenor::TenYear, Tenor::TwoYear, Tenor::ThirtyYear];

    /// Key used in yield maps and in the `bond_type` column.
    pub fn key(self) -> &'static str {
        match self {
            Tenor::TenYear => "10_year",
            Tenor::TwoYear => "2_year",
            Tenor::ThirtyYear => "30_year",
        }
    }

    fn pattern(self) -> &'static Regex {
        match self {
            Tenor::TenYear => &*TEN_YEAR,
            Tenor::TwoYear => &*TWO_YEAR,
            Tenor::ThirtyYear => &*THIRTY_YEAR,
        }
    }

    /// First numeral captured for this tenor in `text`, unparsed.
    fn find_raw(self, text: &str) -> Option<&str> {
        self.pattern()
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }
}

/// Pull every known tenor's yield out of `text`.
///
/// Only the first match per tenor is used. Tenors that never appear are
/// simply missing from the map. A captured numeral that does not parse
/// (e.g. `"3.5."` at the end of a sentence) fails the whole call.
pub fn extract_yields(text: &str) -> Result<YieldMap> {
    let mut yields = YieldMap::new();
    for tenor in Tenor::ALL {
        let Some(raw) = tenor.find_raw(text) else {
            continue;
        };
        let value: f64 = raw.parse().map_err(|_| ProcessError::Extraction {
            tenor: tenor.key(),
            raw: raw.to_string(),
        })?;
        yields.insert(tenor.key().to_string(), value);
    }
    Ok(yields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_all_three_tenors() {
        let text = r#"
    10-year Treasury yield: 3.5%
    2-year bond yield: 4.2%
    30-year Treasury yield: 3.8%
    "#;
        let yields = extract_yields(text).unwrap();
        assert_eq!(yields.len(), 3);
        assert_eq!(yields["10_year"], 3.5);
        assert_eq!(yields["2_year"], 4.2);
        assert_eq!(yields["30_year"], 3.8);
    }

    #[test]
    fn test_missing_tenors_are_absent() {
        let yields = extract_yields("The 10-year Treasury yield 4.05 rose today").unwrap();
        assert_eq!(yields.len(), 1);
        assert_eq!(yields["10_year"], 4.05);
        assert!(!yields.contains_key("2_year"));
        assert!(!yields.contains_key("30_year"));
    }

    #[test]
    fn test_case_and_whitespace_tolerant() {
        let yields = extract_yields("30 - YEAR BOND YIELD   4.9 and 2-Year treasury Yield:5").unwrap();
        assert_eq!(yields["30_year"], 4.9);
        assert_eq!(yields["2_year"], 5.0);
    }

    #[test]
    fn test_first_match_wins() {
        let text = "10-year Treasury yield: 3.9, later the 10-year Treasury yield: 4.4";
        let yields = extract_yields(text).unwrap();
        assert_eq!(yields["10_year"], 3.9);
    }

    #[test]
    fn test_unrelated_text_is_empty() {
        assert!(extract_yields("Corporate spreads widened on Tuesday.")
            .unwrap()
            .is_empty());
        assert!(extract_yields("").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_numeral_fails_whole_call() {
        let text = "2-year bond yield: 4.2 and the 10-year Treasury yield: 3.5.";
        let err = extract_yields(text).unwrap_err();
        match err {
            ProcessError::Extraction { tenor, raw } => {
                assert_eq!(tenor, "10_year");
                assert_eq!(raw, "3.5.");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
