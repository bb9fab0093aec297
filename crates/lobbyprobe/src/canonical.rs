//! Operator and currency canonicalization.
//!
//! The lobby renders the same identifier in several ways (`WowVegas`,
//! `WOWVEGAS`, `Wow Vegas`; `.COM`, `DotCom`, ...). These helpers map a
//! name to its canonical form and expand a value into every rendering the
//! locator should accept. All variant lists are deduplicated in first-seen
//! order; the order is the tie-break order of exact matches.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Synonyms rendered for the WowVegas operator
pub const WOWVEGAS_SYNONYMS: &[&str] = &["WowVegas", "WOWVEGAS", "Wow Vegas"];

/// Synonyms rendered for the DotCom operator
pub const DOTCOM_SYNONYMS: &[&str] = &[
    ".COM Currency",
    "DotCom",
    ".com",
    "DOTCOM",
    "dotcom",
    "Dot Com",
    ".COM",
];

/// Extra renderings of the dot-com family added to generic text variants
const DOTCOM_TEXT_EXPANSION: &[&str] = &[".COM", ".com", ".COM Currency", "DotCom", "Dot Com"];

/// Canonical operator identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum CanonicalOperator {
    /// The WowVegas operator
    WowVegas,
    /// The .COM operator
    DotCom,
    /// Any operator without a synonym table, kept verbatim
    Other(String),
}

impl CanonicalOperator {
    /// Canonical spelling
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::WowVegas => "WowVegas",
            Self::DotCom => "DotCom",
            Self::Other(name) => name,
        }
    }

    /// Renderings of this operator, most specific first
    #[must_use]
    pub fn variants(&self) -> Vec<String> {
        match self {
            Self::WowVegas => WOWVEGAS_SYNONYMS.iter().map(|s| (*s).to_string()).collect(),
            Self::DotCom => DOTCOM_SYNONYMS.iter().map(|s| (*s).to_string()).collect(),
            Self::Other(name) => text_variants(name),
        }
    }
}

impl fmt::Display for CanonicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for CanonicalOperator {
    fn from(name: String) -> Self {
        canonical_operator(&name)
    }
}

impl From<CanonicalOperator> for String {
    fn from(op: CanonicalOperator) -> Self {
        op.as_str().to_string()
    }
}

impl PartialEq<&str> for CanonicalOperator {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

/// Map an operator name to its canonical form.
///
/// Unrecognized names pass through unchanged.
#[must_use]
pub fn canonical_operator(name: &str) -> CanonicalOperator {
    let n = name.trim().to_lowercase();
    if n == "wowvegas" || n == "wow vegas" {
        CanonicalOperator::WowVegas
    } else if n.contains(".com") || n.contains("dotcom") || n.contains("dot com") {
        CanonicalOperator::DotCom
    } else {
        CanonicalOperator::Other(name.to_string())
    }
}

/// Synonym list for an operator name
#[must_use]
pub fn operator_variants(name: &str) -> Vec<String> {
    canonical_operator(name).variants()
}

/// Every value an operator dropdown may currently display
#[must_use]
pub fn known_operator_values() -> Vec<String> {
    dedup(
        WOWVEGAS_SYNONYMS
            .iter()
            .chain(DOTCOM_SYNONYMS)
            .map(|s| (*s).to_string()),
    )
}

/// Generic case and spacing renderings of `s`
#[must_use]
pub fn text_variants(s: &str) -> Vec<String> {
    let t = s.trim();
    let mut out = case_variants(t);

    let spaced = split_camel_case(t);
    if spaced != t {
        out.extend(case_variants(&spaced));
    }

    if canonical_operator(t) == CanonicalOperator::DotCom {
        out.extend(DOTCOM_TEXT_EXPANSION.iter().map(|s| (*s).to_string()));
    }

    dedup(out)
}

/// Case renderings of a currency code plus the O-to-zero confusion
#[must_use]
pub fn currency_variants(s: &str) -> Vec<String> {
    let mut out = case_variants(s);
    let swapped = s.replace(['O', 'o'], "0").to_uppercase();
    if swapped != s {
        out.push(swapped);
    }
    dedup(out)
}

fn case_variants(s: &str) -> Vec<String> {
    vec![s.to_string(), s.to_uppercase(), s.to_lowercase(), capitalize(s)]
}

/// Upper-case the first character and lower-case the rest
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Insert a space before every upper-case letter after the first character.
///
/// Codes spread out letter by letter (`USD` as `U S D`) are covered the
/// same way as camel case (`WowVegas` as `Wow Vegas`). No space is added
/// where one already precedes the letter.
fn split_camel_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() * 2);
    for c in s.chars() {
        if c.is_uppercase() && !out.is_empty() && !out.ends_with(char::is_whitespace) {
            out.push(' ');
        }
        out.push(c);
    }
    out.trim().to_string()
}

fn dedup(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in items {
        if !item.is_empty() && !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    mod canonical_operator_tests {
        use super::*;

        #[test]
        fn test_wowvegas_spellings() {
            assert_eq!(canonical_operator("wow vegas"), CanonicalOperator::WowVegas);
            assert_eq!(canonical_operator("WOWVEGAS"), CanonicalOperator::WowVegas);
            assert_eq!(canonical_operator("  WowVegas "), CanonicalOperator::WowVegas);
        }

        #[test]
        fn test_dotcom_family() {
            assert_eq!(canonical_operator(".com"), CanonicalOperator::DotCom);
            assert_eq!(canonical_operator("DotCom"), CanonicalOperator::DotCom);
            assert_eq!(canonical_operator("Dot Com"), CanonicalOperator::DotCom);
            assert_eq!(canonical_operator(".COM Currency"), CanonicalOperator::DotCom);
        }

        #[test]
        fn test_unrecognized_passthrough() {
            let op = canonical_operator("Foo");
            assert_eq!(op, CanonicalOperator::Other("Foo".into()));
            assert_eq!(op, "Foo");
            assert_eq!(op.to_string(), "Foo");
        }

        #[test]
        fn test_serde_uses_canonical_string() {
            let json = serde_json::to_string(&CanonicalOperator::DotCom).unwrap();
            assert_eq!(json, "\"DotCom\"");
            let back: CanonicalOperator = serde_json::from_str("\"wow vegas\"").unwrap();
            assert_eq!(back, CanonicalOperator::WowVegas);
        }
    }

    mod variant_tests {
        use super::*;

        #[test]
        fn test_operator_variants_tables() {
            assert_eq!(operator_variants("wowvegas"), vec!["WowVegas", "WOWVEGAS", "Wow Vegas"]);
            assert_eq!(operator_variants(".com")[0], ".COM Currency");
            assert_eq!(operator_variants(".com").len(), 7);
        }

        #[test]
        fn test_known_operator_values_order() {
            let values = known_operator_values();
            assert_eq!(values[0], "WowVegas");
            assert_eq!(values[3], ".COM Currency");
            assert_eq!(values.len(), 10);
        }

        #[test]
        fn test_text_variants_camel_case() {
            let v = text_variants("WowVegas");
            assert_eq!(
                v,
                vec![
                    "WowVegas",
                    "WOWVEGAS",
                    "wowvegas",
                    "Wowvegas",
                    "Wow Vegas",
                    "WOW VEGAS",
                    "wow vegas",
                    "Wow vegas"
                ]
            );
        }

        #[test]
        fn test_text_variants_currency_code() {
            assert_eq!(text_variants("SC"), vec!["SC", "sc", "Sc", "S C", "s c", "S c"]);
        }

        #[test]
        fn test_text_variants_spread_letters() {
            let v = text_variants("USD");
            assert!(v.contains(&"U S D".to_string()));
            assert!(v.contains(&"u s d".to_string()));
            assert_eq!(text_variants("usd"), vec!["usd", "USD", "Usd"]);
        }

        #[test]
        fn test_split_camel_case() {
            assert_eq!(split_camel_case("WowVegas"), "Wow Vegas");
            assert_eq!(split_camel_case("SC"), "S C");
            assert_eq!(split_camel_case("Wow Vegas"), "Wow Vegas");
            assert_eq!(split_camel_case("wow"), "wow");
        }

        #[test]
        fn test_text_variants_dotcom_expansion() {
            let v = text_variants("dotcom");
            assert!(v.contains(&".COM".to_string()));
            assert!(v.contains(&".COM Currency".to_string()));
            assert!(v.contains(&"Dot Com".to_string()));
        }

        #[test]
        fn test_currency_variants_ocr_confusion() {
            assert_eq!(currency_variants("WOW"), vec!["WOW", "wow", "Wow", "W0W"]);
            assert_eq!(currency_variants("USD"), vec!["USD", "usd", "Usd"]);
        }

        #[test]
        fn test_capitalize() {
            assert_eq!(capitalize("eUR"), "Eur");
            assert_eq!(capitalize(""), "");
        }
    }

    proptest! {
        #[test]
        fn prop_variants_are_unique_and_start_with_input(s in "[A-Za-z]{1,12}") {
            for variants in [text_variants(&s), currency_variants(&s)] {
                prop_assert_eq!(&variants[0], &s);
                let mut seen = std::collections::HashSet::new();
                for v in &variants {
                    prop_assert!(seen.insert(v.clone()));
                }
            }
        }

        #[test]
        fn prop_canonical_operator_is_idempotent(s in "[A-Za-z .]{0,16}") {
            let once = canonical_operator(&s);
            prop_assert_eq!(canonical_operator(once.as_str()), once);
        }
    }
}
