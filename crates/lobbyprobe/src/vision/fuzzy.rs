//! Weighted-ratio string similarity on a 0-100 scale.
//!
//! Both strings are lower-cased and reduced to alphanumeric tokens. The
//! score is the best of a plain ratio, a token-sort ratio and, when the
//! lengths differ a lot, a down-weighted partial ratio that aligns the
//! shorter string inside the longer one. Ratios are normalized Levenshtein
//! similarities from `strsim`.

/// Length ratio at which partial alignment is considered
const PARTIAL_THRESHOLD: f64 = 1.5;

/// Length ratio above which partial scores are weighted down harder
const LONG_PARTIAL_THRESHOLD: f64 = 8.0;

const PARTIAL_SCALE: f64 = 0.9;
const LONG_PARTIAL_SCALE: f64 = 0.6;
const TOKEN_SCALE: f64 = 0.95;

/// Similarity of `a` and `b` in `0..=100`
#[must_use]
pub fn weighted_ratio(a: &str, b: &str) -> u8 {
    let a = preprocess(a);
    let b = preprocess(b);
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let mut best = ratio(&a, &b);
    best = best.max(ratio(&token_sort(&a), &token_sort(&b)) * TOKEN_SCALE);

    let la = a.chars().count() as f64;
    let lb = b.chars().count() as f64;
    let len_ratio = la.max(lb) / la.min(lb);
    if len_ratio >= PARTIAL_THRESHOLD {
        let scale = if len_ratio < LONG_PARTIAL_THRESHOLD {
            PARTIAL_SCALE
        } else {
            LONG_PARTIAL_SCALE
        };
        let (short, long) = if la <= lb { (&a, &b) } else { (&b, &a) };
        best = best.max(partial_ratio(short, long) * scale);
    }

    best.round().clamp(0.0, 100.0) as u8
}

/// Plain normalized similarity in `0.0..=100.0`
#[must_use]
pub fn ratio(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b) * 100.0
}

/// Best ratio of `short` against every equally long window of `long`
fn partial_ratio(short: &str, long: &str) -> f64 {
    let short_len = short.chars().count();
    let chars: Vec<char> = long.chars().collect();
    if short_len == 0 || chars.len() < short_len {
        return ratio(short, long);
    }
    chars
        .windows(short_len)
        .map(|w| ratio(short, &w.iter().collect::<String>()))
        .fold(0.0, f64::max)
}

fn token_sort(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

fn preprocess(s: &str) -> String {
    let cleaned: String = s
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .to_lowercase();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_after_case_folding() {
        assert_eq!(weighted_ratio("WowVegas", "WOWVEGAS"), 100);
        assert_eq!(weighted_ratio(".COM", "com"), 100);
    }

    #[test]
    fn test_single_substitution() {
        assert_eq!(weighted_ratio("Operator", "0perator"), 88);
    }

    #[test]
    fn test_token_order_ignored() {
        assert_eq!(weighted_ratio("Game Campaign", "Campaign Game"), 95);
    }

    #[test]
    fn test_partial_alignment() {
        assert_eq!(weighted_ratio("Cancel", "Cancel Free Game Campaign"), 90);
    }

    #[test]
    fn test_unrelated_strings_score_low() {
        assert!(weighted_ratio("Lobby", "USD") < 40);
    }

    #[test]
    fn test_empty_scores_zero() {
        assert_eq!(weighted_ratio("", "USD"), 0);
        assert_eq!(weighted_ratio("...", "USD"), 0);
    }

    #[test]
    fn test_symmetric() {
        assert_eq!(
            weighted_ratio("Select a game", "Select a Game!"),
            weighted_ratio("Select a Game!", "Select a game")
        );
    }
}
