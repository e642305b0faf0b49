//! Normalized string similarity in `[0, 1]`.
//!
//! Every scorer returns `1.0` for identical non-empty inputs and `0.0` when
//! either side is empty, so an empty listing code can never clear a
//! threshold.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scorer {
    /// Best `ratio` of the shorter string against any window of the longer
    /// one. Truncated codes (`"325"`) score 1.0 against `"32599"`.
    #[default]
    PartialRatio,
    /// Indel similarity: `2 * LCS / (|a| + |b|)`.
    Ratio,
    /// `1 - levenshtein / max(|a|, |b|)`.
    Levenshtein,
    /// Jaro-Winkler, favouring a shared prefix.
    JaroWinkler,
}

impl Scorer {
    pub fn score(&self, a: &str, b: &str) -> f64 {
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        match self {
            Self::PartialRatio => partial_ratio(a, b),
            Self::Ratio => ratio(a, b),
            Self::Levenshtein => strsim::normalized_levenshtein(a, b),
            Self::JaroWinkler => strsim::jaro_winkler(a, b),
        }
    }
}

impl std::fmt::Display for Scorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PartialRatio => write!(f, "partial_ratio"),
            Self::Ratio => write!(f, "ratio"),
            Self::Levenshtein => write!(f, "levenshtein"),
            Self::JaroWinkler => write!(f, "jaro_winkler"),
        }
    }
}

// ---------------------------------------------------------------------------
// Indel ratio
// ---------------------------------------------------------------------------

pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    ratio_chars(&a, &b)
}

fn ratio_chars(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 0.0;
    }
    (2 * lcs_len(a, b)) as f64 / total as f64
}

/// Longest common subsequence length, two-row DP.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut cur = vec![0usize; b.len() + 1];

    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            cur[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                cur[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut cur);
    }

    prev[b.len()]
}

// ---------------------------------------------------------------------------
// Partial ratio
// ---------------------------------------------------------------------------

/// Align the shorter string against every window of the longer one,
/// including the partial windows hanging off either end, and keep the best
/// `ratio`. Equal-length inputs are aligned both ways round, so
/// `"12345"` vs `"23456"` scores the shared `"2345"` at 8/9.
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.len() == b.len() {
        return aligned_ratio(&a, &b).max(aligned_ratio(&b, &a));
    }
    if a.len() < b.len() {
        aligned_ratio(&a, &b)
    } else {
        aligned_ratio(&b, &a)
    }
}

/// Best `ratio` of `short` over the windows of `long`. Requires
/// `short.len() <= long.len()`.
fn aligned_ratio(short: &[char], long: &[char]) -> f64 {
    if short.is_empty() {
        return 0.0;
    }

    let m = short.len();
    let n = long.len();
    let mut best = 0.0_f64;

    for start in 0..=(n - m) {
        best = best.max(ratio_chars(short, &long[start..start + m]));
        if best >= 1.0 {
            return 1.0;
        }
    }

    for k in 1..m {
        best = best.max(ratio_chars(short, &long[..k]));
        best = best.max(ratio_chars(short, &long[n - k..]));
    }

    best
}
