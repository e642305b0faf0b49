use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// A single listing row. Everything except the postal field is opaque to the
/// matcher.
#[derive(Debug, Clone)]
pub struct ListingRow {
    pub record_id: String,
    pub postal_raw: String,
    pub price: Option<f64>,
    pub area: Option<f64>,
    pub fields: BTreeMap<String, String>,
}

/// A reference (demographic) row keyed by its canonical postal code.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceRecord {
    pub canonical_code: String,
    pub fields: BTreeMap<String, String>,
}

/// Canonical code -> record. Ordered so candidate iteration is lexicographic.
#[derive(Debug, Clone, Default)]
pub struct ReferenceSet {
    pub records: BTreeMap<String, ReferenceRecord>,
    /// Reference column order, for stable output.
    pub headers: Vec<String>,
    /// Column holding the postal code, excluded from merged output.
    pub postal_column: String,
}

impl ReferenceSet {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, code: &str) -> Option<&ReferenceRecord> {
        self.records.get(code)
    }
}

/// Pre-loaded listings with their column order.
#[derive(Debug, Clone, Default)]
pub struct ListingSet {
    pub rows: Vec<ListingRow>,
    pub headers: Vec<String>,
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// A listing's accepted reference code. Only built when
/// `score >= threshold`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub canonical_code: String,
    pub score: f64,
    pub exact: bool,
}

/// One scored candidate, for explaining a lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub canonical_code: String,
    pub score: f64,
    pub accepted: bool,
}

// ---------------------------------------------------------------------------
// Merge output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct MergedRow {
    pub record_id: String,
    pub postal_raw: String,
    pub postal_normalized: String,
    #[serde(rename = "match")]
    pub matched: Option<Match>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_per_area: Option<f64>,
    pub listing: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<BTreeMap<String, String>>,
}

impl MergedRow {
    pub fn matched_code(&self) -> Option<&str> {
        self.matched.as_ref().map(|m| m.canonical_code.as_str())
    }
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct CodeRollup {
    pub canonical_code: String,
    pub listings: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_price_per_area: Option<f64>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub categories: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JoinSummary {
    pub total_listings: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub exact_matches: usize,
    pub match_rate: f64,
    pub filtered_rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_price_per_area: Option<f64>,
    pub averages: BTreeMap<String, Option<f64>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JoinMeta {
    pub job_name: String,
    pub engine_version: String,
    pub run_at: String,
    pub scorer: String,
    pub threshold: f64,
    pub listings_fingerprint: String,
    pub reference_fingerprint: String,
    pub reference_codes: usize,
    pub cache_hit: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct JoinResult {
    pub meta: JoinMeta,
    pub summary: JoinSummary,
    pub rollup: Vec<CodeRollup>,
    pub rows: Vec<MergedRow>,
}
