use std::cmp::Ordering;

use rayon::prelude::*;

use crate::model::{Candidate, Match, ReferenceSet};
use crate::similarity::Scorer;

/// Finds the best canonical code for a listing's postal code.
///
/// Stateless per call: `best_match` only reads the reference set, so listings
/// can be matched in any order or in parallel with identical results.
#[derive(Debug, Clone, Copy)]
pub struct PostalMatcher<'a> {
    reference: &'a ReferenceSet,
    scorer: Scorer,
    threshold: f64,
}

impl<'a> PostalMatcher<'a> {
    pub fn new(reference: &'a ReferenceSet, scorer: Scorer, threshold: f64) -> Self {
        Self {
            reference,
            scorer,
            threshold,
        }
    }

    /// Highest-scoring canonical code at or above the threshold.
    ///
    /// Ties go to the lexicographically smallest code. A code present
    /// verbatim in the reference set always wins with score 1.0.
    pub fn best_match(&self, code: &str) -> Option<Match> {
        if code.is_empty() || self.reference.is_empty() {
            return None;
        }

        if self.reference.records.contains_key(code) {
            return Some(Match {
                canonical_code: code.to_string(),
                score: 1.0,
                exact: true,
            });
        }

        // BTreeMap keys iterate in ascending order; strict `>` keeps the
        // first (smallest) code among equal scores.
        let mut best: Option<(&str, f64)> = None;
        for candidate in self.reference.records.keys() {
            let score = self.scorer.score(code, candidate);
            if best.map_or(true, |(_, b)| score > b) {
                best = Some((candidate, score));
            }
        }

        best.filter(|(_, score)| *score >= self.threshold)
            .map(|(canonical_code, score)| Match {
                canonical_code: canonical_code.to_string(),
                score,
                exact: false,
            })
    }

    /// Match a batch of normalized codes, preserving input order.
    pub fn match_all(&self, codes: &[String]) -> Vec<Option<Match>> {
        codes.par_iter().map(|code| self.best_match(code)).collect()
    }

    /// Top `limit` candidates, best first, for explaining a decision.
    pub fn rank(&self, code: &str, limit: usize) -> Vec<Candidate> {
        if code.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(bool, f64, &str)> = self
            .reference
            .records
            .keys()
            .map(|candidate| {
                let exact = candidate == code;
                let score = if exact { 1.0 } else { self.scorer.score(code, candidate) };
                (exact, score, candidate.as_str())
            })
            .collect();

        scored.sort_by(|a, b| {
            b.0.cmp(&a.0)
                .then_with(|| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal))
                .then_with(|| a.2.cmp(b.2))
        });

        scored
            .into_iter()
            .take(limit)
            .map(|(_, score, canonical_code)| Candidate {
                canonical_code: canonical_code.to_string(),
                score,
                accepted: score >= self.threshold,
            })
            .collect()
    }
}
