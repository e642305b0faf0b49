use std::collections::BTreeMap;

use crate::aggregate::mean;
use crate::model::{JoinSummary, Match, MergedRow};
use crate::normalize::parse_number;

/// Match statistics over every listing, KPIs over the rows that survived
/// the filter.
pub fn compute_summary(
    matches: &[Option<Match>],
    filtered: &[MergedRow],
    averages: &[String],
) -> JoinSummary {
    let total_listings = matches.len();
    let matched = matches.iter().filter(|m| m.is_some()).count();
    let exact_matches = matches
        .iter()
        .filter(|m| m.as_ref().is_some_and(|m| m.exact))
        .count();
    let match_rate = if total_listings == 0 {
        0.0
    } else {
        matched as f64 / total_listings as f64
    };

    let prices: Vec<f64> = filtered.iter().filter_map(|r| r.price).collect();
    let per_area: Vec<f64> = filtered.iter().filter_map(|r| r.price_per_area).collect();

    let averages: BTreeMap<String, Option<f64>> = averages
        .iter()
        .map(|column| {
            let values: Vec<f64> = filtered
                .iter()
                .filter_map(|r| r.reference.as_ref()?.get(column))
                .filter_map(|v| parse_number(v))
                .collect();
            (column.clone(), mean(&values))
        })
        .collect();

    JoinSummary {
        total_listings,
        matched,
        unmatched: total_listings - matched,
        exact_matches,
        match_rate,
        filtered_rows: filtered.len(),
        avg_price: mean(&prices),
        avg_price_per_area: mean(&per_area),
        averages,
    }
}
