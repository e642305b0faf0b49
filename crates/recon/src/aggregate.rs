use std::collections::BTreeMap;

use crate::model::{CodeRollup, MergedRow};

#[derive(Default)]
struct Accum {
    listings: usize,
    prices: Vec<f64>,
    per_area: Vec<f64>,
    categories: BTreeMap<String, usize>,
}

/// Group matched rows by canonical code: listing count, price spread, and
/// counts of an optional categorical reference column. Unmatched rows are
/// not part of any group.
pub fn rollup_by_code(rows: &[MergedRow], category: Option<&str>) -> Vec<CodeRollup> {
    let mut groups: BTreeMap<&str, Accum> = BTreeMap::new();

    for row in rows {
        let Some(code) = row.matched_code() else {
            continue;
        };
        let entry = groups.entry(code).or_default();
        entry.listings += 1;
        if let Some(price) = row.price {
            entry.prices.push(price);
        }
        if let Some(ppa) = row.price_per_area {
            entry.per_area.push(ppa);
        }
        if let (Some(column), Some(reference)) = (category, &row.reference) {
            if let Some(value) = reference.get(column) {
                let value = value.trim();
                if !value.is_empty() {
                    *entry.categories.entry(value.to_string()).or_insert(0) += 1;
                }
            }
        }
    }

    groups
        .into_iter()
        .map(|(code, acc)| CodeRollup {
            canonical_code: code.to_string(),
            listings: acc.listings,
            avg_price: mean(&acc.prices),
            min_price: acc.prices.iter().copied().reduce(f64::min),
            max_price: acc.prices.iter().copied().reduce(f64::max),
            avg_price_per_area: mean(&acc.per_area),
            categories: acc.categories,
        })
        .collect()
}

pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Match;
    use std::collections::BTreeMap;

    fn row(code: Option<&str>, price: Option<f64>, crime: &str) -> MergedRow {
        MergedRow {
            record_id: "r".into(),
            postal_raw: String::new(),
            postal_normalized: String::new(),
            matched: code.map(|c| Match {
                canonical_code: c.into(),
                score: 0.9,
                exact: false,
            }),
            price,
            area: None,
            price_per_area: price.map(|p| p / 1000.0),
            listing: BTreeMap::new(),
            reference: code.map(|_| BTreeMap::from([("crime_index".to_string(), crime.to_string())])),
        }
    }

    #[test]
    fn groups_by_code_in_order() {
        let rows = vec![
            row(Some("32599"), Some(300_000.0), "High"),
            row(Some("32501"), Some(100_000.0), "Low"),
            row(Some("32501"), Some(200_000.0), "Low"),
            row(None, Some(999_999.0), ""),
        ];
        let rollup = rollup_by_code(&rows, Some("crime_index"));
        assert_eq!(rollup.len(), 2);
        assert_eq!(rollup[0].canonical_code, "32501");
        assert_eq!(rollup[0].listings, 2);
        assert_eq!(rollup[0].avg_price, Some(150_000.0));
        assert_eq!(rollup[0].min_price, Some(100_000.0));
        assert_eq!(rollup[0].max_price, Some(200_000.0));
        assert_eq!(rollup[0].avg_price_per_area, Some(150.0));
        assert_eq!(rollup[0].categories.get("Low"), Some(&2));
        assert_eq!(rollup[1].canonical_code, "32599");
        assert_eq!(rollup[1].categories.get("High"), Some(&1));
    }

    #[test]
    fn missing_prices_leave_stats_empty() {
        let rows = vec![row(Some("10001"), None, "Medium")];
        let rollup = rollup_by_code(&rows, None);
        assert_eq!(rollup[0].listings, 1);
        assert!(rollup[0].avg_price.is_none());
        assert!(rollup[0].min_price.is_none());
        assert!(rollup[0].categories.is_empty());
    }

    #[test]
    fn mean_of_nothing_is_none() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[1.0, 2.0, 3.0]), Some(2.0));
    }
}
