use std::collections::BTreeSet;

use crate::config::FilterConfig;
use crate::model::MergedRow;
use crate::normalize::canonical_code;

/// Row selection applied after the merge: a set of matched postal codes and
/// an inclusive price range.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingFilter {
    pub postal_codes: Option<BTreeSet<String>>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

impl ListingFilter {
    /// Build from config. Codes are canonicalized the same way as reference
    /// codes, so `postal_codes = ["2134"]` selects `02134`.
    pub fn from_config(config: &FilterConfig, pad_width: usize) -> Self {
        Self {
            postal_codes: config.postal_codes.as_ref().map(|codes| {
                codes
                    .iter()
                    .map(|c| canonical_code(c, pad_width))
                    .collect()
            }),
            min_price: config.min_price,
            max_price: config.max_price,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.postal_codes.is_none() && self.min_price.is_none() && self.max_price.is_none()
    }

    pub fn accepts(&self, row: &MergedRow) -> bool {
        if let Some(ref codes) = self.postal_codes {
            match row.matched_code() {
                Some(code) if codes.contains(code) => {}
                _ => return false,
            }
        }

        if self.min_price.is_none() && self.max_price.is_none() {
            return true;
        }

        let Some(price) = row.price else {
            return false;
        };
        if let Some(min) = self.min_price {
            if price < min {
                return false;
            }
        }
        if let Some(max) = self.max_price {
            if price > max {
                return false;
            }
        }
        true
    }

    pub fn apply(&self, rows: Vec<MergedRow>) -> Vec<MergedRow> {
        if self.is_empty() {
            return rows;
        }
        rows.into_iter().filter(|r| self.accepts(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Match;
    use std::collections::BTreeMap;

    fn row(code: Option<&str>, price: Option<f64>) -> MergedRow {
        MergedRow {
            record_id: "1".into(),
            postal_raw: code.unwrap_or("").into(),
            postal_normalized: code.unwrap_or("").into(),
            matched: code.map(|c| Match {
                canonical_code: c.into(),
                score: 1.0,
                exact: true,
            }),
            price,
            area: None,
            price_per_area: None,
            listing: BTreeMap::new(),
            reference: None,
        }
    }

    #[test]
    fn empty_filter_keeps_everything() {
        let filter = ListingFilter::default();
        assert!(filter.is_empty());
        assert!(filter.accepts(&row(None, None)));
        assert_eq!(filter.apply(vec![row(None, None), row(Some("1"), None)]).len(), 2);
    }

    #[test]
    fn code_filter_excludes_unmatched() {
        let filter = ListingFilter {
            postal_codes: Some(BTreeSet::from(["32501".to_string()])),
            ..Default::default()
        };
        assert!(filter.accepts(&row(Some("32501"), None)));
        assert!(!filter.accepts(&row(Some("32599"), None)));
        assert!(!filter.accepts(&row(None, None)));
    }

    #[test]
    fn price_range_is_inclusive() {
        let filter = ListingFilter {
            min_price: Some(100.0),
            max_price: Some(200.0),
            ..Default::default()
        };
        assert!(filter.accepts(&row(None, Some(100.0))));
        assert!(filter.accepts(&row(None, Some(200.0))));
        assert!(!filter.accepts(&row(None, Some(99.99))));
        assert!(!filter.accepts(&row(None, Some(200.01))));
        assert!(!filter.accepts(&row(None, None)));
    }

    #[test]
    fn from_config_canonicalizes_codes() {
        let config = FilterConfig {
            postal_codes: Some(vec!["2134".into()]),
            min_price: None,
            max_price: Some(5.0),
        };
        let filter = ListingFilter::from_config(&config, 5);
        assert!(filter.postal_codes.unwrap().contains("02134"));
        assert_eq!(filter.max_price, Some(5.0));
    }
}
