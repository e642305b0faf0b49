use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use proptest::prelude::*;

use zipjoin_recon::config::JoinConfig;
use zipjoin_recon::engine::{load_listings, load_reference, run, JoinInput};
use zipjoin_recon::model::{ReferenceRecord, ReferenceSet};
use zipjoin_recon::{MatchCache, PostalMatcher, Scorer};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn fixture_toml() -> String {
    std::fs::read_to_string(fixtures_dir().join("job.zipjoin.toml")).unwrap()
}

fn load(config: &JoinConfig) -> JoinInput {
    let dir = fixtures_dir();
    let read = |file: &str| {
        let path = dir.join(file);
        std::fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()))
    };
    JoinInput {
        listings: load_listings(&read(&config.listings.file), &config.listings).unwrap(),
        reference: load_reference(&read(&config.reference.file), &config.reference).unwrap(),
    }
}

fn load_and_run(config_toml: &str) -> zipjoin_recon::JoinResult {
    let config = JoinConfig::from_toml(config_toml).unwrap();
    let input = load(&config);
    run(&config, &input, None).unwrap()
}

fn reference_of(codes: &[String]) -> ReferenceSet {
    let records: BTreeMap<String, ReferenceRecord> = codes
        .iter()
        .map(|c| {
            (
                c.clone(),
                ReferenceRecord {
                    canonical_code: c.clone(),
                    fields: BTreeMap::new(),
                },
            )
        })
        .collect();
    ReferenceSet {
        records,
        headers: vec!["zip_code".into()],
        postal_column: "zip_code".into(),
    }
}

// -------------------------------------------------------------------------
// Fixture joins
// -------------------------------------------------------------------------

#[test]
fn left_join_tags_unmatched_listings() {
    let result = load_and_run(&fixture_toml());

    assert_eq!(result.meta.job_name, "Fixture Job");
    assert_eq!(result.meta.scorer, "partial_ratio");
    assert_eq!(result.meta.reference_codes, 5);
    assert_eq!(result.summary.total_listings, 7);
    assert_eq!(result.summary.matched, 5);
    assert_eq!(result.summary.unmatched, 2);
    assert_eq!(result.summary.exact_matches, 3);
    assert_eq!(result.rows.len(), 7);

    let by_id: HashMap<&str, _> = result
        .rows
        .iter()
        .map(|r| (r.record_id.as_str(), r))
        .collect();

    assert_eq!(by_id["L100"].matched_code(), Some("32501"));
    assert_eq!(by_id["L100"].price_per_area, Some(175.0));
    assert_eq!(by_id["L101"].matched_code(), Some("32501"));
    assert_eq!(by_id["L103"].matched_code(), Some("32502"));
    assert_eq!(by_id["L104"].matched_code(), Some("02134"));
    assert!(!by_id["L104"].matched.as_ref().unwrap().exact);

    for id in ["L105", "L106"] {
        let row = by_id[id];
        assert!(row.matched.is_none(), "{id} should be unmatched");
        assert!(row.reference.is_none());
        assert!(row.listing.contains_key("raw_address"));
    }
}

#[test]
fn truncated_code_joins_demographics() {
    let result = load_and_run(&fixture_toml());
    let row = result.rows.iter().find(|r| r.record_id == "L101").unwrap();
    assert_eq!(row.postal_normalized, "325");
    let m = row.matched.as_ref().unwrap();
    assert_eq!(m.score, 1.0);
    assert_eq!(row.reference.as_ref().unwrap()["crime_index"], "High");
}

#[test]
fn inner_join_matches_dashboard_behaviour() {
    let toml = format!("join = \"inner\"\n{}", fixture_toml());
    let result = load_and_run(&toml);
    assert_eq!(result.rows.len(), 5);
    assert_eq!(result.summary.total_listings, 7);
    assert_eq!(result.summary.averages["school_rating"], Some(6.6));
}

#[test]
fn rollup_groups_matched_codes() {
    let result = load_and_run(&fixture_toml());
    let codes: Vec<&str> = result
        .rollup
        .iter()
        .map(|r| r.canonical_code.as_str())
        .collect();
    assert_eq!(codes, vec!["02134", "32501", "32502", "32599"]);

    let pensacola = &result.rollup[1];
    assert_eq!(pensacola.listings, 2);
    assert_eq!(pensacola.avg_price, Some(317_000.0));
    assert_eq!(pensacola.categories.get("High"), Some(&2));
}

#[test]
fn config_filter_limits_rows() {
    let toml = format!(
        "{}\n[filter]\npostal_codes = [\"32501\", \"2134\"]\nmax_price = 400000\n",
        fixture_toml()
    );
    let result = load_and_run(&toml);
    let ids: Vec<&str> = result.rows.iter().map(|r| r.record_id.as_str()).collect();
    assert_eq!(ids, vec!["L100", "L101"]);
    assert_eq!(result.summary.filtered_rows, 2);
    assert_eq!(result.summary.matched, 5);
}

#[test]
fn threshold_one_only_accepts_full_scores() {
    let toml = format!("{}\n[matching]\nscorer = \"ratio\"\nthreshold = 1.0\n", fixture_toml());
    let result = load_and_run(&toml);
    // Only verbatim codes survive plain ratio at 1.0
    assert_eq!(result.summary.matched, 3);
    assert_eq!(result.summary.exact_matches, 3);
}

#[test]
fn repeated_runs_are_identical() {
    let toml = fixture_toml();
    let a = load_and_run(&toml);
    let b = load_and_run(&toml);
    let matches = |r: &zipjoin_recon::JoinResult| {
        r.rows
            .iter()
            .map(|row| (row.record_id.clone(), row.matched.clone()))
            .collect::<Vec<_>>()
    };
    assert_eq!(matches(&a), matches(&b));
    assert_eq!(a.meta.listings_fingerprint, b.meta.listings_fingerprint);
    assert_eq!(a.meta.reference_fingerprint, b.meta.reference_fingerprint);
}

#[test]
fn persisted_cache_is_reused() {
    let config = JoinConfig::from_toml(&fixture_toml()).unwrap();
    let input = load(&config);

    let mut cache = MatchCache::default();
    let first = run(&config, &input, Some(&mut cache)).unwrap();
    assert!(!first.meta.cache_hit);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("matches.cache.json");
    std::fs::write(&path, cache.to_json().unwrap()).unwrap();

    let mut restored = MatchCache::from_json(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let second = run(&config, &input, Some(&mut restored)).unwrap();
    assert!(second.meta.cache_hit);
    assert_eq!(second.summary.matched, first.summary.matched);

    restored.invalidate_reference(&second.meta.reference_fingerprint);
    let third = run(&config, &input, Some(&mut restored)).unwrap();
    assert!(!third.meta.cache_hit);
}

// -------------------------------------------------------------------------
// Properties
// -------------------------------------------------------------------------

fn zip() -> impl Strategy<Value = String> {
    "[0-9]{5}"
}

fn scorer() -> impl Strategy<Value = Scorer> {
    prop_oneof![
        Just(Scorer::PartialRatio),
        Just(Scorer::Ratio),
        Just(Scorer::Levenshtein),
        Just(Scorer::JaroWinkler),
    ]
}

proptest! {
    #[test]
    fn identical_code_always_matches_itself(
        codes in prop::collection::btree_set(zip(), 1..20),
        pick in any::<prop::sample::Index>(),
        scorer in scorer(),
        threshold in 0.0f64..=1.0,
    ) {
        let codes: Vec<String> = codes.into_iter().collect();
        let target = pick.get(&codes).clone();
        let refs = reference_of(&codes);
        let matcher = PostalMatcher::new(&refs, scorer, threshold);
        let m = matcher.best_match(&target).unwrap();
        prop_assert_eq!(m.canonical_code, target);
        prop_assert_eq!(m.score, 1.0);
    }

    #[test]
    fn match_exists_iff_best_score_clears_threshold(
        codes in prop::collection::btree_set(zip(), 0..20),
        probe in "[0-9X]{1,6}",
        scorer in scorer(),
        threshold in 0.0f64..=1.0,
    ) {
        let codes: Vec<String> = codes.into_iter().collect();
        let refs = reference_of(&codes);
        let matcher = PostalMatcher::new(&refs, scorer, threshold);
        let best = codes
            .iter()
            .map(|c| if *c == probe { 1.0 } else { scorer.score(&probe, c) })
            .fold(None, |acc: Option<f64>, s| Some(acc.map_or(s, |a| a.max(s))));

        match matcher.best_match(&probe) {
            Some(m) => {
                prop_assert!(m.score >= threshold);
                prop_assert_eq!(Some(m.score), best);
            }
            None => prop_assert!(best.map_or(true, |b| b < threshold)),
        }
    }

    #[test]
    fn parallel_batch_equals_sequential(
        codes in prop::collection::btree_set(zip(), 0..15),
        probes in prop::collection::vec("[0-9]{0,6}", 0..40),
        scorer in scorer(),
    ) {
        let codes: Vec<String> = codes.into_iter().collect();
        let refs = reference_of(&codes);
        let matcher = PostalMatcher::new(&refs, scorer, 0.8);
        let sequential: Vec<_> = probes.iter().map(|p| matcher.best_match(p)).collect();
        prop_assert_eq!(matcher.match_all(&probes), sequential);
    }

    #[test]
    fn scores_stay_in_unit_interval(a in "[0-9A-Z ]{0,8}", b in "[0-9A-Z ]{0,8}", scorer in scorer()) {
        let s = scorer.score(&a, &b);
        prop_assert!((0.0..=1.0).contains(&s), "{scorer}: {s}");
    }
}
