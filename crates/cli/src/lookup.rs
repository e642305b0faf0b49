//! `zipjoin lookup` — score one postal code against a reference file.

use std::path::PathBuf;

use clap::ValueEnum;
use serde::Serialize;

use zipjoin_recon::config::{ReferenceColumns, ReferenceConfig};
use zipjoin_recon::engine::load_reference;
use zipjoin_recon::model::{Candidate, Match};
use zipjoin_recon::normalize::{listing_key, ListingKey};
use zipjoin_recon::{PostalMatcher, Scorer};

use crate::exit_codes::EXIT_UNMATCHED;
use crate::CliError;

#[derive(Clone, Copy, ValueEnum)]
pub enum ScorerArg {
    PartialRatio,
    Ratio,
    Levenshtein,
    JaroWinkler,
}

impl From<ScorerArg> for Scorer {
    fn from(arg: ScorerArg) -> Self {
        match arg {
            ScorerArg::PartialRatio => Scorer::PartialRatio,
            ScorerArg::Ratio => Scorer::Ratio,
            ScorerArg::Levenshtein => Scorer::Levenshtein,
            ScorerArg::JaroWinkler => Scorer::JaroWinkler,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum KeyArg {
    DigitPrefix,
    Digits,
    Trim,
    None,
}

impl From<KeyArg> for ListingKey {
    fn from(arg: KeyArg) -> Self {
        match arg {
            KeyArg::DigitPrefix => ListingKey::DigitPrefix,
            KeyArg::Digits => ListingKey::Digits,
            KeyArg::Trim => ListingKey::Trim,
            KeyArg::None => ListingKey::None,
        }
    }
}

pub struct LookupArgs {
    pub code: String,
    pub reference: PathBuf,
    pub column: String,
    pub pad_width: usize,
    pub scorer: ScorerArg,
    pub threshold: f64,
    pub key: KeyArg,
    pub top: usize,
    pub json: bool,
}

#[derive(Serialize)]
struct LookupReport {
    input: String,
    normalized: String,
    scorer: String,
    threshold: f64,
    #[serde(rename = "match")]
    matched: Option<Match>,
    candidates: Vec<Candidate>,
}

pub fn cmd_lookup(args: LookupArgs) -> Result<(), CliError> {
    if !(0.0..=1.0).contains(&args.threshold) {
        return Err(CliError::args(format!(
            "--threshold must be between 0 and 1, got {}",
            args.threshold
        )));
    }

    let config = ReferenceConfig {
        file: args.reference.display().to_string(),
        pad_width: args.pad_width,
        columns: ReferenceColumns {
            postal_code: args.column.clone(),
        },
    };
    let data = std::fs::read_to_string(&args.reference).map_err(|e| {
        CliError::runtime(format!("cannot read {}: {e}", args.reference.display()))
    })?;
    let reference = load_reference(&data, &config).map_err(|e| {
        CliError::runtime(format!("{}: {e}", args.reference.display()))
            .with_hint("pick the postal column with --column")
    })?;

    let scorer = Scorer::from(args.scorer);
    let normalized = listing_key(&args.code, args.key.into());
    let matcher = PostalMatcher::new(&reference, scorer, args.threshold);

    let report = LookupReport {
        input: args.code.clone(),
        matched: matcher.best_match(&normalized),
        candidates: matcher.rank(&normalized, args.top),
        normalized,
        scorer: scorer.to_string(),
        threshold: args.threshold,
    };

    if args.json {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| CliError::internal(format!("JSON serialization error: {e}")))?;
        println!("{json}");
    } else {
        print_report(&report);
    }

    if report.matched.is_none() {
        return Err(CliError {
            code: EXIT_UNMATCHED,
            message: String::new(),
            hint: None,
        });
    }
    Ok(())
}

fn print_report(report: &LookupReport) {
    println!(
        "{:?} -> {:?} ({}, threshold {})",
        report.input, report.normalized, report.scorer, report.threshold
    );
    match &report.matched {
        Some(m) if m.exact => println!("match: {} (exact)", m.canonical_code),
        Some(m) => println!("match: {} ({:.4})", m.canonical_code, m.score),
        None => println!("match: none"),
    }
    if report.candidates.is_empty() {
        return;
    }
    println!();
    println!("  {:<12} {:>8}", "code", "score");
    for c in &report.candidates {
        println!(
            "  {:<12} {:>8.4}  {}",
            c.canonical_code,
            c.score,
            if c.accepted { "ok" } else { "" }
        );
    }
}
