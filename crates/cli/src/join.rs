//! `zipjoin run` / `zipjoin validate` — config-driven listings join.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use zipjoin_recon::engine::{load_listings, load_reference};
use zipjoin_recon::normalize::canonical_code;
use zipjoin_recon::{JoinConfig, JoinInput, ListingFilter, MatchCache};

use crate::exit_codes::EXIT_UNMATCHED;
use crate::export::write_merged_csv;
use crate::CliError;

pub struct RunArgs {
    pub config: PathBuf,
    pub json: bool,
    pub output: Option<PathBuf>,
    pub csv: Option<PathBuf>,
    pub codes: Vec<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub cache_file: Option<PathBuf>,
    pub strict: bool,
    pub quiet: bool,
}

fn read_config(path: &Path) -> Result<JoinConfig, CliError> {
    let config_str = std::fs::read_to_string(path).map_err(|e| {
        CliError::runtime(format!("cannot read config {}: {e}", path.display()))
    })?;
    JoinConfig::from_toml(&config_str).map_err(|e| CliError::config(e.to_string()))
}

fn read_input(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path)
        .map_err(|e| CliError::runtime(format!("cannot read {}: {e}", path.display())))
}

/// Config filter, with any CLI flags taking precedence per field.
fn resolve_filter(config: &JoinConfig, args: &RunArgs) -> Result<ListingFilter, CliError> {
    let pad_width = config.reference.pad_width;
    let mut filter = ListingFilter::from_config(&config.filter, pad_width);

    if !args.codes.is_empty() {
        let codes: BTreeSet<String> = args
            .codes
            .iter()
            .flat_map(|c| c.split(','))
            .map(|c| canonical_code(c, pad_width))
            .filter(|c| !c.is_empty())
            .collect();
        if codes.is_empty() {
            return Err(CliError::args("--code given without any postal code"));
        }
        filter.postal_codes = Some(codes);
    }

    for (flag, bound) in [("--min-price", args.min_price), ("--max-price", args.max_price)] {
        if let Some(v) = bound.filter(|v| !v.is_finite()) {
            return Err(CliError::args(format!("{flag} must be a finite number, got {v}")));
        }
    }
    if args.min_price.is_some() {
        filter.min_price = args.min_price;
    }
    if args.max_price.is_some() {
        filter.max_price = args.max_price;
    }

    if let (Some(min), Some(max)) = (filter.min_price, filter.max_price) {
        if min > max {
            return Err(CliError::args(format!(
                "min price ({min}) is greater than max price ({max})"
            )));
        }
    }

    Ok(filter)
}

/// A missing or unreadable cache file starts an empty cache; it never fails
/// the run.
fn load_cache(path: &Path) -> MatchCache {
    match std::fs::read_to_string(path) {
        Ok(text) => match MatchCache::from_json(&text) {
            Ok(cache) => {
                log::debug!("loaded {} cached match set(s) from {}", cache.len(), path.display());
                cache
            }
            Err(e) => {
                log::warn!("ignoring cache {}: {e}", path.display());
                MatchCache::default()
            }
        },
        Err(_) => MatchCache::default(),
    }
}

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let config = read_config(&args.config)?;

    // Resolve file paths relative to config file's directory
    let base_dir = args
        .config
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();

    let listings_path = base_dir.join(&config.listings.file);
    let reference_path = base_dir.join(&config.reference.file);

    let listings = load_listings(&read_input(&listings_path)?, &config.listings)
        .map_err(|e| CliError::runtime(format!("{}: {e}", listings_path.display())))?;
    let reference = load_reference(&read_input(&reference_path)?, &config.reference)
        .map_err(|e| CliError::runtime(format!("{}: {e}", reference_path.display())))?;

    log::info!(
        "loaded {} listings, {} reference codes",
        listings.rows.len(),
        reference.len()
    );

    let input = JoinInput { listings, reference };
    let filter = resolve_filter(&config, &args)?;

    let mut cache = args.cache_file.as_deref().map(load_cache);

    let result = zipjoin_recon::run_with_filter(&config, &input, &filter, cache.as_mut())
        .map_err(|e| CliError::runtime(e.to_string()))?;

    if let (Some(path), Some(cache)) = (&args.cache_file, &cache) {
        let text = cache
            .to_json()
            .map_err(|e| CliError::internal(e.to_string()))?;
        std::fs::write(path, text).map_err(|e| {
            CliError::runtime(format!("cannot write cache {}: {e}", path.display()))
        })?;
    }

    // Output
    let json_str = serde_json::to_string_pretty(&result)
        .map_err(|e| CliError::internal(format!("JSON serialization error: {e}")))?;

    let json_path = args
        .output
        .clone()
        .or_else(|| config.output.json.as_ref().map(|p| base_dir.join(p)));
    if let Some(ref path) = json_path {
        std::fs::write(path, &json_str).map_err(|e| {
            CliError::runtime(format!("cannot write output {}: {e}", path.display()))
        })?;
        if !args.quiet {
            eprintln!("wrote {}", path.display());
        }
    }

    let csv_path = args
        .csv
        .clone()
        .or_else(|| config.output.csv.as_ref().map(|p| base_dir.join(p)));
    if let Some(ref path) = csv_path {
        let file = std::fs::File::create(path).map_err(|e| {
            CliError::runtime(format!("cannot create {}: {e}", path.display()))
        })?;
        write_merged_csv(&result.rows, &input.listings.headers, &input.reference, file)
            .map_err(|e| CliError::runtime(format!("cannot write {}: {e}", path.display())))?;
        if !args.quiet {
            eprintln!("wrote {}", path.display());
        }
    }

    if args.json {
        println!("{json_str}");
    }

    let s = &result.summary;
    if !args.quiet {
        eprintln!(
            "'{}': {} listings, {} matched ({} exact), {} unmatched, match rate {:.1}%{}",
            result.meta.job_name,
            s.total_listings,
            s.matched,
            s.exact_matches,
            s.unmatched,
            s.match_rate * 100.0,
            if result.meta.cache_hit { " [cached]" } else { "" },
        );
        if !filter.is_empty() {
            eprintln!("filter: {} row(s) selected", s.filtered_rows);
        }
        if let Some(avg) = s.avg_price {
            eprintln!("avg price: {avg:.0}");
        }
        if let Some(avg) = s.avg_price_per_area {
            eprintln!("avg price per area: {avg:.2}");
        }
        for (column, avg) in &s.averages {
            match avg {
                Some(v) => eprintln!("avg {column}: {v:.1}"),
                None => eprintln!("avg {column}: n/a"),
            }
        }
    }

    if args.strict && s.unmatched > 0 {
        return Err(CliError {
            code: EXIT_UNMATCHED,
            message: format!("{} listing(s) unmatched", s.unmatched),
            hint: Some("lower [matching].threshold or inspect codes with `zipjoin lookup`".into()),
        });
    }

    Ok(())
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = read_config(&config_path)?;
    eprintln!(
        "valid: '{}' ({} join, {} scorer, threshold {})",
        config.name, config.join, config.matching.scorer, config.matching.threshold,
    );
    Ok(())
}
