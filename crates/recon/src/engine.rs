use std::collections::{BTreeMap, HashMap};

use crate::aggregate::rollup_by_code;
use crate::cache::{
    listings_fingerprint, reference_fingerprint, settings_fingerprint, CacheKey, MatchCache,
};
use crate::config::{JoinConfig, JoinMode, ListingsConfig, ReferenceConfig};
use crate::error::ReconError;
use crate::filter::ListingFilter;
use crate::matcher::PostalMatcher;
use crate::model::{
    JoinMeta, JoinResult, ListingRow, ListingSet, Match, MergedRow, ReferenceRecord, ReferenceSet,
};
use crate::normalize::{canonical_code, listing_key, parse_number};
use crate::summary::compute_summary;

/// Both datasets, already loaded.
pub struct JoinInput {
    pub listings: ListingSet,
    pub reference: ReferenceSet,
}

/// Run the join with the filter from config.
pub fn run(
    config: &JoinConfig,
    input: &JoinInput,
    cache: Option<&mut MatchCache>,
) -> Result<JoinResult, ReconError> {
    let filter = ListingFilter::from_config(&config.filter, config.reference.pad_width);
    run_with_filter(config, input, &filter, cache)
}

/// Run the join: match every listing, merge, filter, summarize.
pub fn run_with_filter(
    config: &JoinConfig,
    input: &JoinInput,
    filter: &ListingFilter,
    cache: Option<&mut MatchCache>,
) -> Result<JoinResult, ReconError> {
    config.validate()?;

    let matching = &config.matching;
    let codes: Vec<String> = input
        .listings
        .rows
        .iter()
        .map(|row| listing_key(&row.postal_raw, matching.listing_key))
        .collect();

    let key = CacheKey {
        listings: listings_fingerprint(&codes),
        reference: reference_fingerprint(&input.reference),
        settings: settings_fingerprint(matching.scorer, matching.threshold),
    };

    let (matches, cache_hit) = match_with_cache(config, input, &codes, &key, cache);

    log::info!(
        "'{}': {} of {} listings matched against {} reference codes",
        config.name,
        matches.iter().filter(|m| m.is_some()).count(),
        matches.len(),
        input.reference.len(),
    );

    let merged = merge_rows(&input.listings.rows, &codes, &matches, &input.reference, config.join);
    let rows = filter.apply(merged);
    log::debug!("filter kept {} rows", rows.len());

    let summary = compute_summary(&matches, &rows, &config.summary.averages);
    let rollup = rollup_by_code(&rows, config.summary.category.as_deref());

    Ok(JoinResult {
        meta: JoinMeta {
            job_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            scorer: matching.scorer.to_string(),
            threshold: matching.threshold,
            listings_fingerprint: key.listings,
            reference_fingerprint: key.reference,
            reference_codes: input.reference.len(),
            cache_hit,
        },
        summary,
        rollup,
        rows,
    })
}

fn match_with_cache(
    config: &JoinConfig,
    input: &JoinInput,
    codes: &[String],
    key: &CacheKey,
    cache: Option<&mut MatchCache>,
) -> (Vec<Option<Match>>, bool) {
    if let Some(cached) = cache.as_ref().and_then(|c| c.get(key)) {
        if cached.len() == codes.len() {
            log::debug!("match cache hit ({} listings)", codes.len());
            return (cached.to_vec(), true);
        }
    }

    log::debug!("match cache miss, scoring {} listings", codes.len());
    let matcher = PostalMatcher::new(
        &input.reference,
        config.matching.scorer,
        config.matching.threshold,
    );
    let matches = matcher.match_all(codes);

    if let Some(cache) = cache {
        cache.insert(key.clone(), matches.clone());
    }
    (matches, false)
}

fn merge_rows(
    listings: &[ListingRow],
    codes: &[String],
    matches: &[Option<Match>],
    reference: &ReferenceSet,
    join: JoinMode,
) -> Vec<MergedRow> {
    listings
        .iter()
        .zip(codes)
        .zip(matches)
        .filter(|(_, m)| join == JoinMode::Left || m.is_some())
        .map(|((listing, code), m)| {
            let reference_fields = m
                .as_ref()
                .and_then(|m| reference.get(&m.canonical_code))
                .map(|r| r.fields.clone());
            let price_per_area = match (listing.price, listing.area) {
                (Some(price), Some(area)) if area > 0.0 => Some(price / area),
                _ => None,
            };
            MergedRow {
                record_id: listing.record_id.clone(),
                postal_raw: listing.postal_raw.clone(),
                postal_normalized: code.clone(),
                matched: m.clone(),
                price: listing.price,
                area: listing.area,
                price_per_area,
                listing: listing.fields.clone(),
                reference: reference_fields,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// CSV loading
// ---------------------------------------------------------------------------

fn read_headers(
    reader: &mut csv::Reader<&[u8]>,
) -> Result<Vec<String>, ReconError> {
    Ok(reader
        .headers()
        .map_err(|e| ReconError::Csv(e.to_string()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect())
}

fn column_index(dataset: &str, headers: &[String], name: &str) -> Result<usize, ReconError> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| ReconError::MissingColumn {
            dataset: dataset.into(),
            column: name.into(),
        })
}

/// Load listings from CSV text, applying the column mapping.
/// Unparseable prices and areas become `None`; they never fail the load.
pub fn load_listings(csv_data: &str, config: &ListingsConfig) -> Result<ListingSet, ReconError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(csv_data.as_bytes());

    let headers = read_headers(&mut reader)?;
    let col = &config.columns;

    let postal_idx = column_index("listings", &headers, &col.postal_code)?;
    let price_idx = match col.price {
        Some(ref name) => Some(column_index("listings", &headers, name)?),
        None => None,
    };
    let area_idx = match col.area {
        Some(ref name) => Some(column_index("listings", &headers, name)?),
        None => None,
    };
    let id_idx = match col.record_id {
        Some(ref name) => Some(column_index("listings", &headers, name)?),
        None => None,
    };

    let mut rows = Vec::new();

    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(|e| ReconError::Csv(e.to_string()))?;

        let record_id = match id_idx {
            Some(idx) => record.get(idx).unwrap_or("").to_string(),
            None => (i + 1).to_string(),
        };
        let postal_raw = record.get(postal_idx).unwrap_or("").to_string();
        let price = price_idx.and_then(|idx| parse_number(record.get(idx).unwrap_or("")));
        let area = area_idx.and_then(|idx| parse_number(record.get(idx).unwrap_or("")));

        let mut fields = BTreeMap::new();
        for (j, h) in headers.iter().enumerate() {
            if let Some(val) = record.get(j) {
                fields.insert(h.clone(), val.to_string());
            }
        }

        rows.push(ListingRow {
            record_id,
            postal_raw,
            price,
            area,
            fields,
        });
    }

    Ok(ListingSet { rows, headers })
}

/// Load the reference dataset, canonicalizing its postal codes.
///
/// Rows with an empty code are skipped. Two rows that canonicalize to the
/// same code are an error: the join would otherwise pick one silently.
pub fn load_reference(
    csv_data: &str,
    config: &ReferenceConfig,
) -> Result<ReferenceSet, ReconError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(csv_data.as_bytes());

    let headers = read_headers(&mut reader)?;
    let postal_column = config.columns.postal_code.clone();
    let postal_idx = column_index("reference", &headers, &postal_column)?;

    let mut records: BTreeMap<String, ReferenceRecord> = BTreeMap::new();
    let mut seen_on: HashMap<String, Vec<usize>> = HashMap::new();

    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(|e| ReconError::Csv(e.to_string()))?;
        let row_number = i + 1;

        let code = canonical_code(record.get(postal_idx).unwrap_or(""), config.pad_width);
        if code.is_empty() {
            log::warn!("reference row {row_number}: empty postal code, skipped");
            continue;
        }

        let rows_for_code = seen_on.entry(code.clone()).or_default();
        rows_for_code.push(row_number);
        if rows_for_code.len() > 1 {
            return Err(ReconError::DuplicateCode {
                code,
                rows: rows_for_code.clone(),
            });
        }

        let mut fields = BTreeMap::new();
        for (j, h) in headers.iter().enumerate() {
            if let Some(val) = record.get(j) {
                fields.insert(h.clone(), val.to_string());
            }
        }
        fields.insert(postal_column.clone(), code.clone());

        records.insert(
            code.clone(),
            ReferenceRecord {
                canonical_code: code,
                fields,
            },
        );
    }

    Ok(ReferenceSet {
        records,
        headers,
        postal_column,
    })
}
