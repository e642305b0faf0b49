//! Merged-table CSV export.
//!
//! Column order: listing columns as read, then the match columns, then the
//! reference columns (minus the reference postal column), then
//! `price_per_area`. A reference column whose name is already taken is
//! written as `ref_<name>`, with further `ref_` prefixes until unique.

use std::collections::HashSet;
use std::io::Write;

use zipjoin_recon::model::MergedRow;
use zipjoin_recon::ReferenceSet;

const MATCH_COLUMNS: [&str; 3] = ["postal_normalized", "matched_code", "match_score"];
const DERIVED_COLUMN: &str = "price_per_area";

/// (source column, output header) pairs for the reference side.
///
/// A colliding name gets `ref_` prepended until it is unique among every
/// listing, match, derived and reference header.
fn reference_columns(listing_headers: &[String], reference: &ReferenceSet) -> Vec<(String, String)> {
    let fixed: HashSet<&str> = listing_headers
        .iter()
        .map(|h| h.as_str())
        .chain(MATCH_COLUMNS)
        .chain([DERIVED_COLUMN])
        .collect();

    let sources: Vec<&String> = reference
        .headers
        .iter()
        .filter(|h| **h != reference.postal_column)
        .collect();

    let mut reserved: HashSet<String> = fixed
        .iter()
        .map(|h| h.to_string())
        .chain(sources.iter().map(|h| h.to_string()))
        .collect();

    sources
        .into_iter()
        .map(|h| {
            let mut out = h.clone();
            if fixed.contains(h.as_str()) {
                out = format!("ref_{h}");
                while reserved.contains(&out) {
                    out = format!("ref_{out}");
                }
                reserved.insert(out.clone());
            }
            (h.clone(), out)
        })
        .collect()
}

pub fn write_merged_csv<W: Write>(
    rows: &[MergedRow],
    listing_headers: &[String],
    reference: &ReferenceSet,
    out: W,
) -> Result<(), String> {
    let ref_cols = reference_columns(listing_headers, reference);
    let mut wtr = csv::Writer::from_writer(out);

    let mut header: Vec<&str> = listing_headers.iter().map(|h| h.as_str()).collect();
    header.extend(MATCH_COLUMNS);
    header.extend(ref_cols.iter().map(|(_, out)| out.as_str()));
    header.push(DERIVED_COLUMN);
    wtr.write_record(&header).map_err(|e| e.to_string())?;

    for row in rows {
        let mut record: Vec<String> = listing_headers
            .iter()
            .map(|h| row.listing.get(h).cloned().unwrap_or_default())
            .collect();

        record.push(row.postal_normalized.clone());
        match row.matched {
            Some(ref m) => {
                record.push(m.canonical_code.clone());
                record.push(format!("{:.4}", m.score));
            }
            None => {
                record.push(String::new());
                record.push(String::new());
            }
        }

        for (source, _) in &ref_cols {
            let value = row
                .reference
                .as_ref()
                .and_then(|r| r.get(source))
                .cloned()
                .unwrap_or_default();
            record.push(value);
        }

        record.push(
            row.price_per_area
                .map(|v| format!("{v:.2}"))
                .unwrap_or_default(),
        );

        wtr.write_record(&record).map_err(|e| e.to_string())?;
    }

    wtr.flush().map_err(|e| e.to_string())
}
