//! `zipjoin-recon` — fuzzy postal-code join of listings and reference data.
//!
//! Pure engine crate: parses CSV text it is handed, returns merged and
//! summarized results. No CLI or filesystem access.

pub mod aggregate;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod similarity;
pub mod summary;

pub use cache::MatchCache;
pub use config::JoinConfig;
pub use engine::{run, run_with_filter, JoinInput};
pub use error::ReconError;
pub use filter::ListingFilter;
pub use matcher::PostalMatcher;
pub use model::{JoinResult, Match, MergedRow, ReferenceSet};
pub use similarity::Scorer;
