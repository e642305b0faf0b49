use serde::Deserialize;

use crate::error::ReconError;
use crate::normalize::ListingKey;
use crate::similarity::Scorer;

pub const DEFAULT_THRESHOLD: f64 = 0.8;
pub const DEFAULT_PAD_WIDTH: usize = 5;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct JoinConfig {
    pub name: String,
    #[serde(default)]
    pub join: JoinMode,
    pub listings: ListingsConfig,
    pub reference: ReferenceConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub summary: SummaryConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// What happens to listings whose postal code found no reference record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinMode {
    /// Keep every listing; unmatched rows carry empty reference fields.
    #[default]
    Left,
    /// Drop unmatched listings.
    Inner,
}

impl std::fmt::Display for JoinMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Left => write!(f, "left"),
            Self::Inner => write!(f, "inner"),
        }
    }
}

// ---------------------------------------------------------------------------
// Datasets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ListingsConfig {
    pub file: String,
    pub columns: ListingColumns,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListingColumns {
    pub postal_code: String,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub area: Option<String>,
    /// Row number (1-based) is used when absent.
    #[serde(default)]
    pub record_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReferenceConfig {
    pub file: String,
    #[serde(default = "default_pad_width")]
    pub pad_width: usize,
    pub columns: ReferenceColumns,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReferenceColumns {
    pub postal_code: String,
}

fn default_pad_width() -> usize {
    DEFAULT_PAD_WIDTH
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingConfig {
    #[serde(default)]
    pub scorer: Scorer,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default)]
    pub listing_key: ListingKey,
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            scorer: Scorer::default(),
            threshold: DEFAULT_THRESHOLD,
            listing_key: ListingKey::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Summary, filter, output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SummaryConfig {
    /// Numeric reference columns to average over the filtered rows.
    #[serde(default)]
    pub averages: Vec<String>,
    /// Categorical reference column counted per postal code.
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterConfig {
    #[serde(default)]
    pub postal_codes: Option<Vec<String>>,
    #[serde(default)]
    pub min_price: Option<f64>,
    #[serde(default)]
    pub max_price: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub csv: Option<String>,
    #[serde(default)]
    pub json: Option<String>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl JoinConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: JoinConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        let threshold = self.matching.threshold;
        if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
            return Err(ReconError::ConfigValidation(format!(
                "matching.threshold must be within [0, 1], got {threshold}"
            )));
        }

        if self.reference.pad_width == 0 || self.reference.pad_width > 16 {
            return Err(ReconError::ConfigValidation(format!(
                "reference.pad_width must be between 1 and 16, got {}",
                self.reference.pad_width
            )));
        }

        require_non_empty("listings.file", &self.listings.file)?;
        require_non_empty("listings.columns.postal_code", &self.listings.columns.postal_code)?;
        require_non_empty("reference.file", &self.reference.file)?;
        require_non_empty(
            "reference.columns.postal_code",
            &self.reference.columns.postal_code,
        )?;

        for column in &self.summary.averages {
            require_non_empty("summary.averages", column)?;
        }

        for (field, bound) in [
            ("filter.min_price", self.filter.min_price),
            ("filter.max_price", self.filter.max_price),
        ] {
            if let Some(v) = bound.filter(|v| !v.is_finite()) {
                return Err(ReconError::ConfigValidation(format!(
                    "{field} must be a finite number, got {v}"
                )));
            }
        }

        if let (Some(min), Some(max)) = (self.filter.min_price, self.filter.max_price) {
            if min > max {
                return Err(ReconError::ConfigValidation(format!(
                    "filter.min_price ({min}) is greater than filter.max_price ({max})"
                )));
            }
        }

        Ok(())
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<(), ReconError> {
    if value.trim().is_empty() {
        return Err(ReconError::ConfigValidation(format!("{field} must not be empty")));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
