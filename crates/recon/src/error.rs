use std::fmt;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (threshold out of range, empty column, etc.).
    ConfigValidation(String),
    /// Missing required column in input data.
    MissingColumn { dataset: String, column: String },
    /// Two reference rows normalize to the same canonical code.
    DuplicateCode { code: String, rows: Vec<usize> },
    /// CSV read/write error.
    Csv(String),
    /// Cache snapshot could not be read or written.
    Cache(String),
    /// IO error (file read, etc.).
    Io(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingColumn { dataset, column } => {
                write!(f, "{dataset}: missing column '{column}'")
            }
            Self::DuplicateCode { code, rows } => {
                let rows: Vec<String> = rows.iter().map(|r| r.to_string()).collect();
                write!(
                    f,
                    "reference: canonical code '{code}' appears on rows {}",
                    rows.join(", ")
                )
            }
            Self::Csv(msg) => write!(f, "CSV error: {msg}"),
            Self::Cache(msg) => write!(f, "cache error: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_code_lists_rows() {
        let err = ReconError::DuplicateCode {
            code: "02134".into(),
            rows: vec![2, 7],
        };
        assert_eq!(
            err.to_string(),
            "reference: canonical code '02134' appears on rows 2, 7"
        );
    }

    #[test]
    fn missing_column_names_dataset() {
        let err = ReconError::MissingColumn {
            dataset: "listings".into(),
            column: "postal_code".into(),
        };
        assert!(err.to_string().contains("listings"));
        assert!(err.to_string().contains("'postal_code'"));
    }
}
