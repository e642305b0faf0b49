// zipjoin CLI - join property listings to demographic data by fuzzy postal code

mod exit_codes;
mod export;
mod join;
mod lookup;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};

use exit_codes::{EXIT_ERROR, EXIT_INVALID_CONFIG, EXIT_RUNTIME, EXIT_SUCCESS, EXIT_USAGE};
use lookup::{KeyArg, ScorerArg};

#[derive(Parser)]
#[command(name = "zipjoin")]
#[command(about = "Join property listings to demographic data by fuzzy postal code")]
#[command(version)]
#[command(long_version = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("ZIPJOIN_COMMIT"),
    ", ",
    env!("ZIPJOIN_TARGET"),
    ")"
))]
struct Cli {
    /// More log output on stderr (-v info, -vv debug). ZIPJOIN_LOG overrides.
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a join from a TOML job file (exit 5 with --strict = unmatched listings)
    #[command(after_help = "\
Examples:
  zipjoin run job.zipjoin.toml
  zipjoin run job.zipjoin.toml --json
  zipjoin run job.zipjoin.toml --csv merged.csv --output result.json
  zipjoin run job.zipjoin.toml --code 32501 --code 32599 --max-price 400000
  zipjoin run job.zipjoin.toml --cache-file .zipjoin-cache.json --strict")]
    Run {
        /// Path to the job config file
        config: PathBuf,

        /// Output JSON to stdout instead of human summary
        #[arg(long)]
        json: bool,

        /// Write JSON result to file (overrides [output].json)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write merged table as CSV (overrides [output].csv)
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Keep only rows matched to this postal code. Repeatable.
        #[arg(long = "code", value_name = "CODE")]
        codes: Vec<String>,

        /// Keep only rows priced at or above this value
        #[arg(long)]
        min_price: Option<f64>,

        /// Keep only rows priced at or below this value
        #[arg(long)]
        max_price: Option<f64>,

        /// Reuse and update match results stored in this file
        #[arg(long, env = "ZIPJOIN_CACHE_FILE")]
        cache_file: Option<PathBuf>,

        /// Exit 5 if any listing is unmatched
        #[arg(long)]
        strict: bool,

        /// Suppress the stderr summary
        #[arg(long, short = 'q')]
        quiet: bool,
    },

    /// Validate a job config without running
    #[command(after_help = "\
Examples:
  zipjoin validate job.zipjoin.toml")]
    Validate {
        /// Path to the job config file
        config: PathBuf,
    },

    /// Explain how one postal code matches a reference file (exit 5 = no match)
    #[command(after_help = "\
Examples:
  zipjoin lookup 325XX --reference demographics.csv
  zipjoin lookup 2134 --reference demographics.csv --column zip_code --top 3
  zipjoin lookup 3250 --reference demographics.csv --scorer levenshtein --threshold 0.75 --json")]
    Lookup {
        /// Listing postal code, as written in the listing
        code: String,

        /// Reference CSV with canonical postal codes
        #[arg(long)]
        reference: PathBuf,

        /// Postal code column in the reference CSV
        #[arg(long, default_value = "zip_code")]
        column: String,

        /// Zero-pad numeric reference codes to this width
        #[arg(long, default_value_t = zipjoin_recon::config::DEFAULT_PAD_WIDTH)]
        pad_width: usize,

        /// Similarity scorer
        #[arg(long, value_enum, default_value = "partial-ratio")]
        scorer: ScorerArg,

        /// Minimum accepted score, 0 to 1
        #[arg(long, default_value_t = zipjoin_recon::config::DEFAULT_THRESHOLD)]
        threshold: f64,

        /// How to extract the comparable code from the input
        #[arg(long, value_enum, default_value = "digit-prefix")]
        key: KeyArg,

        /// Number of candidates to show
        #[arg(long, default_value_t = 5)]
        top: usize,

        /// Output JSON to stdout
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run {
            config,
            json,
            output,
            csv,
            codes,
            min_price,
            max_price,
            cache_file,
            strict,
            quiet,
        } => join::cmd_run(join::RunArgs {
            config,
            json,
            output,
            csv,
            codes,
            min_price,
            max_price,
            cache_file,
            strict,
            quiet,
        }),
        Commands::Validate { config } => join::cmd_validate(config),
        Commands::Lookup {
            code,
            reference,
            column,
            pad_width,
            scorer,
            threshold,
            key,
            top,
            json,
        } => lookup::cmd_lookup(lookup::LookupArgs {
            code,
            reference,
            column,
            pad_width,
            scorer,
            threshold,
            key,
            top,
            json,
        }),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::new().filter_or("ZIPJOIN_LOG", default))
        .format_timestamp(None)
        .init();
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self { code: EXIT_INVALID_CONFIG, message: msg.into(), hint: None }
    }

    pub fn runtime(msg: impl Into<String>) -> Self {
        Self { code: EXIT_RUNTIME, message: msg.into(), hint: None }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
