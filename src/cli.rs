use clap::Parser;
use std::ffi::OsString;
use std::time::Duration;

use crate::gcp::DEFAULT_ENDPOINT;
use crate::types::{OutputFormat, RunConfig};

#[derive(Debug, Parser)]
#[command(
    name = "gcp-sql-versions",
    version,
    about = "List Cloud SQL instances and their database versions across all accessible GCP projects"
)]
pub struct Cli {
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table, env = "GCP_SQL_VERSIONS_OUTPUT")]
    pub output: OutputFormat,

    /// Limit the number of projects to process (negative means no limit)
    #[arg(long, default_value_t = -1, allow_negative_numbers = true, env = "GCP_SQL_VERSIONS_LIMIT")]
    pub limit: i64,

    /// Number of projects queried at the same time
    #[arg(long, default_value_t = 1, env = "GCP_SQL_VERSIONS_CONCURRENCY")]
    pub concurrency: usize,

    /// Maximum instances requested per page
    #[arg(long, env = "GCP_SQL_VERSIONS_PAGE_SIZE")]
    pub page_size: Option<u32>,

    /// Pause before each project, in milliseconds
    #[arg(long, default_value_t = 0)]
    pub pause_ms: u64,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Cloud SQL Admin API endpoint
    #[arg(long, default_value = DEFAULT_ENDPOINT, env = "SQLADMIN_ENDPOINT")]
    pub endpoint: String,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Long flags that may also be spelled with a single dash (`-output csv`,
/// `-limit=5`), the way Go's `flag` package accepts them.
const SINGLE_DASH_FLAGS: [&str; 6] = [
    "output",
    "limit",
    "concurrency",
    "page-size",
    "pause-ms",
    "endpoint",
];

fn normalize_arg(arg: OsString) -> OsString {
    let Some(text) = arg.to_str() else {
        return arg;
    };
    let Some(rest) = text.strip_prefix('-') else {
        return arg;
    };
    if rest.starts_with('-') {
        return arg;
    }
    let name = rest.split_once('=').map_or(rest, |(name, _)| name);
    if SINGLE_DASH_FLAGS.contains(&name) {
        OsString::from(format!("-{}", text))
    } else {
        arg
    }
}

/// Rewrites single-dash long flags to their double-dash form. The program
/// name and values (e.g. the `-1` in `--limit -1`) pass through unchanged.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut args = args.into_iter().map(Into::into);
    let mut normalized: Vec<OsString> = args.next().into_iter().collect();
    normalized.extend(args.map(normalize_arg));
    normalized
}

impl Cli {
    pub fn parse_normalized() -> Self {
        Self::parse_from(normalize_args(std::env::args_os()))
    }

    pub fn try_parse_normalized<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Self::try_parse_from(normalize_args(args))
    }

    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            output: self.output,
            limit: self.limit,
            concurrency: self.concurrency.max(1),
            page_size: self.page_size,
            pause: Duration::from_millis(self.pause_ms),
            show_progress: !self.no_progress,
            endpoint: self.endpoint.clone(),
        }
    }
}
