use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use clap::builder::TypedValueParser;
use hls_mirror_engine::{
    DEFAULT_CONCURRENCY, DEFAULT_OUTPUT_DIR, FetcherConfig, MirrorConfig, RetryPolicy,
};

use crate::error::Result;
use crate::utils::parse_headers;

/// Mirror an HLS resource tree (manifests, segments, keys) to a local directory
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// JSON file with the resource records to mirror, or `-` for stdin
    #[arg(short, long, value_name = "FILE")]
    pub resources: PathBuf,

    /// Output directory
    #[arg(short, long, value_name = "DIR", default_value = DEFAULT_OUTPUT_DIR)]
    pub output: PathBuf,

    /// Maximum number of simultaneous downloads
    #[arg(short, long, default_value_t = DEFAULT_CONCURRENCY, value_parser = clap::value_parser!(u16).range(1..).map(usize::from))]
    pub concurrency: usize,

    /// Decrypt AES-128 segments before writing them
    #[arg(short, long)]
    pub decrypt: bool,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub timeout: u64,

    /// Retries per failed fetch
    #[arg(long, default_value_t = 3)]
    pub retries: u32,

    /// User agent sent with every request
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Extra request header as Name=value (repeatable)
    #[arg(short = 'H', long = "header", value_name = "NAME=VALUE")]
    pub headers: Vec<String>,

    /// Enable debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Builds the engine configuration, rooted at `output_root`.
    pub fn to_config(&self, output_root: PathBuf) -> Result<MirrorConfig> {
        let retry = RetryPolicy {
            max_retries: self.retries,
            ..RetryPolicy::default()
        };

        let mut fetcher = FetcherConfig::default()
            .with_timeout(Duration::from_secs(self.timeout))
            .with_retry(retry);
        if let Some(user_agent) = &self.user_agent {
            fetcher = fetcher.with_user_agent(user_agent.clone());
        }
        for (name, value) in parse_headers(&self.headers)? {
            fetcher = fetcher.with_header(name, value);
        }

        Ok(MirrorConfig::new(output_root)
            .with_concurrency(self.concurrency)
            .with_decrypt(self.decrypt)
            .with_fetcher(fetcher))
    }
}
