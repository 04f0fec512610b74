use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::retry::RetryPolicy;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/142.0.0.0 Safari/537.36";

/// Number of operations allowed in flight when nothing else is configured.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Output directory used when the caller does not pick one.
pub const DEFAULT_OUTPUT_DIR: &str = "hls-mirror";

/// Options for the HTTP fetcher
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Overall timeout for a single HTTP request, body included
    pub timeout: Duration,

    /// User agent string
    pub user_agent: String,

    /// Headers sent with every request
    pub headers: HeaderMap,

    /// Retry behavior for transient failures
    pub retry: RetryPolicy,

    /// Whether to honor proxy settings from the environment
    pub use_system_proxy: bool,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            headers: FetcherConfig::get_default_headers(),
            retry: RetryPolicy::default(),
            use_system_proxy: true,
        }
    }
}

impl FetcherConfig {
    pub fn get_default_headers() -> HeaderMap {
        let mut default_headers = HeaderMap::new();

        default_headers.insert(reqwest::header::ACCEPT, HeaderValue::from_static("*/*"));

        default_headers.insert(
            reqwest::header::CONNECTION,
            HeaderValue::from_static("keep-alive"),
        );

        default_headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.5"),
        );
        default_headers
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Adds a header, replacing any default of the same name.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_system_proxy(mut self, use_system_proxy: bool) -> Self {
        self.use_system_proxy = use_system_proxy;
        self
    }
}

/// Configuration for one mirror run
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    /// Directory every resource destination is resolved against
    pub output_root: PathBuf,

    /// Maximum number of operations in flight
    pub concurrency: usize,

    /// Decrypt segments that carry key material
    pub decrypt: bool,

    /// Run decryption on the blocking thread pool instead of the scheduler thread
    pub offload_decryption: bool,

    pub fetcher: FetcherConfig,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from(DEFAULT_OUTPUT_DIR),
            concurrency: DEFAULT_CONCURRENCY,
            decrypt: false,
            offload_decryption: true,
            fetcher: FetcherConfig::default(),
        }
    }
}

impl MirrorConfig {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            ..Self::default()
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_decrypt(mut self, decrypt: bool) -> Self {
        self.decrypt = decrypt;
        self
    }

    pub fn with_offload_decryption(mut self, offload: bool) -> Self {
        self.offload_decryption = offload;
        self
    }

    pub fn with_fetcher(mut self, fetcher: FetcherConfig) -> Self {
        self.fetcher = fetcher;
        self
    }
}
