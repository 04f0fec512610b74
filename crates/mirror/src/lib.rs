//! Mirrors a resolved HLS resource tree to a local directory.
//!
//! The caller supplies an ordered list of [`ResourceDescriptor`]s (manifests,
//! segments and keys already discovered by a resolver). [`MirrorPipeline`]
//! turns each into an operation, runs them with bounded concurrency
//! (fetch, optional AES-128 decryption, write), reports progress, and finally
//! renames the single top-level playlist to `master.m3u8`.
//!
//! ```no_run
//! use hls_mirror_engine::{MirrorConfig, MirrorPipeline, ResourceDescriptor};
//!
//! # async fn example() -> Result<(), hls_mirror_engine::MirrorError> {
//! let pipeline = MirrorPipeline::new(MirrorConfig::new("/tmp/stream").with_concurrency(8))?;
//! let resources = vec![
//!     ResourceDescriptor::inline("index.m3u8", "#EXTM3U\nseg0.ts\n"),
//!     ResourceDescriptor::plain("seg0.ts", "https://cdn.example.com/seg0.ts"),
//! ];
//! let summary = pipeline.run(&resources).await?;
//! println!("{} files written", summary.completed);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod decryption;
pub mod error;
pub mod executor;
pub mod fetcher;
pub mod normalize;
pub mod persist;
pub mod pipeline;
pub mod progress;
pub mod resource;
pub mod retry;

// Re-exports for easier access
pub use config::{DEFAULT_CONCURRENCY, DEFAULT_OUTPUT_DIR, FetcherConfig, MirrorConfig};
pub use decryption::{AesDecryptor, Decrypt};
pub use error::MirrorError;
pub use executor::run_bounded;
pub use fetcher::{Fetch, HttpFetcher};
pub use normalize::{CANONICAL_MANIFEST_NAME, NormalizeOutcome, normalize_root_manifest};
pub use persist::write_file;
pub use pipeline::{MirrorPipeline, MirrorSummary, Operation, classify};
pub use progress::{ProgressCallback, ProgressReport, ProgressTracker};
pub use resource::{KeyRecord, ResourceDescriptor, ResourceRecord, ResourceSource, SegmentKey};
pub use retry::{RetryPolicy, retry_with_backoff};
