// Mirror pipeline: classifies resources into operations and runs them under the
// concurrency cap, then normalizes the root manifest name.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::{debug, error, info};

use crate::MirrorError;
use crate::config::MirrorConfig;
use crate::decryption::{AesDecryptor, Decrypt};
use crate::executor::run_bounded;
use crate::fetcher::{Fetch, HttpFetcher};
use crate::normalize::{NormalizeOutcome, normalize_root_manifest};
use crate::persist::write_file;
use crate::progress::{ProgressCallback, ProgressTracker};
use crate::resource::{ResourceDescriptor, ResourceSource, SegmentKey};

/// A deferred unit of work for one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    WriteInline {
        destination: PathBuf,
        content: Bytes,
    },
    FetchDecryptWrite {
        destination: PathBuf,
        uri: String,
        key: SegmentKey,
    },
    FetchWrite {
        destination: PathBuf,
        uri: String,
    },
}

impl Operation {
    pub fn destination(&self) -> &Path {
        match self {
            Self::WriteInline { destination, .. }
            | Self::FetchDecryptWrite { destination, .. }
            | Self::FetchWrite { destination, .. } => destination,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::WriteInline { .. } => "inline",
            Self::FetchDecryptWrite { .. } => "fetch-decrypt",
            Self::FetchWrite { .. } => "fetch",
        }
    }
}

/// Turns descriptors into operations, in order.
///
/// Inline content always wins. Encrypted resources take the decrypt path only
/// when `decrypt` is set; otherwise they are fetched like plain ones. Only the
/// plain fetch path is deduplicated by URI: a repeated URI there yields no
/// operation, while inline and decrypt-path resources are never skipped.
pub fn classify(
    resources: &[ResourceDescriptor],
    output_root: &Path,
    decrypt: bool,
) -> Result<Vec<Operation>, MirrorError> {
    let mut scheduled_uris: HashSet<&str> = HashSet::new();
    let mut operations = Vec::with_capacity(resources.len());

    for resource in resources {
        let destination = resource.resolve(output_root)?;
        let operation = match &resource.source {
            ResourceSource::Inline(content) => Operation::WriteInline {
                destination,
                content: content.clone(),
            },
            ResourceSource::Encrypted { uri, key } if decrypt => Operation::FetchDecryptWrite {
                destination,
                uri: uri.clone(),
                key: *key,
            },
            ResourceSource::Encrypted { uri, .. } | ResourceSource::Plain { uri } => {
                if !scheduled_uris.insert(uri.as_str()) {
                    debug!(uri = %uri, destination = %destination.display(), "Skipping already scheduled resource");
                    continue;
                }
                Operation::FetchWrite {
                    destination,
                    uri: uri.clone(),
                }
            }
        };
        operations.push(operation);
    }

    Ok(operations)
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorSummary {
    /// Descriptors received
    pub resources: usize,
    /// Operations scheduled after deduplication
    pub operations: usize,
    /// Operations that completed
    pub completed: usize,
    /// Outcome of the root manifest pass, if it ran
    pub normalized: Option<NormalizeOutcome>,
    pub elapsed: Duration,
}

impl MirrorSummary {
    /// Descriptors that produced no operation.
    pub fn skipped(&self) -> usize {
        self.resources - self.operations
    }
}

pub struct MirrorPipeline {
    config: MirrorConfig,
    fetcher: Arc<dyn Fetch>,
    decryptor: Arc<dyn Decrypt>,
    on_progress: Option<ProgressCallback>,
}

impl MirrorPipeline {
    /// Create a pipeline with the HTTP fetcher and AES decryptor.
    pub fn new(config: MirrorConfig) -> Result<Self, MirrorError> {
        let fetcher = Arc::new(HttpFetcher::new(&config.fetcher)?);
        let decryptor = Arc::new(AesDecryptor::new(config.offload_decryption));
        Ok(Self::with_components(config, fetcher, decryptor))
    }

    pub fn with_components(
        config: MirrorConfig,
        fetcher: Arc<dyn Fetch>,
        decryptor: Arc<dyn Decrypt>,
    ) -> Self {
        Self {
            config,
            fetcher,
            decryptor,
            on_progress: None,
        }
    }

    pub fn with_progress_callback(mut self, on_progress: ProgressCallback) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    /// Materializes every resource under the output root.
    ///
    /// Resolves with the first failure if any operation fails; the root
    /// manifest pass only runs after a fully successful batch.
    pub async fn run(&self, resources: &[ResourceDescriptor]) -> Result<MirrorSummary, MirrorError> {
        let start = Instant::now();
        let operations = classify(resources, &self.config.output_root, self.config.decrypt)?;
        let total = operations.len();

        info!(
            resources = resources.len(),
            operations = total,
            concurrency = self.config.concurrency,
            decrypt = self.config.decrypt,
            "Starting download of {total} resources with concurrency {}",
            self.config.concurrency
        );

        let mut progress = ProgressTracker::new(total);
        if let Some(on_progress) = &self.on_progress {
            progress = progress.with_callback(Arc::clone(on_progress));
        }
        let progress = &progress;

        let deferred = operations
            .into_iter()
            .map(move |operation| move || self.execute(operation, progress));

        let completed = match run_bounded(deferred, self.config.concurrency).await {
            Ok(completed) => completed,
            Err(e) => {
                error!(
                    error = %e,
                    completed = progress.completed(),
                    total,
                    "Download failed"
                );
                return Err(e);
            }
        };

        let normalized = if total > 0 {
            Some(normalize_root_manifest(&self.config.output_root).await)
        } else {
            None
        };

        let elapsed = start.elapsed();
        info!(
            completed,
            duration = ?elapsed,
            "Download completed! Successfully processed {total} resources."
        );

        Ok(MirrorSummary {
            resources: resources.len(),
            operations: total,
            completed,
            normalized,
            elapsed,
        })
    }

    async fn execute(
        &self,
        operation: Operation,
        progress: &ProgressTracker,
    ) -> Result<(), MirrorError> {
        debug!(
            kind = operation.kind(),
            destination = %operation.destination().display(),
            "Running operation"
        );

        match operation {
            Operation::WriteInline {
                destination,
                content,
            } => write_file(&destination, &content).await?,
            Operation::FetchDecryptWrite {
                destination,
                uri,
                key,
            } => {
                let ciphertext = self.fetcher.fetch(&uri).await?;
                let plaintext = self.decryptor.decrypt(ciphertext, &key).await?;
                write_file(&destination, &plaintext).await?;
            }
            Operation::FetchWrite { destination, uri } => {
                let content = self.fetcher.fetch(&uri).await?;
                write_file(&destination, &content).await?;
            }
        }

        progress.record_completion();
        Ok(())
    }
}
