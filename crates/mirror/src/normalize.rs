// Root manifest normalization: gives the sole top-level playlist a canonical name.

use std::io;
use std::path::Path;

use tracing::{debug, info, warn};

/// Name the top-level manifest is renamed to.
pub const CANONICAL_MANIFEST_NAME: &str = "master.m3u8";

/// Extension identifying playlist files.
pub const MANIFEST_EXTENSION: &str = "m3u8";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizeOutcome {
    /// The only candidate was renamed to the canonical name.
    Renamed { from: String },
    /// No top-level manifest other than the canonical one.
    NoCandidate,
    /// Several manifests qualify, so none is picked.
    Ambiguous { candidates: usize },
    /// An I/O error interrupted the pass; the output is left as it was found.
    Failed { reason: String },
}

/// Renames the single top-level manifest in `output_root` to
/// [`CANONICAL_MANIFEST_NAME`].
///
/// Never fails: errors are logged as warnings and reported as
/// [`NormalizeOutcome::Failed`].
pub async fn normalize_root_manifest(output_root: &Path) -> NormalizeOutcome {
    match try_normalize(output_root).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(
                dir = %output_root.display(),
                error = %e,
                "Could not rename root manifest"
            );
            NormalizeOutcome::Failed {
                reason: e.to_string(),
            }
        }
    }
}

async fn try_normalize(output_root: &Path) -> io::Result<NormalizeOutcome> {
    let mut entries = tokio::fs::read_dir(output_root).await?;
    let mut candidates = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_manifest = path
            .extension()
            .is_some_and(|ext| ext == MANIFEST_EXTENSION);
        if !is_manifest || entry.file_name() == CANONICAL_MANIFEST_NAME {
            continue;
        }
        if tokio::fs::metadata(&path).await?.is_file() {
            candidates.push(entry.file_name());
        }
    }

    match candidates.as_slice() {
        [] => {
            debug!(dir = %output_root.display(), "No root manifest to rename");
            Ok(NormalizeOutcome::NoCandidate)
        }
        [single] => {
            tokio::fs::rename(
                output_root.join(single),
                output_root.join(CANONICAL_MANIFEST_NAME),
            )
            .await?;
            let from = single.to_string_lossy().into_owned();
            info!("Renamed {from} to {CANONICAL_MANIFEST_NAME}");
            Ok(NormalizeOutcome::Renamed { from })
        }
        many => {
            debug!(
                candidates = many.len(),
                "Several root manifests found, leaving names unchanged"
            );
            Ok(NormalizeOutcome::Ambiguous {
                candidates: many.len(),
            })
        }
    }
}
