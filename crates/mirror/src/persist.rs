use std::path::Path;

use tracing::trace;

use crate::MirrorError;

/// Writes `content` to `path`, creating missing parent directories first.
///
/// An existing file at `path` is replaced.
pub async fn write_file(path: &Path, content: &[u8]) -> Result<(), MirrorError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| MirrorError::persist(parent, source))?;
    }

    tokio::fs::write(path, content)
        .await
        .map_err(|source| MirrorError::persist(path, source))?;

    trace!(path = %path.display(), size = content.len(), "Wrote file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn creates_missing_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a/b/c/seg0.ts");

        write_file(&path, b"segment").await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"segment");
    }

    #[tokio::test]
    async fn overwrites_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.m3u8");
        std::fs::write(&path, b"old contents that are longer").unwrap();

        write_file(&path, b"new").await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"new");
    }

    #[tokio::test]
    async fn parent_that_is_a_file_is_a_persist_error() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("blocker"), b"").unwrap();
        let path = dir.path().join("blocker/seg0.ts");

        let err = write_file(&path, b"segment").await.unwrap_err();

        assert!(matches!(err, MirrorError::Persist { .. }));
    }
}
