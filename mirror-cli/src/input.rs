use std::path::Path;

use hls_mirror_engine::{ResourceDescriptor, ResourceRecord};
use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::error::{AppError, Result};

/// Reads resource records from a file, or from stdin when `path` is `-`.
pub async fn load_resources(path: &Path) -> Result<Vec<ResourceDescriptor>> {
    let json = if path.as_os_str() == "-" {
        let mut buf = String::new();
        tokio::io::stdin().read_to_string(&mut buf).await?;
        buf
    } else {
        tokio::fs::read_to_string(path).await.map_err(|e| {
            AppError::InvalidInput(format!(
                "cannot read resource list {}: {e}",
                path.display()
            ))
        })?
    };

    parse_resources(&json)
}

/// Parses a JSON array of resource records, preserving order.
pub fn parse_resources(json: &str) -> Result<Vec<ResourceDescriptor>> {
    let records: Vec<ResourceRecord> = serde_json::from_str(json)?;
    debug!(count = records.len(), "Parsed resource records");

    let resources = records
        .into_iter()
        .map(ResourceDescriptor::try_from)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(resources)
}
