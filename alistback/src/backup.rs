//! Backup: fetch every collection and write a snapshot file

use std::path::{Path, PathBuf};

use alist::prelude::*;
use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::snapshot::Snapshot;

/// Outcome of a backup run
#[derive(Debug, Clone, Serialize)]
pub struct BackupReport {
    pub output_file: PathBuf,
    pub alist_version: String,
    /// Collections written with their records
    pub fetched: Vec<Collection>,
    /// Collections that could not be fetched, written as null
    pub failed: Vec<Collection>,
}

/// Logs in, fetches the server version and each collection in turn, and writes the snapshot.
///
/// A collection that fails to fetch is logged and stored as null; the backup continues.
/// Login failure aborts before anything is written.
pub async fn backup(client: &AlistClient, output_file: &Path) -> Result<BackupReport> {
    info!(url = client.base_url(), output = %output_file.display(), "starting backup");
    client.login().await?;

    let alist_version = client.server_version().await;
    let mut snapshot = Snapshot::new(alist_version.clone());
    let mut fetched = Vec::new();
    let mut failed = Vec::new();

    for collection in Collection::all() {
        info!(%collection, "fetching");
        match client.fetch_collection(collection).await {
            Ok(records) => {
                snapshot.set_collection(collection, Some(records));
                fetched.push(collection);
            }
            Err(e) => {
                warn!(%collection, "fetch failed, storing null: {e}");
                snapshot.set_collection(collection, None);
                failed.push(collection);
            }
        }
    }

    snapshot
        .save(output_file)
        .with_context(|| format!("saving backup to {}", output_file.display()))?;
    info!(output = %output_file.display(), "backup saved");

    Ok(BackupReport {
        output_file: output_file.to_path_buf(),
        alist_version,
        fetched,
        failed,
    })
}
