//! Admin password reset through the local server binary

use std::{path::Path, process::Stdio};

use anyhow::{Context, Result, bail};
use tokio::process::Command;
use tracing::{debug, info};

/// Default path of the server binary, relative to the working directory
pub const DEFAULT_ALIST_BIN: &str = "./alist";

/// Runs `<alist_bin> admin set <password>`, which sets the admin password
/// in the local server's database.
pub async fn reset_admin_password(alist_bin: &Path, password: &str) -> Result<()> {
    debug!(bin = %alist_bin.display(), "resetting admin password");
    let output = Command::new(alist_bin)
        .args(["admin", "set", password])
        .stdin(Stdio::null())
        .output()
        .await
        .with_context(|| format!("failed to run {}", alist_bin.display()))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "{} admin set exited with {}: {}",
            alist_bin.display(),
            output.status,
            stderr.trim()
        );
    }
    info!("admin password reset");
    Ok(())
}
