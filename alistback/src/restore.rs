//! Restore: replay a snapshot's storages and users against a server
//!
//! Steps, in order:
//!
//! 1. optionally reset the admin password with the local server binary (failure is reported, not fatal)
//! 2. log in (fatal on failure)
//! 3. load the snapshot (fatal on failure, before any admin request)
//! 4. create each storage, then each user; a failed record is counted and skipped
//! 5. report the replay (see [restore_with])
//! 6. update the admin account (failure is reported, not fatal)
//!
//! Settings and metas in the snapshot are not replayed.

use std::path::PathBuf;

use alist::{prelude::*, records::raw_id};
use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::{reset::reset_admin_password, snapshot::Snapshot};

/// Password reset performed before login
#[derive(Debug, Clone)]
pub struct AdminReset {
    pub alist_bin: PathBuf,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct RestoreOptions {
    pub input_file: PathBuf,
    pub reset: Option<AdminReset>,
    /// Username the admin account (id 1) is updated to after replay
    pub admin_username: String,
}

/// Result of creating one record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordOutcome {
    pub kind: &'static str,
    pub id: String,
    pub restored: bool,
    /// Error, or server message for a non-200 application code or a reply without envelope
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RestoreReport {
    pub storages_attempted: usize,
    pub storages_restored: Vec<String>,
    pub users_attempted: usize,
    pub users_restored: Vec<String>,
    pub admin_updated: bool,
    /// None if no reset was requested
    pub password_reset: Option<bool>,
    pub records: Vec<RecordOutcome>,
    /// Non-fatal failures, in order
    pub warnings: Vec<String>,
}

impl RestoreReport {
    /// Summary lines: restored identifiers per collection, then the admin update status.
    pub fn summary(&self) -> Vec<String> {
        let mut lines = self.replay_summary().to_vec();
        lines.push(self.admin_summary().to_string());
        lines
    }

    /// Restored identifiers per collection, one line each
    pub fn replay_summary(&self) -> [String; 2] {
        [
            summary_line("storages", &self.storages_restored),
            summary_line("users", &self.users_restored),
        ]
    }

    pub fn admin_summary(&self) -> &'static str {
        if self.admin_updated {
            "admin account updated"
        } else {
            "admin account not updated"
        }
    }
}

fn summary_line(kind: &str, restored: &[String]) -> String {
    if restored.is_empty() {
        format!("no {kind} restored")
    } else {
        format!(
            "restored {} {kind}: {}",
            restored.len(),
            restored.join(" ")
        )
    }
}

/// Runs a restore. See the module docs for the order of steps.
pub async fn restore(client: &AlistClient, options: &RestoreOptions) -> Result<RestoreReport> {
    restore_with(client, options, |_| {}).await
}

/// Runs a restore, calling `on_replayed` once storages and users are replayed,
/// before the admin account is updated.
pub async fn restore_with(
    client: &AlistClient,
    options: &RestoreOptions,
    on_replayed: impl FnOnce(&RestoreReport),
) -> Result<RestoreReport> {
    let mut report = RestoreReport::default();

    if let Some(reset) = &options.reset {
        match reset_admin_password(&reset.alist_bin, &reset.password).await {
            Ok(()) => report.password_reset = Some(true),
            Err(e) => {
                error!("admin password reset failed: {e:#}");
                report.password_reset = Some(false);
                report
                    .warnings
                    .push(format!("admin password reset failed: {e:#}"));
            }
        }
    }

    client.login().await?;

    let snapshot = Snapshot::load(&options.input_file)
        .with_context(|| format!("cannot restore from {}", options.input_file.display()))?;
    info!(
        input = %options.input_file.display(),
        alist_version = snapshot.server_version.as_deref().unwrap_or("unknown"),
        "loaded snapshot"
    );

    let storages = snapshot.records(Collection::Storages);
    report.storages_attempted = storages.len();
    let restored = restore_records::<StorageRecord>(client, storages, &mut report).await;
    report.storages_restored = restored;

    let users = snapshot.records(Collection::Users);
    report.users_attempted = users.len();
    let restored = restore_records::<UserRecord>(client, users, &mut report).await;
    report.users_restored = restored;

    for line in report.replay_summary() {
        info!("{line}");
    }
    on_replayed(&report);

    match client.update_admin(&options.admin_username).await {
        Ok(reply) => {
            report.admin_updated = true;
            if !reply.is_ok() || reply.is_unrecognized() {
                report.warnings.push(format!(
                    "admin update: server replied ({}) {}",
                    reply.code, reply.message
                ));
            }
        }
        Err(e) => {
            error!("admin update failed: {e}");
            report.warnings.push(format!("admin update failed: {e}"));
        }
    }

    Ok(report)
}

/// Creates each record in turn and returns the identifiers of those created.
async fn restore_records<R: Record>(
    client: &AlistClient,
    records: &[Value],
    report: &mut RestoreReport,
) -> Vec<String> {
    let mut restored = Vec::new();
    for raw in records {
        let outcome = restore_record::<R>(client, raw).await;
        if outcome.restored {
            restored.push(outcome.id.clone());
        } else {
            report.warnings.push(format!(
                "{} {} not restored: {}",
                outcome.kind,
                outcome.id,
                outcome.message.as_deref().unwrap_or_default()
            ));
        }
        report.records.push(outcome);
    }
    restored
}

async fn restore_record<R: Record>(client: &AlistClient, raw: &Value) -> RecordOutcome {
    let projection = match R::project(raw) {
        Ok(projection) => projection,
        Err(e) => {
            let id = raw_id(raw, R::ID_FIELD);
            warn!(kind = R::KIND, %id, "skipping record: {e}");
            return RecordOutcome {
                kind: R::KIND,
                id,
                restored: false,
                message: Some(e.to_string()),
            };
        }
    };
    let id = projection.id.clone();
    match client.create_projection(&projection).await {
        Ok(reply) => {
            debug!(kind = R::KIND, %id, code = reply.code, "created");
            RecordOutcome {
                kind: R::KIND,
                id,
                restored: true,
                message: (!reply.is_ok() || reply.is_unrecognized()).then_some(reply.message),
            }
        }
        Err(e) => {
            warn!(kind = R::KIND, %id, "create failed: {e}");
            RecordOutcome {
                kind: R::KIND,
                id,
                restored: false,
                message: Some(e.to_string()),
            }
        }
    }
}
