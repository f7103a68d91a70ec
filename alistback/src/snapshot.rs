//! Backup snapshot file
//!
//! One JSON document holding the backup time, the server version, and the raw
//! records of each collection. Collections are kept exactly as the server
//! returned them, so a snapshot can be loaded and saved again without loss.
//!
//! Any top-level key may be null or missing. A file with only `storages` and
//! `users` (written by older tooling) loads as a snapshot with the other keys unset.

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use alist::prelude::Collection;
use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use snafu::{ResultExt, Snafu};
use tempfile::NamedTempFile;

/// Default snapshot file name
pub const DEFAULT_SNAPSHOT_FILE: &str = "alist_backup.json";

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SnapshotError {
    /// Missing, unreadable, or malformed snapshot
    #[snafu(display("invalid snapshot {}: {message}", path.display()))]
    Format { path: PathBuf, message: String },

    #[snafu(display("writing snapshot {}: {source}", path.display()))]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default, deserialize_with = "deserialize_backup_time")]
    pub backup_time: Option<DateTime<FixedOffset>>,

    #[serde(rename = "alist_version", default)]
    pub server_version: Option<String>,

    #[serde(default)]
    pub storages: Option<Value>,

    #[serde(default)]
    pub users: Option<Value>,

    #[serde(default)]
    pub settings: Option<Value>,

    #[serde(default)]
    pub metas: Option<Value>,
}

impl Snapshot {
    /// New empty snapshot stamped with the current local time
    pub fn new(server_version: impl Into<String>) -> Self {
        Self {
            backup_time: Some(Local::now().fixed_offset()),
            server_version: Some(server_version.into()),
            ..Default::default()
        }
    }

    pub fn collection(&self, collection: Collection) -> Option<&Value> {
        match collection {
            Collection::Storages => self.storages.as_ref(),
            Collection::Settings => self.settings.as_ref(),
            Collection::Users => self.users.as_ref(),
            Collection::Metas => self.metas.as_ref(),
        }
    }

    /// Sets the records of a collection. `None` is written as null.
    pub fn set_collection(&mut self, collection: Collection, records: Option<Value>) {
        let slot = match collection {
            Collection::Storages => &mut self.storages,
            Collection::Settings => &mut self.settings,
            Collection::Users => &mut self.users,
            Collection::Metas => &mut self.metas,
        };
        *slot = records;
    }

    /// Records of a collection as a list. Null, missing, and non-array values are empty.
    pub fn records(&self, collection: Collection) -> &[Value] {
        self.collection(collection)
            .and_then(Value::as_array)
            .map_or(&[], Vec::as_slice)
    }

    /// Reads a snapshot file.
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let text = fs::read_to_string(path).map_err(|e| SnapshotError::Format {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_json(&text).map_err(|message| SnapshotError::Format {
            path: path.to_path_buf(),
            message,
        })
    }

    fn from_json(text: &str) -> Result<Self, String> {
        let de = &mut serde_json::Deserializer::from_str(text);
        serde_path_to_error::deserialize(de).map_err(|e| {
            let path = e.path().to_string();
            if path == "." {
                e.into_inner().to_string()
            } else {
                format!("{path}: {}", e.into_inner())
            }
        })
    }

    /// Pretty-prints the snapshot (2-space indent, non-ASCII kept literally).
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Writes the snapshot. The file is written under a temporary name in the
    /// target directory and renamed into place when complete.
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut text = self.to_json().map_err(|e| SnapshotError::Format {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        text.push('\n');

        let mut file = NamedTempFile::new_in(dir).context(IoSnafu { path })?;
        file.write_all(text.as_bytes()).context(IoSnafu { path })?;
        file.as_file().sync_all().context(IoSnafu { path })?;
        file.persist(path)
            .map_err(|e| e.error)
            .context(IoSnafu { path })?;
        Ok(())
    }
}

/// Accepts RFC 3339, or ISO 8601 without offset (read as local time).
fn deserialize_backup_time<'de, D>(deserializer: D) -> Result<Option<DateTime<FixedOffset>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(text) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    parse_backup_time(&text)
        .map(Some)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid backup_time '{text}'")))
}

fn parse_backup_time(text: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(time) = DateTime::parse_from_rfc3339(text) {
        return Some(time);
    }
    let naive = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|time| time.fixed_offset())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Snapshot {
        Snapshot {
            backup_time: DateTime::parse_from_rfc3339("2025-03-01T08:30:00.123456+08:00").ok(),
            server_version: Some("v3.35.0".to_string()),
            storages: Some(json!([{"mount_path": "/阿里云盘", "driver": "AliyundriveOpen"}])),
            users: Some(json!([{"username": "访客"}])),
            settings: None,
            metas: Some(json!([])),
        }
    }

    #[test]
    fn save_and_load_preserves_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backup.json");
        let snapshot = sample();
        snapshot.save(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("/阿里云盘"), "non-ascii must be literal");
        assert!(text.contains("\n  \"alist_version\": \"v3.35.0\""));
        assert!(text.contains("\"settings\": null"));

        let loaded = Snapshot::load(&path).unwrap();
        assert_eq!(loaded, snapshot);
    }

    #[test]
    fn save_leaves_no_temporary_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backup.json");
        sample().save(&path).unwrap();
        sample().save(&path).unwrap();
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("backup.json")]);
    }

    #[test]
    fn minimal_form_reads_as_subset() {
        let snapshot =
            Snapshot::from_json(r#"{"storages": [{"mount_path": "/a"}], "users": []}"#).unwrap();
        assert_eq!(snapshot.records(Collection::Storages).len(), 1);
        assert!(snapshot.records(Collection::Users).is_empty());
        assert_eq!(snapshot.settings, None);
        assert_eq!(snapshot.backup_time, None);
        assert_eq!(snapshot.server_version, None);
    }

    #[test]
    fn null_collections_are_empty() {
        let snapshot = Snapshot::from_json(r#"{"storages": null}"#).unwrap();
        assert!(snapshot.records(Collection::Storages).is_empty());
        assert!(snapshot.records(Collection::Metas).is_empty());
    }

    #[test]
    fn naive_backup_time_is_local() {
        let snapshot =
            Snapshot::from_json(r#"{"backup_time": "2024-11-02T21:15:07.512000"}"#).unwrap();
        let time = snapshot.backup_time.unwrap();
        assert_eq!(
            time.naive_local().to_string(),
            "2024-11-02 21:15:07.512"
        );
    }

    #[test]
    fn bad_backup_time_is_reported_with_path() {
        let err = Snapshot::from_json(r#"{"backup_time": "yesterday"}"#).unwrap_err();
        assert!(err.contains("backup_time"), "{err}");
    }

    #[test]
    fn invalid_json_is_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            Snapshot::load(&path),
            Err(SnapshotError::Format { .. })
        ));
    }

    #[test]
    fn missing_file_is_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Snapshot::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, SnapshotError::Format { .. }));
        assert!(err.to_string().contains("absent.json"));
    }

    #[test]
    fn set_collection_replaces_records() {
        let mut snapshot = Snapshot::new("v3");
        snapshot.set_collection(Collection::Settings, Some(json!([{"key": "a"}])));
        assert_eq!(snapshot.records(Collection::Settings).len(), 1);
        snapshot.set_collection(Collection::Settings, None);
        assert!(snapshot.settings.is_none());
    }
}
