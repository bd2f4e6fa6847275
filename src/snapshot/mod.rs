//! The snapshot document shared by `fetch` (writer) and `browse`/`facets`/`inspect` (readers).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::util::json::null_as_default;

pub const DEFAULT_SNAPSHOT_PATH: &str = "public/courses.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub filters: Vec<Value>,
}

impl Snapshot {
    /// `total` is recomputed from the final item list.
    pub fn assemble(items: Vec<Value>, filters: Vec<Value>) -> Self {
        let total = items.len() as u64;
        Snapshot { items, total, filters }
    }
}

/// Write the snapshot next to its destination, then rename over it.
pub fn write_atomic(path: &Path, snapshot: &Snapshot) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    let tmp = tmp_path(path);
    let body = serde_json::to_vec_pretty(snapshot).context("serialize snapshot")?;
    let written = fs::write(&tmp, body)
        .with_context(|| format!("write {}", tmp.display()))
        .and_then(|_| {
            fs::rename(&tmp, path).with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))
        });
    if written.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    written
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("invalid snapshot location {0}")]
    InvalidLocation(String),
    #[error("read {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("snapshot request returned {0}")]
    Status(StatusCode),
    #[error("unparsable snapshot: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotLocation {
    File(PathBuf),
    Url(Url),
}

impl std::fmt::Display for SnapshotLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotLocation::File(p) => write!(f, "{}", p.display()),
            SnapshotLocation::Url(u) => write!(f, "{u}"),
        }
    }
}

impl SnapshotLocation {
    /// Absolute http(s) URLs are used as-is; with a deployment base URL, relative
    /// locations resolve against it; anything else is a local path.
    pub fn resolve(location: &str, base: Option<&str>) -> Result<Self, LoadError> {
        if let Ok(url) = Url::parse(location) {
            if matches!(url.scheme(), "http" | "https") {
                return Ok(SnapshotLocation::Url(url));
            }
        }
        match base.map(str::trim).filter(|b| !b.is_empty()) {
            Some(base) => {
                let dir = if base.ends_with('/') { base.to_string() } else { format!("{base}/") };
                let base_url = Url::parse(&dir).map_err(|_| LoadError::InvalidLocation(base.to_string()))?;
                let url = base_url
                    .join(location.trim_start_matches('/'))
                    .map_err(|_| LoadError::InvalidLocation(location.to_string()))?;
                Ok(SnapshotLocation::Url(url))
            }
            None => Ok(SnapshotLocation::File(PathBuf::from(location))),
        }
    }
}

pub async fn load(location: &SnapshotLocation, client: &reqwest::Client) -> Result<Snapshot, LoadError> {
    let bytes = match location {
        SnapshotLocation::File(path) => fs::read(path).map_err(|source| LoadError::Io { path: path.clone(), source })?,
        SnapshotLocation::Url(url) => {
            let resp = client.get(url.clone()).send().await?;
            let status = resp.status();
            if !status.is_success() {
                return Err(LoadError::Status(status));
            }
            resp.bytes().await?.to_vec()
        }
    };
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn assemble_recomputes_total() {
        let snap = Snapshot::assemble(vec![json!({"sku": "a"}), json!({"sku": "b"})], vec![]);
        assert_eq!(snap.total, 2);
    }

    #[tokio::test]
    async fn atomic_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("public").join("courses.json");
        let snap = Snapshot::assemble(vec![json!({"sku": "a", "name": "Ethics"})], vec![json!({"attribute_code": "lcv_sponsor"})]);

        write_atomic(&path, &snap).unwrap();

        assert!(path.exists());
        assert!(!tmp_path(&path).exists());
        let loaded = load(&SnapshotLocation::File(path), &reqwest::Client::new()).await.unwrap();
        assert_eq!(loaded, snap);
    }

    #[test]
    fn rewrite_replaces_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("courses.json");
        write_atomic(&path, &Snapshot::assemble(vec![json!({"sku": "old"})], vec![])).unwrap();
        write_atomic(&path, &Snapshot::assemble(vec![], vec![])).unwrap();
        let raw: Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw["total"], 0);
        assert_eq!(raw["items"], json!([]));
    }

    #[test]
    fn failed_rename_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        // a non-empty directory at the target path makes the rename fail
        let path = dir.path().join("courses.json");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), b"x").unwrap();

        let err = write_atomic(&path, &Snapshot::assemble(vec![json!({"sku": "a"})], vec![]));
        assert!(err.is_err());
        assert!(!tmp_path(&path).exists());
        assert!(path.join("keep").exists());
    }

    #[tokio::test]
    async fn missing_and_garbled_files_are_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let client = reqwest::Client::new();

        let missing = SnapshotLocation::File(dir.path().join("nope.json"));
        assert!(matches!(load(&missing, &client).await, Err(LoadError::Io { .. })));

        let garbled = dir.path().join("bad.json");
        fs::write(&garbled, b"<html>not json</html>").unwrap();
        assert!(matches!(load(&SnapshotLocation::File(garbled), &client).await, Err(LoadError::Parse(_))));
    }

    #[test]
    fn null_fields_load_as_empty() {
        let snap: Snapshot = serde_json::from_str(r#"{"items": null, "total": null}"#).unwrap();
        assert!(snap.items.is_empty());
        assert_eq!(snap.total, 0);
        assert!(snap.filters.is_empty());
    }

    #[test]
    fn resolve_locations() {
        assert_eq!(
            SnapshotLocation::resolve("courses.json", None).unwrap(),
            SnapshotLocation::File(PathBuf::from("courses.json"))
        );
        assert_eq!(
            SnapshotLocation::resolve("https://cdn.example.org/courses.json", Some("https://ignored.example")).unwrap(),
            SnapshotLocation::Url(Url::parse("https://cdn.example.org/courses.json").unwrap())
        );
        assert_eq!(
            SnapshotLocation::resolve("/courses.json", Some("https://example.github.io/catalog")).unwrap(),
            SnapshotLocation::Url(Url::parse("https://example.github.io/catalog/courses.json").unwrap())
        );
        assert!(matches!(
            SnapshotLocation::resolve("courses.json", Some("not a url")),
            Err(LoadError::InvalidLocation(_))
        ));
    }
}
