//! Durable JSON mirror of the remote albums and their photo ids.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::remote::{AlbumDescriptor, MediaItem};

/// Local wall-clock format of the `date` field.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Time of the last successful bootstrap or refresh.
    #[serde(rename = "date", with = "local_timestamp")]
    pub captured_at: NaiveDateTime,
    #[serde(default)]
    pub albums: Vec<Album>,
}

impl Snapshot {
    pub fn new(albums: Vec<Album>) -> Self {
        Self {
            captured_at: now_local(),
            albums,
        }
    }

    pub fn album(&self, id: &str) -> Option<&Album> {
        self.albums.iter().find(|album| album.id == id)
    }

    pub fn photo_count(&self) -> usize {
        self.albums.iter().map(|album| album.photo_ids.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Album {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub url: String,
    pub size: usize,
    /// Raw remote media count seen when the photo list was last fetched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_count: Option<u64>,
    #[serde(rename = "photos", default)]
    pub photo_ids: Vec<String>,
}

impl Album {
    pub fn from_remote(descriptor: &AlbumDescriptor, photos: &[MediaItem]) -> Self {
        let photo_ids: Vec<String> = photos.iter().map(|item| item.id.clone()).collect();
        Self {
            id: descriptor.id.clone(),
            title: descriptor.title.clone(),
            url: descriptor.url.clone(),
            size: photo_ids.len(),
            media_count: Some(descriptor.media_count),
            photo_ids,
        }
    }

    /// Remote count to compare against; older files only carry `size`.
    pub fn known_media_count(&self) -> u64 {
        self.media_count.unwrap_or(self.size as u64)
    }

    pub fn replace_photos(&mut self, media_count: u64, photos: &[MediaItem]) {
        self.photo_ids = photos.iter().map(|item| item.id.clone()).collect();
        self.size = self.photo_ids.len();
        self.media_count = Some(media_count);
    }

    /// Record the remote count and restore `size == photos.len()` without refetching.
    pub fn settle(&mut self, media_count: u64) {
        self.size = self.photo_ids.len();
        self.media_count = Some(media_count);
    }
}

pub fn now_local() -> NaiveDateTime {
    // Whole seconds only, so an in-memory snapshot equals its reloaded copy.
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

mod local_timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::DATE_FORMAT;

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&value.format(DATE_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, DATE_FORMAT).map_err(serde::de::Error::custom)
    }
}

/// Loads and atomically replaces the snapshot file.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when no snapshot has been written yet. A file that exists but
    /// cannot be parsed is an error, never a fresh start.
    pub fn load(&self) -> Result<Option<Snapshot>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "snapshot file not found");
                return Ok(None);
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read {}", self.path.display()));
            }
        };
        let snapshot: Snapshot = serde_json::from_slice(&bytes)
            .with_context(|| format!("failed to parse snapshot {}", self.path.display()))?;
        info!(
            path = %self.path.display(),
            albums = snapshot.albums.len(),
            captured_at = %snapshot.captured_at,
            "snapshot file found"
        );
        Ok(Some(snapshot))
    }

    /// Write the full snapshot to a sibling temp file, sync it, then rename over the target.
    pub fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create snapshot directory {}", dir.display()))?;

        let mut tmp = NamedTempFile::new_in(dir)
            .with_context(|| format!("failed to create temp file in {}", dir.display()))?;
        serde_json::to_writer_pretty(&mut tmp, snapshot).context("failed to encode snapshot")?;
        tmp.write_all(b"\n")
            .and_then(|()| tmp.as_file().sync_all())
            .with_context(|| format!("failed to write {}", tmp.path().display()))?;
        debug!(tmp = %tmp.path().display(), "snapshot staged");
        tmp.persist(&self.path)
            .map_err(|err| err.error)
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        info!(
            path = %self.path.display(),
            albums = snapshot.albums.len(),
            photos = snapshot.photo_count(),
            "snapshot saved"
        );
        Ok(())
    }
}
