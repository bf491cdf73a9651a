//! Computes a new snapshot from the previous one and the current remote state.

use std::collections::{BTreeSet, HashMap, HashSet};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::error::FatalError;
use crate::remote::{PhotoLibrary, RemoteLibraryClient};
use crate::retry::{Lookup, Sleeper, TokioSleeper};
use crate::snapshot::{Album, Snapshot, SnapshotStore};

/// Outcome of one successful reconciliation pass.
#[derive(Debug, Clone)]
pub struct RefreshReport {
    pub snapshot: Snapshot,
    /// Titles of albums appended to the snapshot.
    pub added: Vec<String>,
    /// Titles of albums whose photo list was refetched.
    pub updated: Vec<String>,
    /// Titles of albums dropped because the remote no longer lists them.
    pub removed: Vec<String>,
    /// Titles of new albums left out because of the ignore list.
    pub ignored: Vec<String>,
    /// Titles of albums that disappeared between the listing and the photo fetch.
    pub vanished: Vec<String>,
}

impl RefreshReport {
    fn new(snapshot: Snapshot) -> Self {
        Self {
            snapshot,
            added: Vec::new(),
            updated: Vec::new(),
            removed: Vec::new(),
            ignored: Vec::new(),
            vanished: Vec::new(),
        }
    }
}

pub struct ReconciliationEngine<L, S = TokioSleeper> {
    client: RemoteLibraryClient<L, S>,
    ignored_albums: BTreeSet<String>,
}

impl<L: PhotoLibrary, S: Sleeper> ReconciliationEngine<L, S> {
    pub fn new(client: RemoteLibraryClient<L, S>, ignored_albums: BTreeSet<String>) -> Self {
        Self {
            client,
            ignored_albums,
        }
    }

    pub fn client(&self) -> &RemoteLibraryClient<L, S> {
        &self.client
    }

    /// Bootstrap when the store is empty, otherwise refresh what it holds.
    pub async fn sync(&self, store: &SnapshotStore) -> Result<RefreshReport> {
        match store.load()? {
            Some(previous) => self.refresh(&previous, store).await,
            None => self.bootstrap(store).await,
        }
    }

    /// Build the first snapshot from every remote album and persist it.
    pub async fn bootstrap(&self, store: &SnapshotStore) -> Result<RefreshReport> {
        info!("creating new snapshot; loading all photos from the remote library");
        let report = self.reconcile(&[]).await.context("bootstrap aborted")?;
        store.save(&report.snapshot)?;
        info!(
            albums = report.snapshot.albums.len(),
            photos = report.snapshot.photo_count(),
            "bootstrap finished"
        );
        Ok(report)
    }

    /// Reconcile `previous` against the remote and persist the result.
    ///
    /// Nothing is written unless the whole pass completes.
    pub async fn refresh(&self, previous: &Snapshot, store: &SnapshotStore) -> Result<RefreshReport> {
        info!(since = %previous.captured_at, "starting snapshot refresh");
        let report = self
            .reconcile(&previous.albums)
            .await
            .context("refresh aborted; previous snapshot left in place")?;
        store.save(&report.snapshot)?;
        info!(
            added = report.added.len(),
            updated = report.updated.len(),
            removed = report.removed.len(),
            photos = report.snapshot.photo_count(),
            "snapshot refresh finished"
        );
        Ok(report)
    }

    /// In-memory pass: fetch the remote listing, diff it against `previous`, and
    /// return the new snapshot stamped with the current time.
    pub async fn reconcile(&self, previous: &[Album]) -> Result<RefreshReport, FatalError> {
        let remote = self.client.fetch_all_albums().await?;
        let total = remote.len();

        let mut albums: Vec<Album> = previous.to_vec();
        let mut positions: HashMap<String, usize> = albums
            .iter()
            .enumerate()
            .map(|(pos, album)| (album.id.clone(), pos))
            .collect();
        let mut report = RefreshReport::new(Snapshot::new(Vec::new()));

        for (n, descriptor) in remote.iter().enumerate() {
            info!(album = %descriptor.title, "processing album {}/{}", n + 1, total);

            if let Some(&pos) = positions.get(&descriptor.id) {
                let album = &mut albums[pos];
                if self.ignored_albums.contains(&descriptor.title) {
                    debug!(album = %descriptor.title, "ignored title already in snapshot; keeping it");
                }
                if album.known_media_count() == descriptor.media_count {
                    album.settle(descriptor.media_count);
                    continue;
                }
                info!(
                    album = %descriptor.title,
                    from = album.known_media_count(),
                    to = descriptor.media_count,
                    "album size changed"
                );
                match self.client.fetch_album_photos(descriptor).await? {
                    Lookup::Found(photos) => {
                        album.replace_photos(descriptor.media_count, &photos);
                        report.updated.push(album.title.clone());
                    }
                    Lookup::Missing => {
                        warn!(album = %descriptor.title, "album vanished while loading photos; keeping previous entry");
                        report.vanished.push(descriptor.title.clone());
                    }
                }
                continue;
            }

            if self.ignored_albums.contains(&descriptor.title) {
                info!(album = %descriptor.title, "skipping ignored album");
                report.ignored.push(descriptor.title.clone());
                continue;
            }

            match self.client.fetch_album_photos(descriptor).await? {
                Lookup::Found(photos) => {
                    positions.insert(descriptor.id.clone(), albums.len());
                    albums.push(Album::from_remote(descriptor, &photos));
                    info!(album = %descriptor.title, url = %descriptor.url, "album was added");
                    report.added.push(descriptor.title.clone());
                }
                Lookup::Missing => {
                    warn!(album = %descriptor.title, "album vanished while loading photos; not added");
                    report.vanished.push(descriptor.title.clone());
                }
            }
        }

        let remote_ids: HashSet<&str> = remote.iter().map(|d| d.id.as_str()).collect();
        albums.retain(|album| {
            let keep = remote_ids.contains(album.id.as_str());
            if !keep {
                report.removed.push(album.title.clone());
            }
            keep
        });
        for title in &report.removed {
            info!(album = %title, "album was removed");
        }

        report.snapshot = Snapshot::new(albums);
        Ok(report)
    }
}
