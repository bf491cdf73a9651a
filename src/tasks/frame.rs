use std::time::Duration;

use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::cache::PhotoCache;
use crate::display::Display;
use crate::reconcile::ReconciliationEngine;
use crate::remote::PhotoLibrary;
use crate::retry::{Lookup, Sleeper};
use crate::schedule::RefreshSchedule;
use crate::snapshot::SnapshotStore;

/// What one rotation tick ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShowOutcome {
    Shown { photo_id: String, url: String },
    EmptyCache,
    /// The picked photo was deleted remotely since the last refresh.
    PhotoMissing { photo_id: String },
    Failed { photo_id: String },
}

/// The single control loop: keeps the snapshot in sync and rotates photos.
pub struct Frame<L, S, D> {
    engine: ReconciliationEngine<L, S>,
    store: SnapshotStore,
    display: D,
    refresh_interval: Duration,
    rotation_interval: Duration,
}

impl<L: PhotoLibrary, S: Sleeper, D: Display> Frame<L, S, D> {
    pub fn new(
        engine: ReconciliationEngine<L, S>,
        store: SnapshotStore,
        display: D,
        refresh_interval: Duration,
        rotation_interval: Duration,
    ) -> Self {
        Self {
            engine,
            store,
            display,
            refresh_interval,
            rotation_interval,
        }
    }

    /// Bootstrap or refresh the snapshot, then rebuild `cache` from it.
    ///
    /// On failure the previous cache is kept and `false` is returned.
    pub async fn refresh(&self, cache: &mut PhotoCache) -> bool {
        match self.engine.sync(&self.store).await {
            Ok(report) => {
                cache.populate(&report.snapshot);
                true
            }
            Err(err) => {
                error!("snapshot refresh failed; keeping previous photos: {err:?}");
                false
            }
        }
    }

    /// First sync at startup. Falls back to whatever snapshot is on disk.
    pub async fn startup(&self, cache: &mut PhotoCache) -> bool {
        if self.refresh(cache).await {
            return true;
        }
        match self.store.load() {
            Ok(Some(snapshot)) => {
                warn!("using previously persisted snapshot until the next refresh");
                cache.populate(&snapshot);
            }
            Ok(None) => warn!("no snapshot available yet; nothing to show"),
            Err(err) => error!("failed to load persisted snapshot: {err:?}"),
        }
        false
    }

    /// Pick one photo, resolve its display URL, and hand it to the display.
    pub async fn show_next(&mut self, cache: &mut PhotoCache) -> ShowOutcome {
        let photo_id = match cache.pick_random() {
            Ok(id) => id.to_string(),
            Err(err) => {
                warn!("{err}; skipping this tick");
                return ShowOutcome::EmptyCache;
            }
        };
        info!(photo = %photo_id, "getting new photo from cache");

        let url = match self.engine.client().resolve_photo_url(&photo_id).await {
            Ok(Lookup::Found(url)) => url,
            Ok(Lookup::Missing) => {
                info!(photo = %photo_id, "photo is gone remotely; skipping this tick");
                return ShowOutcome::PhotoMissing { photo_id };
            }
            Err(err) => {
                error!(photo = %photo_id, "failed to resolve photo url: {:?}", anyhow::Error::new(err));
                return ShowOutcome::Failed { photo_id };
            }
        };

        if let Err(err) = self.display.show(&url).await {
            error!(photo = %photo_id, "display rejected photo: {err:?}");
            return ShowOutcome::Failed { photo_id };
        }
        ShowOutcome::Shown { photo_id, url }
    }

    /// Run until `cancel` fires. The display is closed on every exit path and
    /// the cache is handed back to the caller.
    #[instrument(skip_all, fields(snapshot = %self.store.path().display()))]
    pub async fn run(mut self, mut cache: PhotoCache, cancel: CancellationToken) -> PhotoCache {
        self.drive(&mut cache, &cancel).await;
        self.display.close().await;
        info!("frame loop stopped; display released");
        cache
    }

    async fn drive(&mut self, cache: &mut PhotoCache, cancel: &CancellationToken) {
        let started = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("cancel received during startup sync");
                return;
            }
            ok = self.startup(cache) => ok,
        };

        let mut schedule = RefreshSchedule::new(self.refresh_interval, Instant::now());
        if !started && cache.is_empty() {
            schedule.expedite(Instant::now());
        } else {
            schedule.log_next();
        }

        loop {
            if schedule.is_due(Instant::now()) {
                let refreshed = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    ok = self.refresh(cache) => ok,
                };
                if refreshed || !cache.is_empty() {
                    schedule.mark_done(Instant::now());
                } else {
                    warn!("no photos to show; retrying refresh on the next tick");
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = self.show_next(cache) => {}
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = sleep(self.rotation_interval) => {}
            }
        }
        info!("cancel received; exiting frame loop");
    }
}
