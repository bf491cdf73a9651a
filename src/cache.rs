use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use tracing::info;

use crate::error::CacheError;
use crate::snapshot::Snapshot;

/// Flat, in-memory list of every photo id in the snapshot.
///
/// Owned by the control loop and rebuilt wholesale after each refresh.
#[derive(Debug)]
pub struct PhotoCache {
    photo_ids: Vec<String>,
    rng: StdRng,
}

impl PhotoCache {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            photo_ids: Vec::new(),
            rng,
        }
    }

    /// Replace the contents with the snapshot's photo ids, in album order.
    pub fn populate(&mut self, snapshot: &Snapshot) {
        self.photo_ids = snapshot
            .albums
            .iter()
            .flat_map(|album| album.photo_ids.iter().cloned())
            .collect();
        info!(photos = self.photo_ids.len(), "cache is populated");
    }

    /// Uniform pick with replacement; repeats across calls are allowed.
    pub fn pick_random(&mut self) -> Result<&str, CacheError> {
        if self.photo_ids.is_empty() {
            return Err(CacheError::Empty);
        }
        self.photo_ids
            .choose(&mut self.rng)
            .map(String::as_str)
            .ok_or(CacheError::Empty)
    }

    pub fn photo_ids(&self) -> &[String] {
        &self.photo_ids
    }

    pub fn len(&self) -> usize {
        self.photo_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photo_ids.is_empty()
    }
}
