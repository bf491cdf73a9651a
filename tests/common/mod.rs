#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use album_frame::display::Display;
use album_frame::error::RemoteError;
use album_frame::remote::{
    AlbumDescriptor, AlbumPage, MediaItem, MediaPage, PhotoLibrary, RemoteLibraryClient,
};
use album_frame::retry::{RetryPolicy, Sleeper};

pub const SIZE_SUFFIX: &str = "=w2048-h1024";

pub fn image(id: &str) -> MediaItem {
    MediaItem {
        id: id.to_string(),
        mime_type: "image/jpeg".to_string(),
        base_url: format!("https://lh3.example/{id}"),
        product_url: format!("https://photos.example/photo/{id}"),
    }
}

pub fn video(id: &str) -> MediaItem {
    MediaItem {
        id: id.to_string(),
        mime_type: "video/mp4".to_string(),
        base_url: format!("https://lh3.example/{id}"),
        product_url: format!("https://photos.example/photo/{id}"),
    }
}

pub fn images(prefix: &str, count: usize) -> Vec<MediaItem> {
    (1..=count).map(|n| image(&format!("{prefix}-{n}"))).collect()
}

pub fn unavailable() -> RemoteError {
    RemoteError::Status {
        status: 503,
        body: "Service Unavailable".to_string(),
    }
}

pub fn not_found() -> RemoteError {
    RemoteError::Status {
        status: 404,
        body: "The provided ID does not match any media items.".to_string(),
    }
}

pub fn forbidden() -> RemoteError {
    RemoteError::Status {
        status: 403,
        body: "Forbidden".to_string(),
    }
}

#[derive(Default)]
struct LibraryState {
    albums: Vec<AlbumDescriptor>,
    photos: HashMap<String, Vec<MediaItem>>,
    failures: HashMap<String, VecDeque<RemoteError>>,
    calls: Vec<String>,
}

/// In-memory remote library with scripted failures.
///
/// Call keys: `list`, `search:<album id>`, `get:<photo id>`.
#[derive(Clone)]
pub struct FakeLibrary {
    state: Arc<Mutex<LibraryState>>,
    album_page_size: usize,
    photo_page_size: usize,
}

impl Default for FakeLibrary {
    fn default() -> Self {
        Self::with_page_sizes(50, 100)
    }
}

impl FakeLibrary {
    pub fn with_page_sizes(album_page_size: usize, photo_page_size: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(LibraryState::default())),
            album_page_size,
            photo_page_size,
        }
    }

    /// Add an album whose remote media count equals its item count.
    pub fn add_album(&self, id: &str, title: &str, items: Vec<MediaItem>) {
        let mut state = self.state.lock().unwrap();
        state.albums.push(AlbumDescriptor {
            id: id.to_string(),
            title: title.to_string(),
            url: format!("https://photos.example/album/{id}"),
            media_count: items.len() as u64,
        });
        state.photos.insert(id.to_string(), items);
    }

    pub fn set_items(&self, id: &str, items: Vec<MediaItem>) {
        let mut state = self.state.lock().unwrap();
        let count = items.len() as u64;
        if let Some(album) = state.albums.iter_mut().find(|a| a.id == id) {
            album.media_count = count;
        }
        state.photos.insert(id.to_string(), items);
    }

    pub fn rename_album(&self, id: &str, title: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(album) = state.albums.iter_mut().find(|a| a.id == id) {
            album.title = title.to_string();
        }
    }

    /// Remove from the listing and from search.
    pub fn remove_album(&self, id: &str) {
        let mut state = self.state.lock().unwrap();
        state.albums.retain(|a| a.id != id);
        state.photos.remove(id);
    }

    /// Keep the album in the listing but make its photo search answer 404.
    pub fn hide_album_photos(&self, id: &str) {
        self.state.lock().unwrap().photos.remove(id);
    }

    pub fn reverse_listing(&self) {
        self.state.lock().unwrap().albums.reverse();
    }

    pub fn fail_next(&self, key: &str, err: RemoteError) {
        self.state
            .lock()
            .unwrap()
            .failures
            .entry(key.to_string())
            .or_default()
            .push_back(err);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count_calls(&self, key: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|call| call.as_str() == key)
            .count()
    }

    fn begin(&self, key: String) -> Result<(), RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(key.clone());
        match state.failures.get_mut(&key).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn page_bounds(token: Option<&str>, len: usize, size: usize) -> (usize, usize, Option<String>) {
    let start = token.and_then(|t| t.parse::<usize>().ok()).unwrap_or(0).min(len);
    let end = (start + size).min(len);
    let next = (end < len).then(|| end.to_string());
    (start, end, next)
}

impl PhotoLibrary for FakeLibrary {
    async fn list_albums(&self, page_token: Option<&str>) -> Result<AlbumPage, RemoteError> {
        self.begin("list".to_string())?;
        let state = self.state.lock().unwrap();
        let (start, end, next) = page_bounds(page_token, state.albums.len(), self.album_page_size);
        Ok(AlbumPage {
            albums: state.albums[start..end].to_vec(),
            next_page_token: next,
        })
    }

    async fn search_album(
        &self,
        album_id: &str,
        page_token: Option<&str>,
    ) -> Result<MediaPage, RemoteError> {
        self.begin(format!("search:{album_id}"))?;
        let state = self.state.lock().unwrap();
        let items = state.photos.get(album_id).ok_or_else(not_found)?;
        let (start, end, next) = page_bounds(page_token, items.len(), self.photo_page_size);
        Ok(MediaPage {
            media_items: items[start..end].to_vec(),
            next_page_token: next,
        })
    }

    async fn get_media_item(&self, id: &str) -> Result<MediaItem, RemoteError> {
        self.begin(format!("get:{id}"))?;
        let state = self.state.lock().unwrap();
        state
            .photos
            .values()
            .flatten()
            .find(|item| item.id == id)
            .cloned()
            .ok_or_else(not_found)
    }
}

/// Records every requested wait and returns immediately.
#[derive(Clone, Default)]
pub struct CountingSleeper {
    waits: Arc<Mutex<Vec<Duration>>>,
}

impl CountingSleeper {
    pub fn count(&self) -> usize {
        self.waits.lock().unwrap().len()
    }

    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().unwrap().clone()
    }
}

impl Sleeper for CountingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.waits.lock().unwrap().push(duration);
    }
}

pub fn retry_policy(sleeper: &CountingSleeper) -> RetryPolicy<CountingSleeper> {
    RetryPolicy::new(Duration::from_secs(30)).with_sleeper(sleeper.clone())
}

pub fn client(
    library: &FakeLibrary,
    sleeper: &CountingSleeper,
) -> RemoteLibraryClient<FakeLibrary, CountingSleeper> {
    RemoteLibraryClient::new(library.clone(), retry_policy(sleeper), SIZE_SUFFIX)
}

/// Display that remembers what it was asked to show.
#[derive(Clone, Default)]
pub struct RecordingDisplay {
    shown: Arc<Mutex<Vec<String>>>,
    closes: Arc<AtomicUsize>,
}

impl RecordingDisplay {
    pub fn shown(&self) -> Vec<String> {
        self.shown.lock().unwrap().clone()
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl Display for RecordingDisplay {
    async fn show(&mut self, url: &str) -> anyhow::Result<()> {
        self.shown.lock().unwrap().push(url.to_string());
        Ok(())
    }

    async fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}
