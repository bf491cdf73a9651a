use tracing::{debug, info};

use super::{AlbumDescriptor, MediaItem, PhotoLibrary};
use crate::error::{FatalError, RemoteError};
use crate::retry::{Lookup, RetryPolicy, Sleeper, TokioSleeper};

/// Paginated enumeration of the remote library; every call goes through the retry policy.
#[derive(Debug, Clone)]
pub struct RemoteLibraryClient<L, S = TokioSleeper> {
    library: L,
    retry: RetryPolicy<S>,
    size_suffix: String,
}

impl<L: PhotoLibrary, S: Sleeper> RemoteLibraryClient<L, S> {
    pub fn new(library: L, retry: RetryPolicy<S>, size_suffix: impl Into<String>) -> Self {
        Self {
            library,
            retry,
            size_suffix: size_suffix.into(),
        }
    }

    /// Follow `nextPageToken` until exhausted and return every album in remote order.
    ///
    /// A not-found answer on the listing itself is fatal: treating it as an empty
    /// library would drop every album from the snapshot.
    pub async fn fetch_all_albums(&self) -> Result<Vec<AlbumDescriptor>, FatalError> {
        info!("loading album metadata");
        let library = &self.library;
        let mut albums = Vec::new();
        let mut page_token: Option<String> = None;
        let mut page = 0usize;
        loop {
            page += 1;
            let call = format!("albums.list (page {page})");
            let token = page_token.as_deref();
            let response = match self
                .retry
                .execute(&call, move || library.list_albums(token))
                .await?
            {
                Lookup::Found(response) => response,
                Lookup::Missing => return Err(FatalError::UnexpectedNotFound { call }),
            };
            albums.extend(response.albums);
            page_token = next_token(response.next_page_token);
            if page_token.is_none() {
                break;
            }
        }
        info!(count = albums.len(), pages = page, "albums loaded");
        Ok(albums)
    }

    /// All image items of one album, in remote order. Videos and other media are dropped.
    pub async fn fetch_album_photos(
        &self,
        album: &AlbumDescriptor,
    ) -> Result<Lookup<Vec<MediaItem>>, FatalError> {
        info!(album = %album.title, "loading album photos");
        let library = &self.library;
        let album_id = album.id.as_str();
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;
        let mut page = 0usize;
        loop {
            page += 1;
            let call = format!(
                "mediaItems.search (album {:?} [{}], page {page})",
                album.title, album.id
            );
            let token = page_token.as_deref();
            let response = match self
                .retry
                .execute(&call, move || library.search_album(album_id, token))
                .await?
            {
                Lookup::Found(response) => response,
                Lookup::Missing => return Ok(Lookup::Missing),
            };
            items.extend(response.media_items);
            page_token = next_token(response.next_page_token);
            if page_token.is_none() {
                break;
            }
        }

        let fetched = items.len();
        items.retain(MediaItem::is_image);
        debug!(
            album = %album.title,
            fetched,
            skipped = fetched - items.len(),
            "non-image media filtered"
        );
        info!(album = %album.title, photos = items.len(), "album photos loaded");
        Ok(Lookup::Found(items))
    }

    /// Display URL of a single photo: its current base URL plus the size suffix.
    pub async fn resolve_photo_url(&self, photo_id: &str) -> Result<Lookup<String>, FatalError> {
        let library = &self.library;
        let call = format!("mediaItems.get ({photo_id})");
        let item = match self
            .retry
            .execute(&call, move || library.get_media_item(photo_id))
            .await?
        {
            Lookup::Found(item) => item,
            Lookup::Missing => return Ok(Lookup::Missing),
        };
        if item.base_url.is_empty() {
            return Err(FatalError::Remote {
                call,
                source: RemoteError::Decode("media item carries no baseUrl".to_string()),
            });
        }
        info!(photo = %photo_id, url = %item.product_url, "photo loaded");
        Ok(Lookup::Found(format!("{}{}", item.base_url, self.size_suffix)))
    }
}

fn next_token(token: Option<String>) -> Option<String> {
    token.filter(|t| !t.is_empty())
}
