//! Remote photo library: wire types, the raw call seam, and the paginating client.

mod client;
mod google;

use std::future::Future;

use serde::{Deserialize, Deserializer};

use crate::error::RemoteError;

pub use client::RemoteLibraryClient;
pub use google::GooglePhotosApi;

/// Album metadata as listed by the remote library.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumDescriptor {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, rename = "productUrl")]
    pub url: String,
    /// Raw remote count; includes videos and other non-image media.
    #[serde(
        default,
        rename = "mediaItemsCount",
        deserialize_with = "count_from_string_or_number"
    )]
    pub media_count: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumPage {
    #[serde(default)]
    pub albums: Vec<AlbumDescriptor>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub id: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub product_url: String,
}

impl MediaItem {
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaPage {
    #[serde(default)]
    pub media_items: Vec<MediaItem>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// One raw request against the remote library. No retries happen at this level.
pub trait PhotoLibrary: Send + Sync {
    fn list_albums(
        &self,
        page_token: Option<&str>,
    ) -> impl Future<Output = Result<AlbumPage, RemoteError>> + Send;

    fn search_album(
        &self,
        album_id: &str,
        page_token: Option<&str>,
    ) -> impl Future<Output = Result<MediaPage, RemoteError>> + Send;

    fn get_media_item(&self, id: &str)
    -> impl Future<Output = Result<MediaItem, RemoteError>> + Send;
}

// The service encodes int64 values as decimal strings.
fn count_from_string_or_number<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Count {
        Number(u64),
        Text(String),
    }

    match Option::<Count>::deserialize(deserializer)? {
        None => Ok(0),
        Some(Count::Number(n)) => Ok(n),
        Some(Count::Text(s)) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}
