use std::path::PathBuf;

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::trace;

use super::{AlbumPage, MediaItem, MediaPage, PhotoLibrary};
use crate::config::RemoteOptions;
use crate::error::RemoteError;

/// Photos Library REST API over `reqwest`.
///
/// The access token is re-read from disk for every request so the external
/// credential helper can rotate it while the frame keeps running.
#[derive(Debug, Clone)]
pub struct GooglePhotosApi {
    http: Client,
    endpoint: String,
    token_path: PathBuf,
    album_page_size: u32,
    photo_page_size: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    album_id: &'a str,
    page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_token: Option<&'a str>,
}

impl GooglePhotosApi {
    pub fn new(options: &RemoteOptions) -> Result<Self> {
        let http = Client::builder()
            .timeout(options.request_timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            endpoint: options.api_endpoint.trim_end_matches('/').to_string(),
            token_path: options.access_token_path.clone(),
            album_page_size: options.album_page_size,
            photo_page_size: options.photo_page_size,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    async fn access_token(&self) -> Result<String, RemoteError> {
        let raw = tokio::fs::read_to_string(&self.token_path)
            .await
            .map_err(|err| {
                RemoteError::Credentials(format!("{}: {err}", self.token_path.display()))
            })?;
        let token = raw.trim();
        if token.is_empty() {
            return Err(RemoteError::Credentials(format!(
                "{} is empty",
                self.token_path.display()
            )));
        }
        Ok(token.to_string())
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, RemoteError> {
        let token = self.access_token().await?;
        let response = request.bearer_auth(token).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let bytes = response.bytes().await?;
        trace!(len = bytes.len(), "response body received");
        serde_json::from_slice(&bytes).map_err(|err| RemoteError::Decode(err.to_string()))
    }
}

impl PhotoLibrary for GooglePhotosApi {
    async fn list_albums(&self, page_token: Option<&str>) -> Result<AlbumPage, RemoteError> {
        let mut request = self
            .http
            .get(self.url("/v1/albums"))
            .query(&[("pageSize", self.album_page_size.to_string())]);
        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }
        self.send(request).await
    }

    async fn search_album(
        &self,
        album_id: &str,
        page_token: Option<&str>,
    ) -> Result<MediaPage, RemoteError> {
        let body = SearchRequest {
            album_id,
            page_size: self.photo_page_size,
            page_token,
        };
        let request = self.http.post(self.url("/v1/mediaItems:search")).json(&body);
        self.send(request).await
    }

    async fn get_media_item(&self, id: &str) -> Result<MediaItem, RemoteError> {
        let request = self.http.get(self.url(&format!("/v1/mediaItems/{id}")));
        self.send(request).await
    }
}
