use std::collections::BTreeSet;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Configuration {
    /// JSON file holding the local mirror of the remote library.
    pub snapshot_path: PathBuf,
    /// Album titles that are never newly added to the snapshot.
    pub ignored_albums: BTreeSet<String>,
    /// Time between two reconciliations with the remote library.
    #[serde(with = "humantime_serde")]
    pub refresh_interval: Duration,
    /// Time each photo stays on screen.
    #[serde(with = "humantime_serde")]
    pub rotation_interval: Duration,
    /// Optional deterministic seed for photo selection.
    pub cache_seed: Option<u64>,
    pub retry: RetryOptions,
    pub remote: RemoteOptions,
    pub display: DisplayOptions,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(
            !self.snapshot_path.as_os_str().is_empty(),
            "snapshot-path must not be empty"
        );
        ensure!(
            !self.refresh_interval.is_zero(),
            "refresh-interval must be greater than zero"
        );
        ensure!(
            !self.rotation_interval.is_zero(),
            "rotation-interval must be greater than zero"
        );
        self.retry.validate().context("invalid retry options")?;
        self.remote.validate().context("invalid remote options")?;
        self.display.validate().context("invalid display options")?;
        Ok(self)
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from("albums.json"),
            ignored_albums: BTreeSet::new(),
            refresh_interval: Duration::from_secs(6 * 60 * 60),
            rotation_interval: Duration::from_secs(60),
            cache_seed: None,
            retry: RetryOptions::default(),
            remote: RemoteOptions::default(),
            display: DisplayOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RetryOptions {
    /// Fixed wait after a transient failure.
    #[serde(with = "humantime_serde")]
    pub delay: Duration,
    /// Give up after this many attempts; unbounded when unset.
    pub max_attempts: Option<NonZeroU32>,
}

impl RetryOptions {
    const fn default_delay() -> Duration {
        Duration::from_secs(30)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(!self.delay.is_zero(), "retry.delay must be greater than zero");
        Ok(())
    }
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            delay: Self::default_delay(),
            max_attempts: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RemoteOptions {
    pub api_endpoint: String,
    /// Bearer token maintained by the external credential helper.
    pub access_token_path: PathBuf,
    pub album_page_size: u32,
    pub photo_page_size: u32,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl RemoteOptions {
    pub const MAX_ALBUM_PAGE_SIZE: u32 = 50;
    pub const MAX_PHOTO_PAGE_SIZE: u32 = 100;

    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.api_endpoint.trim().is_empty(),
            "remote.api-endpoint must not be empty"
        );
        ensure!(
            (1..=Self::MAX_ALBUM_PAGE_SIZE).contains(&self.album_page_size),
            "remote.album-page-size must be between 1 and {}",
            Self::MAX_ALBUM_PAGE_SIZE
        );
        ensure!(
            (1..=Self::MAX_PHOTO_PAGE_SIZE).contains(&self.photo_page_size),
            "remote.photo-page-size must be between 1 and {}",
            Self::MAX_PHOTO_PAGE_SIZE
        );
        ensure!(
            !self.request_timeout.is_zero(),
            "remote.request-timeout must be greater than zero"
        );
        Ok(())
    }
}

impl Default for RemoteOptions {
    fn default() -> Self {
        Self {
            api_endpoint: "https://photoslibrary.googleapis.com".to_string(),
            access_token_path: PathBuf::from("token.txt"),
            album_page_size: Self::MAX_ALBUM_PAGE_SIZE,
            photo_page_size: Self::MAX_PHOTO_PAGE_SIZE,
            request_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct DisplayOptions {
    /// Appended to an item's base URL to request a rendition size.
    pub size_suffix: String,
    /// Viewer argv; `{url}` is replaced with the photo URL. Log-only when unset.
    pub command: Option<Vec<String>>,
}

impl DisplayOptions {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.size_suffix.is_empty(),
            "display.size-suffix must not be empty"
        );
        if let Some(command) = &self.command {
            ensure!(
                !command.is_empty(),
                "display.command must name a program when present"
            );
        }
        Ok(())
    }
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            size_suffix: "=w2048-h1024".to_string(),
            command: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let cfg: Configuration = serde_yaml::from_str("{}").expect("parse config");
        let cfg = cfg.validated().expect("defaults are valid");
        assert_eq!(cfg.snapshot_path, PathBuf::from("albums.json"));
        assert_eq!(cfg.refresh_interval, Duration::from_secs(6 * 3600));
        assert_eq!(cfg.rotation_interval, Duration::from_secs(60));
        assert_eq!(cfg.retry.delay, Duration::from_secs(30));
        assert!(cfg.retry.max_attempts.is_none());
        assert_eq!(cfg.remote.album_page_size, 50);
        assert_eq!(cfg.remote.photo_page_size, 100);
        assert_eq!(cfg.display.size_suffix, "=w2048-h1024");
        assert!(cfg.display.command.is_none());
    }

    #[test]
    fn parses_kebab_case_keys_and_humantime_durations() {
        let cfg: Configuration = serde_yaml::from_str(
            r#"
snapshot-path: /var/lib/album-frame/albums.json
ignored-albums:
  - "Israel 08.2014"
  - "Nastya HB 2014"
refresh-interval: 2h
rotation-interval: 45s
cache-seed: 7
retry:
  delay: 5s
  max-attempts: 10
remote:
  photo-page-size: 25
display:
  command: ["feh", "--fullscreen", "{url}"]
"#,
        )
        .expect("parse config");
        let cfg = cfg.validated().expect("valid config");
        assert!(cfg.ignored_albums.contains("Nastya HB 2014"));
        assert!(!cfg.ignored_albums.contains("Summer"));
        assert_eq!(cfg.refresh_interval, Duration::from_secs(7200));
        assert_eq!(cfg.rotation_interval, Duration::from_secs(45));
        assert_eq!(cfg.cache_seed, Some(7));
        assert_eq!(cfg.retry.delay, Duration::from_secs(5));
        assert_eq!(cfg.retry.max_attempts.map(NonZeroU32::get), Some(10));
        assert_eq!(cfg.remote.photo_page_size, 25);
        assert_eq!(cfg.remote.album_page_size, 50);
        assert_eq!(
            cfg.display.command.as_deref(),
            Some(&["feh".to_string(), "--fullscreen".to_string(), "{url}".to_string()][..])
        );
    }

    #[test]
    fn rejects_oversized_album_pages() {
        let cfg: Configuration =
            serde_yaml::from_str("remote:\n  album-page-size: 51\n").expect("parse config");
        let err = cfg.validated().expect_err("page size above limit");
        assert!(format!("{err:#}").contains("album-page-size"));
    }

    #[test]
    fn rejects_zero_max_attempts_at_parse_time() {
        let parsed: Result<Configuration, _> = serde_yaml::from_str("retry:\n  max-attempts: 0\n");
        assert!(parsed.is_err());
    }

    #[test]
    fn rejects_empty_display_command() {
        let cfg: Configuration =
            serde_yaml::from_str("display:\n  command: []\n").expect("parse config");
        assert!(cfg.validated().is_err());
    }
}
