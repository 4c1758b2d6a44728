//! Background check for a newer release on GitHub.
//!
//! The latest release is looked up at most once a day; the answer is cached
//! in `update_check.json` next to the config file.

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::app::Result;
use crate::fetcher::{Fetcher, HttpFetcher};

pub const RELEASES_URL: &str = "https://api.github.com/repos/JonathanWThom/feedme/releases/latest";
const CACHE_FILE: &str = "update_check.json";
const CHECK_INTERVAL_HOURS: i64 = 24;
const TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateInfo {
    pub current_version: String,
    pub latest_version: String,
    pub update_url: String,
}

impl UpdateInfo {
    pub fn has_update(&self) -> bool {
        !self.latest_version.is_empty()
            && self.latest_version != self.current_version
            && compare_versions(&self.latest_version, &self.current_version) == Ordering::Greater
    }

    /// Status bar text, empty when already up to date.
    pub fn message(&self) -> String {
        if !self.has_update() {
            return String::new();
        }
        format!(
            "Update available: {} → {}",
            self.current_version, self.latest_version
        )
    }
}

#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
    html_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct CheckCache {
    last_check: DateTime<Utc>,
    latest_version: String,
    update_url: String,
}

/// Compare dotted versions numerically, ignoring a leading `v`. Missing or
/// non-numeric parts count as zero.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let parts = |v: &str| -> Vec<u64> {
        v.trim_start_matches('v')
            .split('.')
            .map(|p| p.parse().unwrap_or(0))
            .collect()
    };
    let (a, b) = (parts(a), parts(b));

    for i in 0..a.len().max(b.len()) {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

/// Check the public releases feed, using the cache under the user's config
/// directory. Never fails; problems are logged and yield `None`.
pub async fn check_for_update(current_version: &str) -> Option<UpdateInfo> {
    let cache_path = dirs::config_dir().map(|dir| dir.join("feedme").join(CACHE_FILE));
    UpdateChecker::new(RELEASES_URL, cache_path)
        .check(current_version)
        .await
}

pub struct UpdateChecker {
    releases_url: String,
    cache_path: Option<PathBuf>,
}

impl UpdateChecker {
    pub fn new(releases_url: &str, cache_path: Option<PathBuf>) -> Self {
        Self {
            releases_url: releases_url.to_string(),
            cache_path,
        }
    }

    pub async fn check(&self, current_version: &str) -> Option<UpdateInfo> {
        if current_version.is_empty() || current_version == "dev" {
            return None;
        }

        if let Some(path) = &self.cache_path {
            match load_cache(path) {
                Ok(cache)
                    if Utc::now() - cache.last_check
                        < chrono::Duration::hours(CHECK_INTERVAL_HOURS) =>
                {
                    tracing::debug!(latest = %cache.latest_version, "Using cached update check");
                    return Some(UpdateInfo {
                        current_version: current_version.to_string(),
                        latest_version: cache.latest_version,
                        update_url: cache.update_url,
                    });
                }
                Ok(_) => {}
                Err(e) => tracing::debug!(error = %e, "No usable update cache"),
            }
        }

        let info = match self.latest_release(current_version).await {
            Ok(info) => info,
            Err(e) => {
                tracing::debug!(error = %e, "Update check failed");
                return None;
            }
        };

        if let Some(path) = &self.cache_path {
            let cache = CheckCache {
                last_check: Utc::now(),
                latest_version: info.latest_version.clone(),
                update_url: info.update_url.clone(),
            };
            if let Err(e) = save_cache(path, &cache) {
                tracing::debug!(error = %e, path = %path.display(), "Could not write update cache");
            }
        }

        Some(info)
    }

    async fn latest_release(&self, current_version: &str) -> Result<UpdateInfo> {
        let fetcher = HttpFetcher::with_timeout(
            &format!("feedme/{}", current_version),
            TIMEOUT,
        )?
        .accept("application/vnd.github+json");
        let body = fetcher.fetch(&self.releases_url).await?;
        let release: Release = serde_json::from_slice(&body)?;

        Ok(UpdateInfo {
            current_version: current_version.to_string(),
            latest_version: release.tag_name,
            update_url: release.html_url,
        })
    }
}

fn load_cache(path: &Path) -> Result<CheckCache> {
    let data = fs::read(path)?;
    Ok(serde_json::from_slice(&data)?)
}

fn save_cache(path: &Path, cache: &CheckCache) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let data = serde_json::to_vec(cache)?;
    fs::write(path, data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(current: &str, latest: &str) -> UpdateInfo {
        UpdateInfo {
            current_version: current.to_string(),
            latest_version: latest.to_string(),
            update_url: String::new(),
        }
    }

    #[test]
    fn test_compare_versions() {
        assert_eq!(compare_versions("v1.2.0", "1.1.9"), Ordering::Greater);
        assert_eq!(compare_versions("1.10.0", "1.9.0"), Ordering::Greater);
        assert_eq!(compare_versions("1.0", "1.0.0"), Ordering::Equal);
        assert_eq!(compare_versions("v0.9", "1.0.0"), Ordering::Less);
        assert_eq!(compare_versions("1.x", "1.0"), Ordering::Equal);
    }

    #[test]
    fn test_has_update() {
        assert!(info("1.0.0", "v1.1.0").has_update());
        assert!(!info("1.1.0", "1.1.0").has_update());
        assert!(!info("1.2.0", "1.1.0").has_update());
        assert!(!info("1.0.0", "").has_update());
        assert_eq!(info("1.2.0", "1.1.0").message(), "");
        assert_eq!(
            info("v1.0.0", "v1.1.0").message(),
            "Update available: v1.0.0 → v1.1.0"
        );
    }

    #[test]
    fn test_dev_builds_skip_the_check() {
        let checker = UpdateChecker::new("http://127.0.0.1:9/unreachable", None);
        assert!(tokio_test::block_on(checker.check("dev")).is_none());
        assert!(tokio_test::block_on(checker.check("")).is_none());
    }

    #[tokio::test]
    async fn test_fresh_cache_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CACHE_FILE);
        let cache = CheckCache {
            last_check: Utc::now() - chrono::Duration::hours(2),
            latest_version: "v9.0.0".to_string(),
            update_url: "https://example.com/release".to_string(),
        };
        save_cache(&path, &cache).unwrap();

        let checker = UpdateChecker::new("http://127.0.0.1:9/unreachable", Some(path));
        let info = checker.check("1.0.0").await.unwrap();
        assert_eq!(info.latest_version, "v9.0.0");
        assert_eq!(info.update_url, "https://example.com/release");
        assert!(info.has_update());
    }

    #[tokio::test]
    async fn test_unreachable_server_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CACHE_FILE);
        let checker = UpdateChecker::new("http://127.0.0.1:9/unreachable", Some(path.clone()));
        assert!(checker.check("1.0.0").await.is_none());
        assert!(!path.exists());
    }
}
