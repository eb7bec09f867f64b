//! Download count badge
//!
//! Sums last-year registry download counts of the per-platform packages and
//! renders them as a shields.io endpoint badge.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::pipeline::{package_name, repo_id};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// shields.io endpoint badge
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    /// Always 1
    pub schema_version: u8,
    /// Left-hand text
    pub label: String,
    /// Right-hand text
    pub message: String,
    /// Right-hand colour
    pub color: String,
}

impl Badge {
    /// Downloads badge for a total count
    pub fn downloads(total: u64) -> Self {
        Self {
            schema_version: 1,
            label: "downloads".to_string(),
            message: format_number(total),
            color: "brightgreen".to_string(),
        }
    }
}

#[derive(Deserialize)]
struct PointDownloads {
    downloads: u64,
}

/// `1234567` → `1.2M`, `1250` → `1.3k`, `999` → `999`
///
/// Rounds to one decimal, halves away from zero.
pub fn format_number(count: u64) -> String {
    let scaled = |divisor: f64| ((count as f64 / divisor) * 10.0).round() / 10.0;
    if count >= 1_000_000 {
        format!("{:.1}M", scaled(1_000_000.0))
    } else if count >= 1_000 {
        format!("{:.1}k", scaled(1_000.0))
    } else {
        count.to_string()
    }
}

/// Scoped registry package names for one platform, or all of them
///
/// # Errors
///
/// [`Error::NotFound`] for a platform that is not configured.
pub fn packages_for(config: &Config, platform: Option<&str>) -> Result<Vec<String>> {
    let platforms: Vec<_> = match platform {
        None => config.stats.platforms.iter().collect(),
        Some(os) => {
            let found: Vec<_> = config.stats.platforms.iter().filter(|p| p.os == os).collect();
            if found.is_empty() {
                return Err(Error::NotFound(format!("no download stats for platform '{}'", os)));
            }
            found
        }
    };

    Ok(platforms
        .into_iter()
        .flat_map(|p| {
            p.arches.iter().map(move |arch| {
                package_name(&config.tool.scope, &repo_id(&config.tool.name, &p.os, arch))
            })
        })
        .collect())
}

/// Sum the last-year downloads of `packages`; failed lookups count as zero
pub async fn total_downloads(client: &reqwest::Client, api_url: &str, packages: &[String]) -> u64 {
    let api_url = api_url.trim_end_matches('/');
    let lookups = packages
        .iter()
        .map(|package| package_downloads(client, api_url, package));

    join_all(lookups).await.into_iter().sum()
}

async fn package_downloads(client: &reqwest::Client, api_url: &str, package: &str) -> u64 {
    let url = format!("{}/downloads/point/last-year/{}", api_url, package);
    match fetch_point(client, &url).await {
        Ok(count) => {
            debug!(package, count, "download count fetched");
            count
        }
        Err(e) => {
            warn!(package, error = %e, "download count lookup failed, counting as 0");
            0
        }
    }
}

async fn fetch_point(client: &reqwest::Client, url: &str) -> Result<u64> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(Error::UpstreamFetch {
            url: url.to_string(),
            status: Some(status.as_u16()),
            reason: format!("stats API returned HTTP {}", status),
        });
    }
    let point: PointDownloads = response.json().await?;
    Ok(point.downloads)
}

/// Build the downloads badge for a platform, or for every platform
pub async fn download_badge(
    client: &reqwest::Client,
    config: &Config,
    platform: Option<&str>,
) -> Result<Badge> {
    let packages = packages_for(config, platform)?;
    let total = total_downloads(client, &config.upstream.stats_api_url, &packages).await;
    Ok(Badge::downloads(total))
}
