//! Shared fixtures for unit tests
#![allow(clippy::unwrap_used, clippy::expect_used)]

use crate::api::AppState;
use crate::assets::{Assets, Product};
use crate::config::Config;
use flate2::{Compression, read::GzDecoder, write::GzEncoder};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

/// One entry read back from a gzip tarball
pub(crate) struct TarEntry {
    pub path: String,
    pub mode: u32,
    pub data: Vec<u8>,
}

/// Build a gzip tarball from `(path, contents, mode)` triples
pub(crate) fn tarball(entries: &[(&str, &[u8], u32)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for &(path, data, mode) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Regular);
        header.set_size(data.len() as u64);
        header.set_mode(mode);
        header.set_mtime(1_700_000_000);
        builder.append_data(&mut header, path, data).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

/// A registry-style tarball: the binary plus packaging metadata under `package/`
pub(crate) fn registry_tarball(binary_name: &str, contents: &[u8]) -> Vec<u8> {
    let binary_path = format!("package/{}", binary_name);
    tarball(&[
        ("package/package.json", &b"{\"name\":\"@dotenvx/dotenvx-linux-amd64\"}"[..], 0o644),
        (binary_path.as_str(), contents, 0o644),
        ("package/README.md", &b"# dotenvx\n"[..], 0o644),
    ])
}

/// List the entries of a gzip tarball
pub(crate) fn read_tarball(bytes: &[u8]) -> Vec<TarEntry> {
    let mut archive = tar::Archive::new(GzDecoder::new(bytes));
    archive
        .entries()
        .unwrap()
        .map(|entry| {
            let mut entry = entry.unwrap();
            let path = entry.path().unwrap().to_string_lossy().into_owned();
            let mode = entry.header().mode().unwrap();
            let mut data = Vec::new();
            entry.read_to_end(&mut data).unwrap();
            TarEntry { path, mode, data }
        })
        .collect()
}

/// Config pointing every upstream at `upstream_url` and workspaces at `workspace_dir`
pub(crate) fn test_config(upstream_url: &str, workspace_dir: &Path) -> Config {
    let mut config = Config::default();
    config.upstream.registry_url = upstream_url.to_string();
    config.upstream.releases_url = format!("{}/releases", upstream_url);
    config.upstream.stats_api_url = upstream_url.to_string();
    config.upstream.timeout = std::time::Duration::from_secs(5);
    config.download.workspace_dir = Some(workspace_dir.to_path_buf());
    config
}

/// Assets with a recognizable install script and version
pub(crate) fn test_assets() -> Assets {
    Assets {
        install_script: TEST_INSTALL_SCRIPT.to_string(),
        version: "1.2.3".to_string(),
        robots: "User-agent: *\nDisallow:".to_string(),
        products: vec![
            Product {
                prefix: "radar".to_string(),
                install_script: "VERSION=\"\"\nOS=\"\"\nDIRECTORY=\"/usr/local/bin\"\n".to_string(),
                version: "0.4.0".to_string(),
                platform_params: true,
            },
            Product {
                prefix: "ext/hub".to_string(),
                install_script: "VERSION=\"\"\nOS=\"\"\nDIRECTORY=\"/usr/local/bin\"\n".to_string(),
                version: "0.2.0".to_string(),
                platform_params: false,
            },
        ],
    }
}

/// Application state wired to a mock upstream
pub(crate) fn test_state(upstream_url: &str, workspace_dir: &Path) -> AppState {
    AppState::new(
        Arc::new(test_config(upstream_url, workspace_dir)),
        Arc::new(test_assets()),
    )
    .unwrap()
}

/// Number of entries left in a workspace root
pub(crate) fn leftover_entries(root: &Path) -> usize {
    std::fs::read_dir(root).unwrap().count()
}

/// Wait for background workspace removal under `root` to finish
pub(crate) async fn wait_for_drain(root: &Path) {
    for _ in 0..200 {
        if leftover_entries(root) == 0 {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("{} still has {} entries", root.display(), leftover_entries(root));
}

pub(crate) const TEST_INSTALL_SCRIPT: &str = r#"#!/bin/sh
set -e

VERSION=""
OS=""
ARCH=""
DIRECTORY="/usr/local/bin"
FORCE=""

echo "installing dotenvx $VERSION"
"#;
