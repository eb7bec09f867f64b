//! Custom test assertions for E2E tests

use flate2::read::GzDecoder;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use walkdir::WalkDir;

/// One entry of a gzip tarball
#[derive(Debug)]
pub struct Entry {
    pub path: String,
    pub mode: u32,
    pub data: Vec<u8>,
}

/// Decode every entry of a gzip tarball
pub fn tarball_entries(bytes: &[u8]) -> Vec<Entry> {
    let mut archive = tar::Archive::new(GzDecoder::new(bytes));
    archive
        .entries()
        .expect("Response is not a tarball")
        .map(|entry| {
            let mut entry = entry.expect("Corrupt tar entry");
            let path = entry
                .path()
                .expect("Invalid entry path")
                .to_string_lossy()
                .into_owned();
            let mode = entry.header().mode().expect("Entry has no mode");
            let mut data = Vec::new();
            entry.read_to_end(&mut data).expect("Failed to read entry");
            Entry { path, mode, data }
        })
        .collect()
}

/// Everything below `root`, excluding `root` itself
pub fn leftover_paths(root: &Path) -> Vec<String> {
    WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.path().display().to_string())
        .collect()
}

/// Wait until `root` is empty; cleanup after a disconnect runs asynchronously
pub async fn assert_workspace_drained(root: &Path, timeout: Duration) {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let leftover = leftover_paths(root);
        if leftover.is_empty() {
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("Workspace root not empty after {:?}: {:?}", timeout, leftover);
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}
