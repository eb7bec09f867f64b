//! Asset and registry tarball fixtures

use flate2::{Compression, write::GzEncoder};
use std::path::Path;

/// Install script with every substitutable assignment
pub const INSTALL_SCRIPT: &str = r#"#!/bin/sh
set -e

VERSION=""
OS=""
ARCH=""
DIRECTORY="/usr/local/bin"
FORCE=""

echo "installing dotenvx $VERSION to $DIRECTORY"
"#;

/// Version reported by the fixture assets
pub const CURRENT_VERSION: &str = "1.51.0";

/// robots.txt served by the fixture assets
pub const ROBOTS: &str = "User-agent: *\nDisallow:";

/// Build a registry-style tarball: `package/package.json` plus `package/<binary>`
pub fn registry_tarball(binary_name: &str, contents: &[u8]) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));

    let entries: [(String, &[u8]); 2] = [
        (
            "package/package.json".to_string(),
            &b"{\"name\":\"@dotenvx/dotenvx\",\"version\":\"1.51.0\"}"[..],
        ),
        (format!("package/{}", binary_name), contents),
    ];
    for (path, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Regular);
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(1_700_000_000);
        builder
            .append_data(&mut header, path, data)
            .expect("Failed to append tar entry");
    }

    builder
        .into_inner()
        .expect("Failed to finish tar")
        .finish()
        .expect("Failed to finish gzip")
}

/// Write install.sh, VERSION, robots.txt and a `radar` product into `dir`
pub fn write_assets(dir: &Path) {
    std::fs::write(dir.join("install.sh"), INSTALL_SCRIPT).expect("Failed to write install.sh");
    std::fs::write(dir.join("VERSION"), format!("{}\n", CURRENT_VERSION))
        .expect("Failed to write VERSION");
    std::fs::write(dir.join("robots.txt"), format!("{}\n", ROBOTS))
        .expect("Failed to write robots.txt");

    let radar = dir.join("radar");
    std::fs::create_dir_all(&radar).expect("Failed to create radar dir");
    std::fs::write(radar.join("install.sh"), "VERSION=\"\"\nOS=\"\"\n")
        .expect("Failed to write radar install.sh");
    std::fs::write(radar.join("VERSION"), "0.4.0\n").expect("Failed to write radar VERSION");
}
