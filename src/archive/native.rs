use super::{Archiver, is_binary_entry, strip_root};
use crate::error::{Error, Result};
use async_trait::async_trait;
use flate2::{Compression, read::GzDecoder, write::GzEncoder};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tokio::task::spawn_blocking;
use tracing::{debug, warn};

/// In-process archive backend built on `tar` and `flate2`
///
/// Output archives are deterministic: the tar header carries mtime 0 and
/// uid/gid 0, and the gzip header carries no timestamp, so the same binary
/// always produces the same bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeArchiver;

impl NativeArchiver {
    fn extract_blocking(archive_path: &Path, dest: &Path, binary_name: &str) -> Result<PathBuf> {
        let extraction_error = |reason: String| Error::Extraction {
            archive: archive_path.to_path_buf(),
            reason,
        };

        let file = File::open(archive_path)
            .map_err(|e| extraction_error(format!("failed to open archive: {}", e)))?;
        let mut archive = tar::Archive::new(GzDecoder::new(file));
        let entries = archive
            .entries()
            .map_err(|e| extraction_error(format!("failed to read archive: {}", e)))?;

        let mut entry_count = 0usize;
        let mut written = 0usize;

        for entry in entries {
            let mut entry =
                entry.map_err(|e| extraction_error(format!("corrupt archive entry: {}", e)))?;
            entry_count += 1;

            let path = entry
                .path()
                .map_err(|e| extraction_error(format!("invalid entry path: {}", e)))?
                .into_owned();

            let Some(relative) = strip_root(&path) else {
                debug!(path = %path.display(), "skipping root or unsafe entry");
                continue;
            };
            if !is_binary_entry(&relative, binary_name) {
                continue;
            }

            let entry_type = entry.header().entry_type();
            if !(entry_type.is_file() || entry_type.is_dir()) {
                warn!(path = %path.display(), ?entry_type, "skipping non-regular archive entry");
                continue;
            }

            let target = dest.join(&relative);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| {
                    extraction_error(format!("failed to create parent directories: {}", e))
                })?;
            }
            entry.unpack(&target).map_err(|e| {
                extraction_error(format!("failed to write {}: {}", relative.display(), e))
            })?;
            written += 1;
        }

        if entry_count == 0 {
            return Err(extraction_error("archive is empty".to_string()));
        }

        let binary_path = dest.join(binary_name);
        if !binary_path.is_file() {
            return Err(extraction_error(format!(
                "archive has no file named {}",
                binary_name
            )));
        }

        debug!(
            archive = %archive_path.display(),
            entries = entry_count,
            written,
            "extracted binary from archive"
        );
        Ok(binary_path)
    }

    fn repackage_blocking(dir: &Path, binary_name: &str, output: &Path) -> Result<()> {
        let repackaging_error = |reason: String| Error::Repackaging {
            output: output.to_path_buf(),
            reason,
        };

        let source = dir.join(binary_name);
        let mut file = File::open(&source).map_err(|e| {
            repackaging_error(format!("failed to open {}: {}", source.display(), e))
        })?;
        let metadata = file
            .metadata()
            .map_err(|e| repackaging_error(format!("failed to stat {}: {}", source.display(), e)))?;

        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Regular);
        header.set_size(metadata.len());
        header.set_mode(file_mode(&metadata));
        header.set_mtime(0);
        header.set_uid(0);
        header.set_gid(0);

        let out = File::create(output)
            .map_err(|e| repackaging_error(format!("failed to create output: {}", e)))?;
        let mut builder = tar::Builder::new(GzEncoder::new(out, Compression::default()));
        builder
            .append_data(&mut header, binary_name, &mut file)
            .map_err(|e| repackaging_error(format!("failed to append {}: {}", binary_name, e)))?;

        let encoder = builder
            .into_inner()
            .map_err(|e| repackaging_error(format!("failed to finish tar stream: {}", e)))?;
        let out = encoder
            .finish()
            .map_err(|e| repackaging_error(format!("failed to finish gzip stream: {}", e)))?;
        out.sync_all()
            .map_err(|e| repackaging_error(format!("failed to flush output: {}", e)))?;

        Ok(())
    }
}

#[cfg(unix)]
fn file_mode(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn file_mode(_metadata: &fs::Metadata) -> u32 {
    super::EXECUTABLE_MODE
}

#[async_trait]
impl Archiver for NativeArchiver {
    async fn extract(&self, archive: &Path, dest: &Path, binary_name: &str) -> Result<PathBuf> {
        let archive_owned = archive.to_path_buf();
        let dest_owned = dest.to_path_buf();
        let binary_owned = binary_name.to_string();

        spawn_blocking(move || {
            Self::extract_blocking(&archive_owned, &dest_owned, &binary_owned)
        })
        .await
        .map_err(|e| Error::Extraction {
            archive: archive.to_path_buf(),
            reason: format!("extraction task panicked: {}", e),
        })?
    }

    async fn repackage(&self, dir: &Path, binary_name: &str, output: &Path) -> Result<()> {
        let dir_owned = dir.to_path_buf();
        let binary_owned = binary_name.to_string();
        let output_owned = output.to_path_buf();

        spawn_blocking(move || {
            Self::repackage_blocking(&dir_owned, &binary_owned, &output_owned)
        })
        .await
        .map_err(|e| Error::Repackaging {
            output: output.to_path_buf(),
            reason: format!("repackaging task panicked: {}", e),
        })?
    }

    fn name(&self) -> &'static str {
        "native"
    }
}
