use crate::error::{Error, Result};
use std::path::Path;

/// Mark the extracted binary executable (`0o755`)
///
/// On platforms without Unix permission bits this only checks that the file
/// exists; the repackaged tar header still carries the executable mode.
pub async fn make_executable(path: &Path) -> Result<()> {
    let permission_error = |reason: String| Error::Permission {
        path: path.to_path_buf(),
        reason,
    };

    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| permission_error(e.to_string()))?;
    if !metadata.is_file() {
        return Err(permission_error("not a regular file".to_string()));
    }

    set_mode(path)
        .await
        .map_err(|e| permission_error(e.to_string()))
}

#[cfg(unix)]
async fn set_mode(path: &Path) -> std::io::Result<()> {
    use crate::archive::EXECUTABLE_MODE;
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(EXECUTABLE_MODE)).await
}

#[cfg(not(unix))]
async fn set_mode(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
