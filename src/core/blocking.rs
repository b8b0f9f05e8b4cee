/*!
 * Blocking I/O Offload
 *
 * Durable writes of externally sourced bytes (downloaded media, encoder
 * output) run on the blocking pool, never inline on a runtime worker.
 */

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Write `bytes` to `path` and fsync it on the blocking thread pool
pub async fn persist_bytes(path: impl AsRef<Path>, bytes: Vec<u8>) -> io::Result<PathBuf> {
    let path = path.as_ref().to_path_buf();
    let len = bytes.len();

    let written = tokio::task::spawn_blocking(move || -> io::Result<PathBuf> {
        let mut file = File::create(&path)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        Ok(path)
    })
    .await
    .map_err(|e| io::Error::new(io::ErrorKind::Other, e))??;

    debug!(path = %written.display(), bytes = len, "persisted bytes");
    Ok(written)
}
