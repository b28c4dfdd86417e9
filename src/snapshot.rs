use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Writes raw document bytes under `dir` with a timestamp-derived
/// filename and returns the path. Purely diagnostic; the caller logs
/// failures and moves on.
pub fn save_snapshot(dir: &Path, bytes: &[u8]) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let path = dir.join(format!("plan-{stamp}.pdf"));
    fs::write(&path, bytes)?;
    Ok(path)
}
