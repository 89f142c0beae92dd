use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use super::Timestamp;

/// Seconds since the Unix epoch, negative for earlier instants
pub fn to_epoch_secs(time: SystemTime) -> Timestamp {
    match time.duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_secs_f64(),
        Err(before) => -before.duration().as_secs_f64(),
    }
}

/// Last modification time of `path`, following symlinks
pub fn modified_secs(path: &Path) -> std::io::Result<Timestamp> {
    let modified = std::fs::metadata(path)?.modified()?;
    Ok(to_epoch_secs(modified))
}

pub fn now_secs() -> Timestamp {
    to_epoch_secs(SystemTime::now())
}
