use std::path::Path;
use std::time::Duration;
use std::time::SystemTime;

/// Cached artifacts older than this are refreshed.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Returns `true` when `path` was last modified more than `max_age` ago.
///
/// A missing or unstatable file counts as stale: the bias is toward doing
/// refresh work over serving stale data forever.
pub fn is_stale(path: &Path, max_age: Duration) -> bool {
    stale_at(path, max_age, SystemTime::now())
}

fn stale_at(path: &Path, max_age: Duration, now: SystemTime) -> bool {
    let Ok(metadata) = std::fs::metadata(path) else {
        return true;
    };
    let Ok(modified) = metadata.modified() else {
        return true;
    };
    match now.duration_since(modified) {
        Ok(age) => age > max_age,
        // Modified after `now`; a future mtime is as fresh as it gets.
        Err(_) => false,
    }
}
