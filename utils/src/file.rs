use std::{fs::OpenOptions, path::Path};

/// Makes sure a file-backed sqlite database exists before connecting.
///
/// Other backends and in-memory urls are left alone.
pub fn create_dev_db(db_url: &str) {
    let Some(rest) = db_url.strip_prefix("sqlite:") else {
        return;
    };
    let path = rest.trim_start_matches("//");
    let path = path.split('?').next().unwrap_or_default();
    if path.is_empty() || path.starts_with(":memory:") || path == "memory:" {
        return;
    }

    touch(Path::new(path));
}

fn touch(path: &Path) {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::warn!(path = %parent.display(), "failed to create database directory: {e}");
        }
    }
    if let Err(e) = OpenOptions::new().create(true).append(true).open(path) {
        tracing::warn!(path = %path.display(), "failed to touch database file: {e}");
    }
}
