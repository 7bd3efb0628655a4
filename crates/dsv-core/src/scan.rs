use std::path::{Path, PathBuf};

use walkdir::WalkDir;

pub const STORE_FILE_NAME: &str = ".DS_Store";

pub fn is_store_file(p: &Path) -> bool {
    p.is_file() && p.file_name().and_then(|s| s.to_str()) == Some(STORE_FILE_NAME)
}

/// Sorted paths of every `.DS_Store` under `root`. `max_depth` of `Some(1)`
/// only looks at `root` itself; `None` walks the whole tree. Unreadable
/// entries are skipped.
pub fn find_store_files(root: &Path, max_depth: Option<usize>) -> Vec<PathBuf> {
    let mut walk = WalkDir::new(root).follow_links(false);
    if let Some(depth) = max_depth {
        walk = walk.max_depth(depth);
    }
    let mut out: Vec<PathBuf> = walk
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(err) => {
                tracing::debug!(%err, "skipping unreadable entry");
                None
            }
        })
        .filter(|e| e.file_type().is_file() && e.file_name() == STORE_FILE_NAME)
        .map(|e| e.into_path())
        .collect();
    out.sort();
    out
}
