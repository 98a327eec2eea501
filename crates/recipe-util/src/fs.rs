use std::path::{Path, PathBuf};

/// Walk up from `start` looking for a file named `filename`.
/// Returns the path to the directory containing the file, or `None`.
pub fn find_ancestor_with(start: &Path, filename: &str) -> Option<PathBuf> {
    let mut current = start;
    loop {
        let candidate = current.join(filename);
        if candidate.is_file() {
            return Some(current.to_path_buf());
        }
        current = current.parent()?;
    }
}

/// Locate a recipe file: an explicit path wins, otherwise `filename` is
/// searched for from `start` upwards.
pub fn locate_recipe(explicit: Option<&Path>, start: &Path, filename: &str) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let found = find_ancestor_with(start, filename).map(|dir| dir.join(filename));
    if let Some(ref path) = found {
        tracing::debug!("found recipe file at {}", path.display());
    }
    found
}
