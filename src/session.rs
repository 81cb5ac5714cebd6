use std::path::{Path, PathBuf};

use log::{debug, warn};

/// Split a `-j` path list on the platform separator (`:` or `;`).
pub fn split_search_path(list: &str) -> Vec<PathBuf> {
    std::env::split_paths(list)
        .filter(|p| !p.as_os_str().is_empty())
        .collect()
}

/// Scoped hold on the resource search path for one run.
///
/// Created at the start of [`crate::driver::run`] and released when it goes
/// out of scope, on success and on every error path.
#[derive(Debug)]
pub struct Session {
    search_path: Vec<PathBuf>,
}

impl Session {
    pub fn start(search_path: &[PathBuf]) -> Self {
        for dir in search_path.iter().filter(|d| !d.is_dir()) {
            warn!("search path entry {} is not a directory", dir.display());
        }
        debug!("session started, search path: {search_path:?}");
        Session {
            search_path: search_path.to_vec(),
        }
    }

    /// Locate an input file. Paths that exist as given (and absolute paths)
    /// are returned unchanged; relative paths are otherwise looked up in each
    /// search-path directory in turn.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() || path.exists() {
            return path.to_path_buf();
        }
        self.search_path
            .iter()
            .map(|dir| dir.join(path))
            .find(|candidate| candidate.exists())
            .unwrap_or_else(|| path.to_path_buf())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        debug!("session released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_search_path() {
        let joined = std::env::join_paths(["/a", "/b/c"]).unwrap();
        let parts = split_search_path(joined.to_str().unwrap());
        assert_eq!(parts, vec![PathBuf::from("/a"), PathBuf::from("/b/c")]);
        assert!(split_search_path("").is_empty());
    }

    #[test]
    fn test_resolve_searches_directories_in_order() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        std::fs::write(second.path().join("data.arff"), "").unwrap();

        let session = Session::start(&[first.path().to_path_buf(), second.path().to_path_buf()]);
        assert_eq!(
            session.resolve(Path::new("data.arff")),
            second.path().join("data.arff")
        );
        assert_eq!(
            session.resolve(Path::new("nowhere.arff")),
            PathBuf::from("nowhere.arff")
        );
    }
}
