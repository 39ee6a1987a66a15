//! In-memory filesystem.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::ports::filesystem::FileSystem;

#[derive(Default)]
struct MemFsState {
    files: HashMap<PathBuf, String>,
    dirs: BTreeSet<PathBuf>,
    fail_writes: bool,
}

/// In-memory filesystem for exercising persistence without touching disk.
#[derive(Clone, Default)]
pub struct MemoryFileSystem {
    state: Arc<Mutex<MemFsState>>,
}

impl MemoryFileSystem {
    /// Creates an empty filesystem.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write fail, simulating a full disk.
    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().expect("fs lock poisoned").fail_writes = fail;
    }

    /// Paths of all files currently stored.
    #[must_use]
    pub fn files(&self) -> Vec<PathBuf> {
        let state = self.state.lock().expect("fs lock poisoned");
        let mut paths: Vec<PathBuf> = state.files.keys().cloned().collect();
        paths.sort();
        paths
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_to_string(
        &self,
        path: &Path,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let state = self.state.lock().expect("fs lock poisoned");
        state
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| format!("File not found: {}", path.display()).into())
    }

    fn write(
        &self,
        path: &Path,
        contents: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut state = self.state.lock().expect("fs lock poisoned");
        if state.fail_writes {
            return Err(format!("No space left on device: {}", path.display()).into());
        }
        state.files.insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }

    fn rename(
        &self,
        from: &Path,
        to: &Path,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut state = self.state.lock().expect("fs lock poisoned");
        let contents = state
            .files
            .remove(from)
            .ok_or_else(|| format!("File not found: {}", from.display()))?;
        state.files.insert(to.to_path_buf(), contents);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        let state = self.state.lock().expect("fs lock poisoned");
        // Check exact path or if any entry is "under" this directory.
        state.files.contains_key(path)
            || state.dirs.contains(path)
            || state.files.keys().chain(state.dirs.iter()).any(|k| k.starts_with(path) && k != path)
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut state = self.state.lock().expect("fs lock poisoned");
        state.dirs.insert(path.to_path_buf());
        Ok(())
    }

    fn remove_dir_all(&self, path: &Path) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut state = self.state.lock().expect("fs lock poisoned");
        state.files.retain(|k, _| !k.starts_with(path));
        state.dirs.retain(|k| !k.starts_with(path));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rename_moves_contents() {
        let fs = MemoryFileSystem::new();
        fs.write(Path::new("/data/a.tmp"), "payload").unwrap();
        fs.rename(Path::new("/data/a.tmp"), Path::new("/data/a.json")).unwrap();

        assert_eq!(fs.read_to_string(Path::new("/data/a.json")).unwrap(), "payload");
        assert!(!fs.exists(Path::new("/data/a.tmp")));
        assert!(fs.exists(Path::new("/data")));
    }

    #[test]
    fn remove_dir_all_drops_nested_entries() {
        let fs = MemoryFileSystem::new();
        fs.create_dir_all(Path::new("/work/repo/src")).unwrap();
        fs.write(Path::new("/work/repo/src/lib.rs"), "").unwrap();
        fs.write(Path::new("/work/other.txt"), "").unwrap();

        fs.remove_dir_all(Path::new("/work/repo")).unwrap();
        assert!(!fs.exists(Path::new("/work/repo")));
        assert!(fs.exists(Path::new("/work/other.txt")));
    }

    #[test]
    fn failing_writes_report_errors() {
        let fs = MemoryFileSystem::new();
        fs.fail_writes(true);
        assert!(fs.write(Path::new("/x"), "y").is_err());
    }
}
