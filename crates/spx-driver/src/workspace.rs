//! Workspace file access
//!
//! The engine never touches the file system directly. Everything goes through
//! a [`Workspace`], so the same pipeline runs against a project directory on
//! disk or against the in-memory [`MapFs`] an editor keeps for unsaved buffers.
//! Paths are relative to the workspace root and use `/` separators.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, SystemTime};

/// One entry of a directory listing
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

/// Read access to the files of one project
pub trait Workspace: Send + Sync {
    /// Entries directly inside `dir` (`"."` is the root), sorted by name
    fn read_dir(&self, dir: &str) -> io::Result<Vec<DirEntry>>;

    fn read_file(&self, path: &str) -> io::Result<Vec<u8>>;

    fn modified(&self, path: &str) -> io::Result<SystemTime>;
}

/// Joins relative path segments, dropping `.` and empty components
pub fn join_path(base: &str, rest: &str) -> String {
    base.split('/')
        .chain(rest.split('/'))
        .filter(|part| !part.is_empty() && *part != ".")
        .collect::<Vec<_>>()
        .join("/")
}

fn normalize(path: &str) -> String {
    join_path("", path)
}

fn not_found(path: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("{}: file does not exist", path))
}

// =============================================================================
// In-memory workspace
// =============================================================================

#[derive(Debug, Default)]
struct MapFsState {
    files: BTreeMap<String, (Vec<u8>, SystemTime)>,
    clock: u64,
}

impl MapFsState {
    fn tick(&mut self) -> SystemTime {
        self.clock += 1;
        SystemTime::UNIX_EPOCH + Duration::from_secs(self.clock)
    }
}

/// In-memory workspace. Every write or [`MapFs::touch`] advances a logical
/// clock, so modification times strictly increase.
#[derive(Debug, Default)]
pub struct MapFs {
    state: Mutex<MapFsState>,
}

impl MapFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files<I, P, C>(files: I) -> Self
    where
        I: IntoIterator<Item = (P, C)>,
        P: AsRef<str>,
        C: AsRef<[u8]>,
    {
        let fs = Self::new();
        for (path, content) in files {
            fs.write(path.as_ref(), content.as_ref());
        }
        fs
    }

    pub fn write(&self, path: &str, content: impl AsRef<[u8]>) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let mtime = state.tick();
        state
            .files
            .insert(normalize(path), (content.as_ref().to_vec(), mtime));
    }

    pub fn remove(&self, path: &str) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.files.remove(&normalize(path)).is_some()
    }

    /// Bumps the modification time without changing the content
    pub fn touch(&self, path: &str) -> io::Result<()> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let mtime = state.tick();
        match state.files.get_mut(&normalize(path)) {
            Some(entry) => {
                entry.1 = mtime;
                Ok(())
            }
            None => Err(not_found(path)),
        }
    }
}

impl Workspace for MapFs {
    fn read_dir(&self, dir: &str) -> io::Result<Vec<DirEntry>> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let dir = normalize(dir);
        let prefix = if dir.is_empty() { String::new() } else { format!("{}/", dir) };

        let mut entries: BTreeMap<String, bool> = BTreeMap::new();
        for path in state.files.keys() {
            let Some(rest) = path.strip_prefix(&prefix) else {
                continue;
            };
            match rest.split_once('/') {
                Some((name, _)) => {
                    entries.insert(name.to_string(), true);
                }
                None => {
                    entries.entry(rest.to_string()).or_insert(false);
                }
            }
        }
        if entries.is_empty() && !dir.is_empty() {
            return Err(not_found(&dir));
        }
        Ok(entries
            .into_iter()
            .map(|(name, is_dir)| DirEntry { name, is_dir })
            .collect())
    }

    fn read_file(&self, path: &str) -> io::Result<Vec<u8>> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state
            .files
            .get(&normalize(path))
            .map(|(content, _)| content.clone())
            .ok_or_else(|| not_found(path))
    }

    fn modified(&self, path: &str) -> io::Result<SystemTime> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state
            .files
            .get(&normalize(path))
            .map(|(_, mtime)| *mtime)
            .ok_or_else(|| not_found(path))
    }
}

// =============================================================================
// Disk workspace
// =============================================================================

/// Workspace rooted at a directory on disk
#[derive(Debug, Clone)]
pub struct DiskFs {
    root: PathBuf,
}

impl DiskFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let mut full = self.root.clone();
        for part in normalize(path).split('/').filter(|p| !p.is_empty()) {
            full.push(part);
        }
        full
    }
}

impl Workspace for DiskFs {
    fn read_dir(&self, dir: &str) -> io::Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(self.resolve(dir))? {
            let entry = entry?;
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir: entry.file_type()?.is_dir(),
            });
        }
        entries.sort();
        Ok(entries)
    }

    fn read_file(&self, path: &str) -> io::Result<Vec<u8>> {
        fs::read(self.resolve(path))
    }

    fn modified(&self, path: &str) -> io::Result<SystemTime> {
        fs::metadata(self.resolve(path))?.modified()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("assets", "index.json"), "assets/index.json");
        assert_eq!(join_path("./assets/", "sounds/a/index.json"), "assets/sounds/a/index.json");
        assert_eq!(join_path("", "main.spx"), "main.spx");
    }

    #[test]
    fn test_map_fs_read_dir() {
        let fs = MapFs::with_files([
            ("main.spx", ""),
            ("Bullet.spx", ""),
            ("assets/index.json", "{}"),
            ("assets/sounds/Boom/index.json", "{}"),
        ]);
        let root = fs.read_dir(".").unwrap();
        assert_eq!(
            root,
            vec![
                DirEntry { name: "Bullet.spx".into(), is_dir: false },
                DirEntry { name: "assets".into(), is_dir: true },
                DirEntry { name: "main.spx".into(), is_dir: false },
            ]
        );
        let sounds = fs.read_dir("assets/sounds").unwrap();
        assert_eq!(sounds, vec![DirEntry { name: "Boom".into(), is_dir: true }]);
        assert_eq!(fs.read_dir("missing").unwrap_err().kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_map_fs_touch_advances_mtime() {
        let fs = MapFs::with_files([("main.spx", "var x int\n")]);
        let before = fs.modified("main.spx").unwrap();
        fs.touch("main.spx").unwrap();
        let after = fs.modified("main.spx").unwrap();
        assert!(after > before);
        assert_eq!(fs.read_file("main.spx").unwrap(), b"var x int\n");
        assert!(fs.touch("nope.spx").is_err());
    }

    #[test]
    fn test_map_fs_remove() {
        let fs = MapFs::with_files([("a.spx", "")]);
        assert!(fs.remove("a.spx"));
        assert!(!fs.remove("a.spx"));
        assert_eq!(fs.read_file("a.spx").unwrap_err().kind(), io::ErrorKind::NotFound);
    }
}
