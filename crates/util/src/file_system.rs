//! File I/O as a capability, so higher layers can substitute an in-memory
//! implementation in tests instead of touching the real filesystem.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub trait FileReader {
    fn read_to_string(&self, path: &Path) -> io::Result<String>;
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
}

pub trait FileWriter {
    fn write(&self, path: &Path, data: &[u8]) -> io::Result<()>;
}

/// Directory enumeration and deletion, plus the modification time needed by
/// the flush engine's age-based housekeeping.
pub trait Directory {
    fn list(&self, directory: &Path) -> io::Result<Vec<PathBuf>>;
    fn modified_unix_seconds(&self, path: &Path) -> io::Result<i64>;
    fn remove(&self, path: &Path) -> io::Result<()>;
    fn size(&self, path: &Path) -> io::Result<u64>;
}

/// Reads/writes directly against the host filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileSystem;

impl FileReader for LocalFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }
}

impl FileWriter for LocalFileSystem {
    fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        fs::write(path, data)
    }
}

impl Directory for LocalFileSystem {
    fn list(&self, directory: &Path) -> io::Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(directory)? {
            paths.push(entry?.path());
        }
        Ok(paths)
    }

    fn modified_unix_seconds(&self, path: &Path) -> io::Result<i64> {
        let modified = fs::metadata(path)?.modified()?;
        let seconds = modified
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        Ok(seconds)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn size(&self, path: &Path) -> io::Result<u64> {
        Ok(fs::metadata(path)?.len())
    }
}

/// An in-memory filesystem, shared by clone, for exercising readers/writers
/// without touching disk.
#[derive(Debug, Default, Clone)]
pub struct MockFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, MockFile>>>,
}

#[derive(Debug, Clone, Default)]
struct MockFile {
    contents: Vec<u8>,
    modified_unix_seconds: i64,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        self.files
            .lock()
            .unwrap()
            .insert(path.into(), MockFile { contents: contents.into(), modified_unix_seconds: 0 });
        self
    }

    pub fn with_file_modified_at(
        self,
        path: impl Into<PathBuf>,
        contents: impl Into<Vec<u8>>,
        modified_unix_seconds: i64,
    ) -> Self {
        self.files
            .lock()
            .unwrap()
            .insert(path.into(), MockFile { contents: contents.into(), modified_unix_seconds });
        self
    }

    pub fn contents(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(path).map(|f| f.contents.clone())
    }
}

impl FileReader for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .map(|f| f.contents.clone())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "mock file not found"))
    }
}

impl FileWriter for MockFileSystem {
    fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        let mut files = self.files.lock().unwrap();
        let modified_unix_seconds = files.get(path).map(|f| f.modified_unix_seconds).unwrap_or(0);
        files.insert(path.to_path_buf(), MockFile { contents: data.to_vec(), modified_unix_seconds });
        Ok(())
    }
}

impl Directory for MockFileSystem {
    fn list(&self, directory: &Path) -> io::Result<Vec<PathBuf>> {
        Ok(self
            .files
            .lock()
            .unwrap()
            .keys()
            .filter(|path| path.parent() == Some(directory))
            .cloned()
            .collect())
    }

    fn modified_unix_seconds(&self, path: &Path) -> io::Result<i64> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .map(|f| f.modified_unix_seconds)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "mock file not found"))
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        self.files
            .lock()
            .unwrap()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "mock file not found"))
    }

    fn size(&self, path: &Path) -> io::Result<u64> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .map(|f| f.contents.len() as u64)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "mock file not found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn local_file_system_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(b"hello").unwrap();
        drop(file);

        let fs = LocalFileSystem;
        assert_eq!(fs.read_to_string(&path).unwrap(), "hello");
        fs.write(&path, b"world").unwrap();
        assert_eq!(fs.read_to_string(&path).unwrap(), "world");
    }

    #[test]
    fn mock_file_system_round_trips() {
        let fs = MockFileSystem::new().with_file("/a.txt", "hello");
        assert_eq!(fs.read_to_string(Path::new("/a.txt")).unwrap(), "hello");
        fs.write(Path::new("/b.txt"), b"world").unwrap();
        assert_eq!(fs.contents(Path::new("/b.txt")).unwrap(), b"world");
    }

    #[test]
    fn mock_file_system_missing_file_errors() {
        let fs = MockFileSystem::new();
        assert!(fs.read(Path::new("/missing")).is_err());
    }

    #[test]
    fn mock_file_system_lists_and_removes_directory_entries() {
        let fs = MockFileSystem::new()
            .with_file_modified_at("/traces/a.spoor_trace", "a", 10)
            .with_file_modified_at("/traces/b.spoor_trace", "bb", 20)
            .with_file("/other/c.spoor_trace", "c");

        let mut listed = fs.list(Path::new("/traces")).unwrap();
        listed.sort();
        assert_eq!(listed, vec![PathBuf::from("/traces/a.spoor_trace"), PathBuf::from("/traces/b.spoor_trace")]);
        assert_eq!(fs.modified_unix_seconds(Path::new("/traces/a.spoor_trace")).unwrap(), 10);
        assert_eq!(fs.size(Path::new("/traces/b.spoor_trace")).unwrap(), 2);

        fs.remove(Path::new("/traces/a.spoor_trace")).unwrap();
        assert!(fs.contents(Path::new("/traces/a.spoor_trace")).is_none());
    }
}
