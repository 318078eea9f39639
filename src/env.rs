//! The I/O seam of the load pipeline.
//!
//! Config files, `.env` files, directory listings, the cache file and the
//! process variables captured by [`ProcessEnv`](crate::environment::ProcessEnv)
//! are all reached through [`ConfigEnv`], so a whole build can run against
//! [`MockEnv`] without touching disk.

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

/// File system and process access used while building a [`Config`](crate::Config).
///
/// ```
/// use configtree::env::{ConfigEnv, MockEnv};
/// use std::path::Path;
///
/// let env = MockEnv::new().with_file("config/app.json", r#"{"debug": true}"#);
/// assert!(env.file_exists(Path::new("config/app.json")));
/// assert!(env.is_directory(Path::new("config")));
/// ```
pub trait ConfigEnv: Send + Sync {
    /// Whole file as UTF-8.
    ///
    /// # Errors
    ///
    /// `ErrorKind::NotFound` when the file is absent; anything else is passed
    /// through and reported as an I/O failure by the caller.
    fn read_file(&self, path: &Path) -> io::Result<String>;

    /// Replace `path` with `contents`, creating missing parent directories.
    fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    fn file_exists(&self, path: &Path) -> bool;

    fn is_directory(&self, path: &Path) -> bool;

    /// Regular files directly inside `dir`, sorted by path.
    fn list_dir(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;

    /// Process variables whose names start with `prefix`, sorted by name.
    fn vars_with_prefix(&self, prefix: &str) -> Vec<(String, String)>;
}

/// [`ConfigEnv`] backed by `std::fs` and `std::env`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealEnv;

impl RealEnv {
    pub fn new() -> Self {
        Self
    }
}

impl ConfigEnv for RealEnv {
    fn read_file(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        // Write beside the target and rename so readers never see a partial file.
        let mut staging = path.as_os_str().to_owned();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);
        std::fs::write(&staging, contents)?;
        std::fs::rename(&staging, path)
    }

    fn file_exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_directory(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn list_dir(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    fn vars_with_prefix(&self, prefix: &str) -> Vec<(String, String)> {
        let mut vars: Vec<(String, String)> = std::env::vars()
            .filter(|(name, _)| name.starts_with(prefix))
            .collect();
        vars.sort();
        vars
    }
}

#[derive(Debug, Clone)]
enum MockFile {
    Content(String),
    Unreadable,
}

/// In-memory [`ConfigEnv`] for tests.
///
/// Directories exist implicitly as the parents of registered files.
///
/// ```
/// use configtree::env::MockEnv;
///
/// let env = MockEnv::new()
///     .with_file("config/global.json", r#"{"db": {"host": "localhost"}}"#)
///     .with_file(".env", "DB_PASSWORD=secret")
///     .with_var("APP_MODE", "test");
/// ```
#[derive(Debug, Default)]
pub struct MockEnv {
    files: RwLock<HashMap<PathBuf, MockFile>>,
    vars: RwLock<BTreeMap<String, String>>,
}

impl MockEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.put(path.into(), MockFile::Content(content.into()));
        self
    }

    /// A file that exists but fails every read and write with `PermissionDenied`.
    pub fn with_unreadable_file(self, path: impl Into<PathBuf>) -> Self {
        self.put(path.into(), MockFile::Unreadable);
        self
    }

    /// A process variable visible to [`ConfigEnv::vars_with_prefix`].
    pub fn with_var(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.write().insert(name.into(), value.into());
        self
    }

    pub fn remove_file(&self, path: impl AsRef<Path>) {
        self.files.write().remove(path.as_ref());
    }

    /// What a file holds right now, e.g. after a cache write.
    pub fn file_content(&self, path: impl AsRef<Path>) -> Option<String> {
        match self.files.read().get(path.as_ref()) {
            Some(MockFile::Content(content)) => Some(content.clone()),
            _ => None,
        }
    }

    fn put(&self, path: PathBuf, file: MockFile) {
        self.files.write().insert(path, file);
    }
}

fn permission_denied(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::PermissionDenied,
        format!("mock permission denied: {}", path.display()),
    )
}

impl ConfigEnv for MockEnv {
    fn read_file(&self, path: &Path) -> io::Result<String> {
        match self.files.read().get(path) {
            Some(MockFile::Content(content)) => Ok(content.clone()),
            Some(MockFile::Unreadable) => Err(permission_denied(path)),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("mock file not found: {}", path.display()),
            )),
        }
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        if let Some(MockFile::Unreadable) = self.files.read().get(path) {
            return Err(permission_denied(path));
        }
        let content = String::from_utf8(contents.to_vec())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        self.put(path.to_path_buf(), MockFile::Content(content));
        Ok(())
    }

    fn file_exists(&self, path: &Path) -> bool {
        matches!(self.files.read().get(path), Some(MockFile::Content(_)))
    }

    fn is_directory(&self, path: &Path) -> bool {
        self.files
            .read()
            .keys()
            .any(|file| file.ancestors().skip(1).any(|dir| dir == path))
    }

    fn list_dir(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        if !self.is_directory(dir) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("mock directory not found: {}", dir.display()),
            ));
        }
        let mut files: Vec<PathBuf> = self
            .files
            .read()
            .iter()
            .filter(|(path, file)| {
                path.parent() == Some(dir) && matches!(file, MockFile::Content(_))
            })
            .map(|(path, _)| path.clone())
            .collect();
        files.sort();
        Ok(files)
    }

    fn vars_with_prefix(&self, prefix: &str) -> Vec<(String, String)> {
        self.vars
            .read()
            .iter()
            .filter(|(name, _)| name.starts_with(prefix))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}
