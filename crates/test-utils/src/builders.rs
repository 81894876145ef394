#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use assetpipe::config::BuildConfig;
use filetime::FileTime;
use tempfile::TempDir;

/// Throwaway project tree in a temp dir. Removed on drop.
pub struct ProjectFixture {
    dir: TempDir,
}

impl ProjectFixture {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("creating temp project dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// Write `contents` to `rel`, creating parent directories.
    pub fn write(&self, rel: &str, contents: impl AsRef<[u8]>) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("creating fixture dirs");
        }
        fs::write(&path, contents).expect("writing fixture file");
        path
    }

    pub fn with_file(self, rel: &str, contents: impl AsRef<[u8]>) -> Self {
        self.write(rel, contents);
        self
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.path(rel)).expect("reading fixture file")
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.path(rel).exists()
    }

    pub fn mtime(&self, rel: &str) -> SystemTime {
        fs::metadata(self.path(rel))
            .and_then(|m| m.modified())
            .expect("reading fixture mtime")
    }

    pub fn set_mtime(&self, rel: &str, time: SystemTime) {
        filetime::set_file_mtime(self.path(rel), FileTime::from_system_time(time))
            .expect("setting fixture mtime");
    }

    /// Move the mtime of `rel` `secs` seconds into the past.
    pub fn age(&self, rel: &str, secs: u64) {
        self.set_mtime(rel, SystemTime::now() - Duration::from_secs(secs));
    }

    /// Move the mtime of `rel` `secs` seconds into the future.
    pub fn touch_ahead(&self, rel: &str, secs: u64) {
        self.set_mtime(rel, SystemTime::now() + Duration::from_secs(secs));
    }

    /// Default configuration rooted at the fixture.
    pub fn config(&self) -> BuildConfig {
        BuildConfig::with_root(self.root())
    }

    /// Write `Assetpipe.toml` and return its path.
    pub fn write_config(&self, toml: &str) -> PathBuf {
        self.write("Assetpipe.toml", toml)
    }
}

impl Default for ProjectFixture {
    fn default() -> Self {
        Self::new()
    }
}
