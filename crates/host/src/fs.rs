use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::{Error, Result};

/// Whole-file text access.
#[async_trait]
pub trait FileSystem: Send + Sync {
	/// Reads the file as UTF-8 text.
	async fn read(&self, path: &Path) -> Result<String>;

	/// Replaces the file contents, creating it if needed.
	async fn write(&self, path: &Path, text: &str) -> Result<()>;

	/// Returns true if the path names an existing file.
	async fn exists(&self, path: &Path) -> bool {
		self.read(path).await.is_ok()
	}
}

/// In-memory file system.
#[derive(Debug, Default)]
pub struct MemoryFs {
	files: RwLock<HashMap<PathBuf, String>>,
}

impl MemoryFs {
	/// Creates an empty file system.
	pub fn new() -> Self {
		Self::default()
	}

	/// Builder-style seeding of one file.
	pub fn with_file(self, path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
		self.files.write().insert(path.into(), text.into());
		self
	}
}

#[async_trait]
impl FileSystem for MemoryFs {
	async fn read(&self, path: &Path) -> Result<String> {
		self.files
			.read()
			.get(path)
			.cloned()
			.ok_or_else(|| Error::NotFound(path.to_path_buf()))
	}

	async fn write(&self, path: &Path, text: &str) -> Result<()> {
		self.files.write().insert(path.to_path_buf(), text.to_owned());
		Ok(())
	}

	async fn exists(&self, path: &Path) -> bool {
		self.files.read().contains_key(path)
	}
}

/// Disk-backed file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFs;

#[async_trait]
impl FileSystem for LocalFs {
	async fn read(&self, path: &Path) -> Result<String> {
		tokio::fs::read_to_string(path).await.map_err(|e| Error::io(path, e))
	}

	async fn write(&self, path: &Path, text: &str) -> Result<()> {
		tokio::fs::write(path, text).await.map_err(|e| Error::io(path, e))
	}

	async fn exists(&self, path: &Path) -> bool {
		tokio::fs::try_exists(path).await.unwrap_or(false)
	}
}
