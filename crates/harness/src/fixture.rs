//! Golden fixtures.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;
use vigil_host::{Document, EditorHost};

use crate::config::FixtureConfig;
use crate::{HarnessError, Result};

/// Paired golden contents and the file they are materialized into.
///
/// `before_content` and `after_content` always differ, otherwise an absent
/// transformation would be indistinguishable from a successful one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestFixture {
	pub before_path: PathBuf,
	pub after_path: PathBuf,
	pub target_path: PathBuf,
	pub before_content: String,
	pub after_content: String,
}

impl TestFixture {
	pub fn new(
		before_path: impl Into<PathBuf>,
		after_path: impl Into<PathBuf>,
		target_path: impl Into<PathBuf>,
		before_content: impl Into<String>,
		after_content: impl Into<String>,
	) -> Result<Self> {
		let fixture = Self {
			before_path: before_path.into(),
			after_path: after_path.into(),
			target_path: target_path.into(),
			before_content: before_content.into(),
			after_content: after_content.into(),
		};
		if fixture.before_content == fixture.after_content {
			return Err(HarnessError::IndistinctFixture(fixture.target_path));
		}
		Ok(fixture)
	}
}

/// Materializes fixtures through the host file system.
///
/// No operation retries: a fixture that cannot be written or read leaves
/// nothing meaningful to verify.
#[derive(Clone)]
pub struct FixtureManager {
	host: Arc<dyn EditorHost>,
}

impl FixtureManager {
	pub fn new(host: Arc<dyn EditorHost>) -> Self {
		Self { host }
	}

	/// Reads both golden files named by `config`.
	pub async fn load(&self, config: &FixtureConfig) -> Result<TestFixture> {
		let before = self.read(&config.before).await?;
		let after = self.read(&config.after).await?;
		TestFixture::new(&config.before, &config.after, &config.target, before, after)
	}

	/// Overwrites the target with the before content and opens it.
	pub async fn prepare(&self, fixture: &TestFixture) -> Result<Document> {
		let target = &fixture.target_path;
		self.host
			.write(target, &fixture.before_content)
			.await
			.map_err(HarnessError::io(target))?;
		debug!(target = %target.display(), "fixture.prepared");
		self.host.open(target).await.map_err(HarnessError::io(target))
	}

	/// Current on-disk content of the target.
	pub async fn read_result(&self, target: &Path) -> Result<String> {
		self.read(target).await
	}

	/// Puts the before content back so the golden project is left as found.
	pub async fn discard(&self, fixture: &TestFixture) -> Result<()> {
		self.host
			.write(&fixture.target_path, &fixture.before_content)
			.await
			.map_err(HarnessError::io(&fixture.target_path))
	}

	async fn read(&self, path: &Path) -> Result<String> {
		self.host.read(path).await.map_err(HarnessError::io(path))
	}
}
