//! Sequencing of one verification run.
//!
//! The format-on-save run is: prepare fixture, ensure extensions active, show
//! the target, arm the watcher, save, await the signal, compare. Arming must
//! happen before the save: the host does not replay events, so a completion
//! emitted before a subscriber exists is lost and the run hangs until the
//! suite's timeout.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};
use vigil_host::{Document, Editor, EditorHost, HostCommand};

use crate::activation::ensure_active;
use crate::config::HarnessConfig;
use crate::fixture::{FixtureManager, TestFixture};
use crate::signal::{Armed, CompletionSignal, Disposables, SignalWatcher, watcher_for};
use crate::suite::SmokeCase;
use crate::{HarnessError, Result};

/// Owns the per-test state and the reset contract.
///
/// The editor workspace is process-wide state. Only [`Self::reset`] mutates
/// it outside a run, and it is idempotent, so every case starts from the same
/// empty workspace regardless of how the previous one ended.
pub struct Orchestrator {
	host: Arc<dyn EditorHost>,
	config: HarnessConfig,
	watcher: Box<dyn SignalWatcher>,
	fixtures: FixtureManager,
	disposables: Disposables,
	fixture: Option<TestFixture>,
}

impl Orchestrator {
	/// Creates an orchestrator using the configured strategy.
	pub fn new(host: Arc<dyn EditorHost>, config: HarnessConfig) -> Self {
		let watcher = watcher_for(config.strategy, &config.log);
		Self {
			fixtures: FixtureManager::new(Arc::clone(&host)),
			host,
			config,
			watcher,
			disposables: Disposables::new(),
			fixture: None,
		}
	}

	/// Replaces the configured watcher.
	pub fn with_watcher(mut self, watcher: Box<dyn SignalWatcher>) -> Self {
		self.watcher = watcher;
		self
	}

	pub fn config(&self) -> &HarnessConfig {
		&self.config
	}

	/// Subscriptions created by this orchestrator that can still fire.
	pub fn armed_watchers(&self) -> usize {
		self.disposables.armed()
	}

	/// Releases every subscription and closes every editor.
	///
	/// Subscriptions are released first, so a failing close-all still leaves
	/// nothing armed.
	pub async fn reset(&mut self) -> Result<()> {
		let released = self.disposables.dispose_all();
		debug!(released, "orchestrator.reset");
		self.host.execute(HostCommand::CloseAllEditors).await?;
		Ok(())
	}

	/// Runs before every case.
	pub async fn setup(&mut self) -> Result<()> {
		self.reset().await
	}

	/// Runs after every case, whatever its outcome.
	pub async fn teardown(&mut self) -> Result<()> {
		let reset = self.reset().await;
		if let Some(fixture) = self.fixture.take() {
			self.fixtures.discard(&fixture).await?;
		}
		reset
	}

	/// Runs one smoke case. Bounded only by the caller.
	pub async fn run_case(&mut self, case: SmokeCase) -> Result<()> {
		match case {
			SmokeCase::ExtensionLoads => self.verify_activation().await,
			SmokeCase::FormatsOnSave => self.verify_format_on_save().await,
		}
	}

	/// Opening the target activates the extension chain within the bound.
	pub async fn verify_activation(&mut self) -> Result<()> {
		let target = self.config.fixture.target.clone();
		self.host.open(&target).await.map_err(HarnessError::io(&target))?;
		self.ensure_extensions().await
	}

	/// Saving the target turns the before content into the after content.
	pub async fn verify_format_on_save(&mut self) -> Result<()> {
		let fixture = self.stage().await?;
		let signal = self.arm(&fixture.target_path);
		self.trigger_save().await?;
		info!(strategy = %self.watcher.strategy(), "waiting for completion signal");
		signal.await?;
		self.verify_result(&fixture).await
	}

	/// Loads and materializes the fixture, ensures extensions, shows the target.
	pub async fn stage(&mut self) -> Result<TestFixture> {
		let fixture = self.fixtures.load(&self.config.fixture).await?;
		self.fixture = Some(fixture.clone());
		let doc = self.fixtures.prepare(&fixture).await?;
		self.ensure_extensions().await?;
		self.show_target(&doc).await?;
		Ok(fixture)
	}

	/// Ensures every configured extension, in order.
	pub async fn ensure_extensions(&self) -> Result<()> {
		for ext in &self.config.extensions {
			let policy = self.config.activation.policy(ext.activate);
			if !ensure_active(&*self.host, &ext.id, policy).await? {
				return Err(HarnessError::ActivationTimeout {
					id: ext.id.clone(),
					timeout: policy.timeout,
				});
			}
		}
		Ok(())
	}

	/// Shows `doc` and checks that it became the active editor.
	pub async fn show_target(&self, doc: &Document) -> Result<Editor> {
		self.host.show(doc).await?;
		let editor = self.host.active_editor().ok_or(HarnessError::NoActiveEditor)?;
		if !editor.shows(&doc.path) {
			return Err(HarnessError::WrongActiveEditor {
				expected: doc.path.clone(),
				actual: editor.path,
			});
		}
		Ok(editor)
	}

	/// Arms the watcher for `target`; the subscription is released at reset.
	pub fn arm(&mut self, target: &Path) -> CompletionSignal {
		let Armed { signal, subscription } = self.watcher.arm(&*self.host, target);
		debug!(
			strategy = %self.watcher.strategy(),
			stream = subscription.stream(),
			target = %target.display(),
			"orchestrator.arm"
		);
		self.disposables.push(subscription);
		signal
	}

	/// Issues the save that triggers format-on-save.
	pub async fn trigger_save(&self) -> Result<()> {
		info!("triggering save to start format-on-save");
		self.host.execute(HostCommand::SaveActive).await?;
		Ok(())
	}

	/// Compares the target on disk with the golden after content.
	pub async fn verify_result(&self, fixture: &TestFixture) -> Result<()> {
		let actual = self.fixtures.read_result(&fixture.target_path).await?;
		if actual != fixture.after_content {
			return Err(HarnessError::ContentMismatch {
				expected: fixture.after_content.clone(),
				actual,
			});
		}
		Ok(())
	}
}
