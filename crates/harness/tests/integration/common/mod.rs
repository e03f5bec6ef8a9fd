//! Common utilities for harness integration tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use vigil_harness::config::FixtureConfig;
use vigil_harness::{HarnessConfig, Orchestrator, WatchStrategy};
use vigil_host::sim::{ActivationEvent, ExtensionSpec, FnFormatter, Formatter, SimulatedHost};
use vigil_host::{
	Commands, Document, Editor, Error, ExtensionHandle, ExtensionRegistry, FileChangeKinds, FileEvent, FileSystem,
	HostCommand, HostEvents, Listener, MemoryFs, SavedDocument, Subscription, TextDocumentChange, Workspace,
};

pub const PYTHON: &str = "ms-python.python";
pub const FORMATTER: &str = "ms-python.black-formatter";
pub const CHANNEL: &str = "Black Formatter";

pub const BEFORE: &str = "x=1\n";
pub const AFTER: &str = "x = 1\n";

pub fn target() -> PathBuf {
	PathBuf::from("/project/myscript.py")
}

/// Golden files plus a target that already holds the before content.
pub fn golden_fs() -> MemoryFs {
	MemoryFs::new()
		.with_file("/golden/myscript.unformatted", BEFORE)
		.with_file("/golden/myscript.formatted", AFTER)
		.with_file(target(), BEFORE)
}

/// Formatter that spaces out assignments.
pub fn black() -> Arc<dyn Formatter> {
	Arc::new(FnFormatter::new("black", "24.1.0", |src: &str| Some(src.replace("x=1", "x = 1"))))
}

/// Formatter whose startup probe cannot find an interpreter.
pub fn broken_black() -> Arc<dyn Formatter> {
	Arc::new(FnFormatter::new("black", "24.1.0", |src: &str| Some(src.to_owned())).with_probe_failure("no interpreter selected"))
}

/// Host with the dependency extension and an on-open formatter extension.
pub fn host_over(fs: Arc<dyn FileSystem>, formatter: Arc<dyn Formatter>) -> SimulatedHost {
	SimulatedHost::new(fs)
		.with_extension(ExtensionSpec::new(PYTHON).delay(Duration::from_millis(50)))
		.with_extension(ExtensionSpec::new(FORMATTER).activation(ActivationEvent::OnOpen).delay(Duration::from_millis(200)))
		.with_format_on_save(FORMATTER, CHANNEL, formatter)
}

pub fn config(strategy: WatchStrategy) -> HarnessConfig {
	let mut config = HarnessConfig {
		test_timeout_ms: 10_000,
		strategy,
		fixture: FixtureConfig {
			before: "/golden/myscript.unformatted".into(),
			after: "/golden/myscript.formatted".into(),
			target: target(),
		},
		..HarnessConfig::default()
	};
	config.activation.timeout_ms = 5_000;
	config
}

/// Orchestrator over `host`, sharing its state.
pub fn orchestrator(host: &SimulatedHost, config: HarnessConfig) -> Orchestrator {
	let _ = tracing_subscriber::fmt::try_init();
	Orchestrator::new(Arc::new(host.clone()), config)
}

/// Simulated host over [`golden_fs`] and an orchestrator for `strategy`.
pub fn harness(strategy: WatchStrategy, formatter: Arc<dyn Formatter>) -> (SimulatedHost, Orchestrator) {
	let host = host_over(Arc::new(golden_fs()), formatter);
	let orchestrator = orchestrator(&host, config(strategy));
	(host, orchestrator)
}

pub async fn disk(host: &SimulatedHost, path: &Path) -> String {
	host.read(path).await.expect("target readable")
}

/// Simulated host whose close-all command always fails.
pub struct CloseAllFails(pub SimulatedHost);

#[async_trait]
impl ExtensionRegistry for CloseAllFails {
	fn lookup(&self, id: &str) -> Option<ExtensionHandle> {
		self.0.lookup(id)
	}

	async fn activate(&self, handle: &ExtensionHandle) -> vigil_host::Result<()> {
		self.0.activate(handle).await
	}
}

#[async_trait]
impl Workspace for CloseAllFails {
	async fn open(&self, path: &Path) -> vigil_host::Result<Document> {
		self.0.open(path).await
	}

	async fn show(&self, doc: &Document) -> vigil_host::Result<Editor> {
		self.0.show(doc).await
	}

	fn active_editor(&self) -> Option<Editor> {
		self.0.active_editor()
	}
}

impl HostEvents for CloseAllFails {
	fn on_did_change_text_document(&self, listener: Listener<TextDocumentChange>) -> Subscription {
		self.0.on_did_change_text_document(listener)
	}

	fn on_did_save_text_document(&self, listener: Listener<SavedDocument>) -> Subscription {
		self.0.on_did_save_text_document(listener)
	}

	fn create_file_watcher(&self, scope: &Path, kinds: FileChangeKinds, listener: Listener<FileEvent>) -> Subscription {
		self.0.create_file_watcher(scope, kinds, listener)
	}
}

#[async_trait]
impl Commands for CloseAllFails {
	async fn execute(&self, command: HostCommand) -> vigil_host::Result<()> {
		match command {
			HostCommand::CloseAllEditors => Err(Error::Formatter("close-all refused".to_owned())),
			other => self.0.execute(other).await,
		}
	}
}

#[async_trait]
impl FileSystem for CloseAllFails {
	async fn read(&self, path: &Path) -> vigil_host::Result<String> {
		self.0.read(path).await
	}

	async fn write(&self, path: &Path, text: &str) -> vigil_host::Result<()> {
		self.0.write(path, text).await
	}
}
