//! In-process editor host.
//!
//! [`SimulatedHost`] implements every host capability on top of a
//! [`FileSystem`]. Extensions activate after a configurable delay, output
//! channels are exposed as documents named `output:<channel>`, and a
//! formatter extension can be installed as a format-on-save participant.
//!
//! Saving the active document runs the participant, applies its edit, writes
//! the file, then emits a file change, a save notification and finally one
//! line on the participant's output channel, in that order.

use std::collections::HashMap;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::{
	Commands, Document, Editor, Error, EventBus, ExtensionHandle, ExtensionRegistry, FileChangeKind,
	FileChangeKinds, FileEvent, FileSystem, HostCommand, HostEvents, Listener, Result, SavedDocument,
	Subscription, TextDocumentChange, Workspace,
};

mod formatter;

pub use formatter::{CommandFormatter, FnFormatter, Formatter, MIN_VERSION, match_line_endings, version_from_output, version_report};

/// Line prefix logged when the formatter probe fails.
pub const INTERPRETER_MISSING: &str = "Python interpreter missing";

/// Returns the document path of an output channel.
pub fn output_channel_path(channel: &str) -> PathBuf {
	PathBuf::from(format!("output:{channel}"))
}

/// When a simulated extension activates on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivationEvent {
	/// Only on an explicit [`ExtensionRegistry::activate`] call.
	OnDemand,
	/// When any document is opened, or on demand.
	OnOpen,
	/// Never; activation calls stay pending.
	Never,
}

/// Installed extension description.
#[derive(Debug, Clone)]
pub struct ExtensionSpec {
	pub id: String,
	pub activation: ActivationEvent,
	pub delay: Duration,
	pub channel: Option<String>,
	pub log: Vec<String>,
}

impl ExtensionSpec {
	/// An on-demand extension with no delay and no output.
	pub fn new(id: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			activation: ActivationEvent::OnDemand,
			delay: Duration::ZERO,
			channel: None,
			log: Vec::new(),
		}
	}

	pub fn activation(mut self, activation: ActivationEvent) -> Self {
		self.activation = activation;
		self
	}

	pub fn delay(mut self, delay: Duration) -> Self {
		self.delay = delay;
		self
	}

	/// Lines written to `channel` once activation completes.
	pub fn logs_to(mut self, channel: impl Into<String>, lines: impl IntoIterator<Item = impl Into<String>>) -> Self {
		self.channel = Some(channel.into());
		self.log = lines.into_iter().map(Into::into).collect();
		self
	}
}

struct SimExtension {
	handle: ExtensionHandle,
	spec: ExtensionSpec,
	once: Arc<OnceCell<std::result::Result<(), String>>>,
}

struct SaveParticipant {
	extension_id: String,
	channel: String,
	formatter: Arc<dyn Formatter>,
	ready: AtomicBool,
}

#[derive(Default)]
struct WorkspaceState {
	open: Vec<PathBuf>,
	texts: HashMap<PathBuf, String>,
	active: Option<PathBuf>,
}

struct Inner {
	fs: Arc<dyn FileSystem>,
	extensions: RwLock<HashMap<String, SimExtension>>,
	participant: RwLock<Option<Arc<SaveParticipant>>>,
	workspace: Mutex<WorkspaceState>,
	channels: Mutex<HashMap<String, String>>,
	changes: EventBus<TextDocumentChange>,
	saves: EventBus<SavedDocument>,
	files: EventBus<FileEvent>,
}

/// Simulated editor host. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SimulatedHost {
	inner: Arc<Inner>,
}

impl SimulatedHost {
	/// Creates a host with no extensions over `fs`.
	pub fn new(fs: Arc<dyn FileSystem>) -> Self {
		Self {
			inner: Arc::new(Inner {
				fs,
				extensions: RwLock::new(HashMap::new()),
				participant: RwLock::new(None),
				workspace: Mutex::new(WorkspaceState::default()),
				channels: Mutex::new(HashMap::new()),
				changes: EventBus::new("text_document.change"),
				saves: EventBus::new("text_document.save"),
				files: EventBus::new("workspace.file"),
			}),
		}
	}

	/// Installs an extension.
	pub fn with_extension(self, spec: ExtensionSpec) -> Self {
		let ext = SimExtension {
			handle: ExtensionHandle::new(spec.id.as_str()),
			spec,
			once: Arc::new(OnceCell::new()),
		};
		self.inner.extensions.write().insert(ext.spec.id.clone(), ext);
		self
	}

	/// Makes `extension_id` the format-on-save participant, logging to `channel`.
	///
	/// The participant probes the formatter when the extension activates and
	/// formats only after a successful probe.
	pub fn with_format_on_save(self, extension_id: impl Into<String>, channel: impl Into<String>, formatter: Arc<dyn Formatter>) -> Self {
		*self.inner.participant.write() = Some(Arc::new(SaveParticipant {
			extension_id: extension_id.into(),
			channel: channel.into(),
			formatter,
			ready: AtomicBool::new(false),
		}));
		self
	}

	/// Appends one line to an output channel, emitting a text change.
	pub fn append_output(&self, channel: &str, line: &str) {
		self.inner.append_output(channel, line);
	}

	/// Full text of an output channel.
	pub fn output(&self, channel: &str) -> String {
		self.inner.channels.lock().get(channel).cloned().unwrap_or_default()
	}

	/// Delivers a raw file notification to file watchers.
	pub fn emit_file_event(&self, event: FileEvent) -> usize {
		self.inner.files.emit(&event)
	}

	/// Delivers a raw save notification.
	pub fn emit_saved(&self, event: SavedDocument) -> usize {
		self.inner.saves.emit(&event)
	}

	/// Number of listeners still armed across all event streams.
	pub fn armed_listeners(&self) -> usize {
		self.inner.changes.len() + self.inner.saves.len() + self.inner.files.len()
	}

	/// Paths of open documents in opening order.
	pub fn open_documents(&self) -> Vec<PathBuf> {
		self.inner.workspace.lock().open.clone()
	}

	/// In-editor text of an open document.
	pub fn document_text(&self, path: &Path) -> Option<String> {
		self.inner.workspace.lock().texts.get(path).cloned()
	}
}

impl Inner {
	fn append_output(&self, channel: &str, line: &str) {
		let text = {
			let mut channels = self.channels.lock();
			let text = channels.entry(channel.to_owned()).or_default();
			text.push_str(line);
			text.push('\n');
			text.clone()
		};
		self.changes.emit(&TextDocumentChange {
			path: output_channel_path(channel),
			text,
		});
	}

	fn participant(&self) -> Option<Arc<SaveParticipant>> {
		self.participant.read().clone()
	}

	fn is_active(&self, id: &str) -> bool {
		self.extensions.read().get(id).is_some_and(|ext| ext.handle.is_active())
	}

	async fn activate(self: Arc<Self>, id: &str) -> Result<()> {
		let (handle, spec, once) = {
			let extensions = self.extensions.read();
			let ext = extensions.get(id).ok_or_else(|| Error::Activation {
				id: id.to_owned(),
				reason: "not installed".to_owned(),
			})?;
			(ext.handle.clone(), ext.spec.clone(), Arc::clone(&ext.once))
		};

		if spec.activation == ActivationEvent::Never {
			debug!(extension = id, "sim.activate.stalled");
			std::future::pending::<()>().await;
		}

		let outcome = once
			.get_or_init(|| async {
				tokio::time::sleep(spec.delay).await;
				if let Some(channel) = &spec.channel {
					for line in &spec.log {
						self.append_output(channel, line);
					}
				}
				if let Some(participant) = self.participant().filter(|p| p.extension_id == id) {
					self.probe(&participant).await;
				}
				handle.set_active(true);
				info!(extension = id, "sim.activate.done");
				Ok(())
			})
			.await;

		outcome.clone().map_err(|reason| Error::Activation { id: id.to_owned(), reason })
	}

	async fn probe(&self, participant: &SaveParticipant) {
		match participant.formatter.probe().await {
			Ok(lines) => {
				for line in lines {
					self.append_output(&participant.channel, &line);
				}
				participant.ready.store(true, Ordering::Release);
			}
			Err(e) => {
				warn!(extension = %participant.extension_id, error = %e, "sim.formatter.probe_failed");
				self.append_output(&participant.channel, &format!("{INTERPRETER_MISSING}: {e}"));
			}
		}
	}

	fn activate_on_open(self: &Arc<Self>) {
		let pending: Vec<String> = self
			.extensions
			.read()
			.values()
			.filter(|ext| ext.spec.activation == ActivationEvent::OnOpen && !ext.handle.is_active() && !ext.once.initialized())
			.map(|ext| ext.spec.id.clone())
			.collect();
		for id in pending {
			let inner = Arc::clone(self);
			tokio::spawn(async move {
				if let Err(e) = inner.activate(&id).await {
					warn!(extension = %id, error = %e, "sim.activate.failed");
				}
			});
		}
	}

	async fn write_file(&self, path: &Path, text: &str) -> Result<()> {
		let existed = self.fs.exists(path).await;
		self.fs.write(path, text).await?;

		let reloaded = {
			let mut ws = self.workspace.lock();
			match ws.texts.get_mut(path) {
				Some(doc) if doc.as_str() != text => {
					text.clone_into(doc);
					true
				}
				_ => false,
			}
		};
		if reloaded {
			self.changes.emit(&TextDocumentChange {
				path: path.to_path_buf(),
				text: text.to_owned(),
			});
		}

		let kind = if existed { FileChangeKind::Changed } else { FileChangeKind::Created };
		self.files.emit(&FileEvent {
			path: path.to_path_buf(),
			kind,
		});
		Ok(())
	}

	async fn save(&self, path: &Path) -> Result<()> {
		let mut text = self
			.workspace
			.lock()
			.texts
			.get(path)
			.cloned()
			.ok_or_else(|| Error::NotFound(path.to_path_buf()))?;

		let participant = self.participant().filter(|p| self.is_active(&p.extension_id));
		let mut note = None;
		if let Some(participant) = &participant {
			if !participant.ready.load(Ordering::Acquire) {
				note = Some(format!("Skipped formatting {}: formatter unavailable", path.display()));
			} else {
				match participant.formatter.format(path, &text).await {
					Ok(Some(formatted)) => {
						self.workspace.lock().texts.insert(path.to_path_buf(), formatted.clone());
						self.changes.emit(&TextDocumentChange {
							path: path.to_path_buf(),
							text: formatted.clone(),
						});
						text = formatted;
						note = Some(format!("Formatted {}", path.display()));
					}
					Ok(None) => note = Some(format!("No changes to {}", path.display())),
					Err(e) => note = Some(format!("Formatting error for {}: {e}", path.display())),
				}
			}
		}

		self.write_file(path, &text).await?;
		debug!(path = %path.display(), "sim.save");
		self.saves.emit(&SavedDocument {
			path: path.to_path_buf(),
			text,
		});

		if let (Some(participant), Some(note)) = (participant, note) {
			self.append_output(&participant.channel, &note);
		}
		Ok(())
	}
}

#[async_trait]
impl ExtensionRegistry for SimulatedHost {
	fn lookup(&self, id: &str) -> Option<ExtensionHandle> {
		self.inner.extensions.read().get(id).map(|ext| ext.handle.clone())
	}

	async fn activate(&self, handle: &ExtensionHandle) -> Result<()> {
		Arc::clone(&self.inner).activate(handle.id()).await
	}
}

#[async_trait]
impl Workspace for SimulatedHost {
	async fn open(&self, path: &Path) -> Result<Document> {
		let text = self.inner.fs.read(path).await?;
		{
			let mut ws = self.inner.workspace.lock();
			if !ws.open.iter().any(|p| p == path) {
				ws.open.push(path.to_path_buf());
			}
			ws.texts.insert(path.to_path_buf(), text.clone());
		}
		self.inner.activate_on_open();
		Ok(Document {
			path: path.to_path_buf(),
			text,
		})
	}

	async fn show(&self, doc: &Document) -> Result<Editor> {
		let mut ws = self.inner.workspace.lock();
		if !ws.open.iter().any(|p| *p == doc.path) {
			ws.open.push(doc.path.clone());
			ws.texts.insert(doc.path.clone(), doc.text.clone());
		}
		ws.active = Some(doc.path.clone());
		Ok(Editor { path: doc.path.clone() })
	}

	fn active_editor(&self) -> Option<Editor> {
		self.inner.workspace.lock().active.clone().map(|path| Editor { path })
	}
}

impl HostEvents for SimulatedHost {
	fn on_did_change_text_document(&self, listener: Listener<TextDocumentChange>) -> Subscription {
		self.inner.changes.subscribe(listener)
	}

	fn on_did_save_text_document(&self, listener: Listener<SavedDocument>) -> Subscription {
		self.inner.saves.subscribe(listener)
	}

	fn create_file_watcher(&self, scope: &Path, kinds: FileChangeKinds, mut listener: Listener<FileEvent>) -> Subscription {
		let scope = scope.to_path_buf();
		self.inner.files.subscribe(Box::new(move |event: &FileEvent| {
			if event.path.starts_with(&scope) && kinds.contains(event.kind.as_set()) {
				listener(event)
			} else {
				ControlFlow::Continue(())
			}
		}))
	}
}

#[async_trait]
impl Commands for SimulatedHost {
	async fn execute(&self, command: HostCommand) -> Result<()> {
		debug!(command = command.as_str(), "sim.execute");
		match command {
			HostCommand::CloseAllEditors => {
				*self.inner.workspace.lock() = WorkspaceState::default();
				Ok(())
			}
			HostCommand::SaveActive => {
				let path = self.inner.workspace.lock().active.clone().ok_or(Error::NoActiveEditor)?;
				self.inner.save(&path).await
			}
			HostCommand::SaveAll => {
				let open = self.open_documents();
				for path in open {
					self.inner.save(&path).await?;
				}
				Ok(())
			}
		}
	}
}

#[async_trait]
impl FileSystem for SimulatedHost {
	async fn read(&self, path: &Path) -> Result<String> {
		self.inner.fs.read(path).await
	}

	async fn write(&self, path: &Path, text: &str) -> Result<()> {
		self.inner.write_file(path, text).await
	}

	async fn exists(&self, path: &Path) -> bool {
		self.inner.fs.exists(path).await
	}
}
