//! Host event streams and subscriptions.
//!
//! Listeners return [`ControlFlow`]: `Break` releases the listener's own
//! subscription atomically with the delivery that produced it, so a listener
//! that completes a one-shot signal can never be invoked again.

use std::fmt;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

/// Text of a document changed. Carries the full current text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDocumentChange {
	pub path: PathBuf,
	pub text: String,
}

/// A document was written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedDocument {
	pub path: PathBuf,
	pub text: String,
}

/// Kind of a file-system notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileChangeKind {
	Created,
	Changed,
	Deleted,
}

bitflags::bitflags! {
	/// Set of file notification kinds a watcher is interested in.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct FileChangeKinds: u8 {
		const CREATED = 1 << 0;
		const CHANGED = 1 << 1;
		const DELETED = 1 << 2;
	}
}

impl FileChangeKind {
	/// Returns the bitflag for this kind.
	pub const fn as_set(self) -> FileChangeKinds {
		match self {
			Self::Created => FileChangeKinds::CREATED,
			Self::Changed => FileChangeKinds::CHANGED,
			Self::Deleted => FileChangeKinds::DELETED,
		}
	}
}

/// A file-system notification for one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
	pub path: PathBuf,
	pub kind: FileChangeKind,
}

/// Event callback. Returning `Break` releases the subscription.
pub type Listener<E> = Box<dyn FnMut(&E) -> ControlFlow<()> + Send>;

/// Event stream subscriptions offered by the host.
pub trait HostEvents: Send + Sync {
	/// Observes text changes of every document, including output channels.
	fn on_did_change_text_document(&self, listener: Listener<TextDocumentChange>) -> Subscription;

	/// Observes document saves.
	fn on_did_save_text_document(&self, listener: Listener<SavedDocument>) -> Subscription;

	/// Creates a file watcher scoped to `scope`, delivering only `kinds`.
	fn create_file_watcher(&self, scope: &Path, kinds: FileChangeKinds, listener: Listener<FileEvent>) -> Subscription;
}

trait Detach: Send + Sync {
	fn detach(&self, id: u64);
}

/// Handle to an armed listener.
///
/// Released exactly once: by the listener returning `Break`, by
/// [`Subscription::dispose`], or on drop. Later releases are no-ops.
pub struct Subscription {
	id: u64,
	stream: &'static str,
	released: Arc<AtomicBool>,
	owner: Weak<dyn Detach>,
}

impl Subscription {
	/// Releases the listener. Returns false if it was already released.
	pub fn dispose(&self) -> bool {
		if self.released.swap(true, Ordering::AcqRel) {
			return false;
		}
		if let Some(owner) = self.owner.upgrade() {
			owner.detach(self.id);
		}
		tracing::trace!(stream = self.stream, id = self.id, "subscription.dispose");
		true
	}

	/// Returns true once the listener can no longer be invoked.
	pub fn is_released(&self) -> bool {
		self.released.load(Ordering::Acquire)
	}

	/// Name of the event stream this subscription listens on.
	pub fn stream(&self) -> &'static str {
		self.stream
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		self.dispose();
	}
}

impl fmt::Debug for Subscription {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Subscription")
			.field("id", &self.id)
			.field("stream", &self.stream)
			.field("released", &self.is_released())
			.finish()
	}
}

struct Entry<E> {
	id: u64,
	released: Arc<AtomicBool>,
	listener: Arc<Mutex<Listener<E>>>,
}

struct BusState<E> {
	next_id: u64,
	entries: Vec<Entry<E>>,
}

impl<E: 'static> Detach for Mutex<BusState<E>> {
	fn detach(&self, id: u64) {
		self.lock().entries.retain(|entry| entry.id != id);
	}
}

/// Listener table for one event stream.
///
/// Delivery works on a snapshot taken under the table lock; the lock is not
/// held while listeners run, so listeners may dispose subscriptions or
/// subscribe new ones. Listeners added during a delivery see the next event.
pub struct EventBus<E> {
	name: &'static str,
	state: Arc<Mutex<BusState<E>>>,
}

impl<E: 'static> EventBus<E> {
	/// Creates an empty stream.
	pub fn new(name: &'static str) -> Self {
		Self {
			name,
			state: Arc::new(Mutex::new(BusState {
				next_id: 0,
				entries: Vec::new(),
			})),
		}
	}

	/// Registers a listener.
	pub fn subscribe(&self, listener: Listener<E>) -> Subscription {
		let released = Arc::new(AtomicBool::new(false));
		let id = {
			let mut state = self.state.lock();
			state.next_id += 1;
			let id = state.next_id;
			state.entries.push(Entry {
				id,
				released: Arc::clone(&released),
				listener: Arc::new(Mutex::new(listener)),
			});
			id
		};
		tracing::trace!(stream = self.name, id, "subscription.arm");

		let state: Arc<dyn Detach> = self.state.clone();
		Subscription {
			id,
			stream: self.name,
			released,
			owner: Arc::downgrade(&state),
		}
	}

	/// Delivers `event` to every live listener. Returns the delivery count.
	pub fn emit(&self, event: &E) -> usize {
		let snapshot: Vec<_> = {
			let state = self.state.lock();
			state
				.entries
				.iter()
				.filter(|entry| !entry.released.load(Ordering::Acquire))
				.map(|entry| (Arc::clone(&entry.released), Arc::clone(&entry.listener)))
				.collect()
		};

		let mut delivered = 0;
		let mut any_released = false;
		for (released, listener) in snapshot {
			let mut listener = listener.lock();
			// Re-checked under the listener lock: a concurrent delivery may have broken first.
			if released.load(Ordering::Acquire) {
				continue;
			}
			delivered += 1;
			if (listener)(event).is_break() {
				released.store(true, Ordering::Release);
				any_released = true;
			}
		}

		if any_released {
			self.state
				.lock()
				.entries
				.retain(|entry| !entry.released.load(Ordering::Acquire));
		}
		delivered
	}

	/// Number of listeners that can still be invoked.
	pub fn len(&self) -> usize {
		self.state
			.lock()
			.entries
			.iter()
			.filter(|entry| !entry.released.load(Ordering::Acquire))
			.count()
	}

	/// Returns true when no listener is armed.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Stream name used in logs.
	pub fn name(&self) -> &'static str {
		self.name
	}
}

#[cfg(test)]
mod tests;
