//! Editor host capabilities consumed by the verification harness.
//!
//! The harness never talks to a concrete editor. It sees the host only through
//! the capability traits defined here:
//!
//! - [`ExtensionRegistry`]: extension lookup and activation.
//! - [`Workspace`]: document open/show and the active editor.
//! - [`HostEvents`]: text-changed, saved and file-changed event streams.
//! - [`Commands`]: close-all, save-active and save-all.
//! - [`FileSystem`]: whole-file read and write.
//!
//! [`EditorHost`] bundles all of them. [`sim::SimulatedHost`] is an in-process
//! implementation with a format-on-save participant, used by tests and the CLI.
use std::io;
use std::path::PathBuf;

mod events;
mod extension;
mod fs;
pub mod sim;
mod workspace;

pub use events::{
	EventBus, FileChangeKind, FileChangeKinds, FileEvent, HostEvents, Listener, SavedDocument,
	Subscription, TextDocumentChange,
};
pub use extension::{ExtensionHandle, ExtensionRegistry};
pub use fs::{FileSystem, LocalFs, MemoryFs};
pub use workspace::{Commands, Document, Editor, HostCommand, Workspace};

/// A convenient type alias for `Result` with `E` = [`enum@crate::Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors reported by host capabilities.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
	/// A file or document does not exist.
	#[error("not found: {}", .0.display())]
	NotFound(PathBuf),
	/// Input/output error on a host path.
	#[error("I/O error on {}: {error}", path.display())]
	Io {
		/// Path the operation was applied to.
		path: PathBuf,
		/// The underlying I/O error.
		error: io::Error,
	},
	/// The save participant failed to produce formatted output.
	#[error("formatter failed: {0}")]
	Formatter(String),
	/// An extension failed while activating.
	#[error("activation of {id} failed: {reason}")]
	Activation {
		/// Extension identifier.
		id: String,
		/// Human readable reason.
		reason: String,
	},
	/// The command requires an active editor and none is shown.
	#[error("no active editor")]
	NoActiveEditor,
}

impl Error {
	pub(crate) fn io(path: impl Into<PathBuf>, error: io::Error) -> Self {
		let path = path.into();
		if error.kind() == io::ErrorKind::NotFound {
			Self::NotFound(path)
		} else {
			Self::Io { path, error }
		}
	}
}

/// Every capability the harness consumes, as one object-safe bound.
pub trait EditorHost: ExtensionRegistry + Workspace + HostEvents + Commands + FileSystem {}

impl<T> EditorHost for T where T: ExtensionRegistry + Workspace + HostEvents + Commands + FileSystem + ?Sized {}
