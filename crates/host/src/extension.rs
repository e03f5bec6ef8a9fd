use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::Result;

/// Observed reference to a host-managed extension.
///
/// The activation flag is shared with the host, so a handle looked up before
/// activation observes the transition without another lookup.
#[derive(Clone)]
pub struct ExtensionHandle {
	id: Arc<str>,
	active: Arc<AtomicBool>,
}

impl ExtensionHandle {
	/// Creates an inactive handle.
	pub fn new(id: impl Into<Arc<str>>) -> Self {
		Self {
			id: id.into(),
			active: Arc::new(AtomicBool::new(false)),
		}
	}

	/// Returns the extension identifier.
	pub fn id(&self) -> &str {
		&self.id
	}

	/// Returns true once the host finished activating the extension.
	pub fn is_active(&self) -> bool {
		self.active.load(Ordering::Acquire)
	}

	/// Flips the activation flag. Only hosts call this.
	pub fn set_active(&self, active: bool) {
		self.active.store(active, Ordering::Release);
	}
}

impl fmt::Debug for ExtensionHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ExtensionHandle")
			.field("id", &self.id)
			.field("active", &self.is_active())
			.finish()
	}
}

/// Extension lookup and activation.
#[async_trait]
pub trait ExtensionRegistry: Send + Sync {
	/// Looks up an installed extension by identifier.
	fn lookup(&self, id: &str) -> Option<ExtensionHandle>;

	/// Requests activation and resolves once the host finished it.
	async fn activate(&self, handle: &ExtensionHandle) -> Result<()>;
}
