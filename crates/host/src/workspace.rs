use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::Result;

/// An open text document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
	pub path: PathBuf,
	pub text: String,
}

/// A visible editor showing one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Editor {
	pub path: PathBuf,
}

impl Editor {
	/// Returns true when this editor shows `path`.
	pub fn shows(&self, path: &Path) -> bool {
		self.path == path
	}
}

/// Document lifecycle on the editor surface.
#[async_trait]
pub trait Workspace: Send + Sync {
	/// Opens (or refreshes) a document from disk.
	async fn open(&self, path: &Path) -> Result<Document>;

	/// Shows a document in an editor and makes it active.
	async fn show(&self, doc: &Document) -> Result<Editor>;

	/// Returns the focused editor, if any.
	fn active_editor(&self) -> Option<Editor>;
}

/// Host commands the harness may issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostCommand {
	/// Close every open document and editor.
	CloseAllEditors,
	/// Save the document of the active editor, running save participants.
	SaveActive,
	/// Save every open document.
	SaveAll,
}

impl HostCommand {
	/// Stable command identifier used in logs.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::CloseAllEditors => "workbench.action.closeAllEditors",
			Self::SaveActive => "workbench.action.files.save",
			Self::SaveAll => "workbench.action.files.saveAll",
		}
	}
}

/// Command execution.
#[async_trait]
pub trait Commands: Send + Sync {
	/// Executes one command to completion.
	async fn execute(&self, command: HostCommand) -> Result<()>;
}
