//! Harness failure taxonomy.

use std::path::PathBuf;
use std::time::Duration;

/// A convenient type alias for `Result` with `E` = [`enum@HarnessError`].
pub type Result<T, E = HarnessError> = std::result::Result<T, E>;

/// Terminal failures of one harness run. None of them are retried.
///
/// A completion signal that never arrives is not represented here: it
/// surfaces as the suite's per-test timeout.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum HarnessError {
	/// The extension is not installed.
	#[error("extension {0} not found")]
	ExtensionNotFound(String),
	/// No editor is active after showing the target.
	#[error("no active editor")]
	NoActiveEditor,
	/// The active editor shows some other document.
	#[error("active editor is {}, expected {}", actual.display(), expected.display())]
	WrongActiveEditor {
		expected: PathBuf,
		actual: PathBuf,
	},
	/// The extension did not report active within the poll bound.
	#[error("extension {id} not activated in {timeout:?}")]
	ActivationTimeout {
		id: String,
		timeout: Duration,
	},
	/// The failure marker was observed before the success marker.
	#[error("completion rejected: observed failure marker {marker:?}")]
	SignalRejected {
		marker: String,
	},
	/// The subscription was released before the signal settled.
	#[error("completion signal dropped before it fired")]
	SignalDropped,
	/// The transformed file differs from the golden output.
	#[error("content mismatch: expected {expected:?}, got {actual:?}")]
	ContentMismatch {
		expected: String,
		actual: String,
	},
	/// The golden before and after contents are identical.
	#[error("fixture {} has identical before and after content", .0.display())]
	IndistinctFixture(PathBuf),
	/// Reading or writing a fixture file failed.
	#[error("fixture I/O on {}: {source}", path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: vigil_host::Error,
	},
	/// Any other host capability failure.
	#[error("host: {0}")]
	Host(#[from] vigil_host::Error),
}

impl HarnessError {
	pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(vigil_host::Error) -> Self {
		let path = path.into();
		move |source| Self::Io { path, source }
	}
}
