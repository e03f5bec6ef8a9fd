//! Bounded activation polling.
//!
//! Hosts do not expose a portable "activation finished" callback, so the
//! harness polls the handle's active flag at a fixed interval. A call never
//! waits longer than `timeout + interval`.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};
use vigil_host::ExtensionRegistry;

use crate::{HarnessError, Result};

/// Default poll interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Timing policy for [`ensure_active`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivationPolicy {
	/// Total bound on the wait.
	pub timeout: Duration,
	/// Delay between two checks of the active flag.
	pub interval: Duration,
	/// Request activation before polling.
	pub activate: bool,
}

impl Default for ActivationPolicy {
	fn default() -> Self {
		Self {
			timeout: Duration::from_secs(30),
			interval: DEFAULT_POLL_INTERVAL,
			activate: false,
		}
	}
}

/// Waits until extension `id` is active.
///
/// Returns `Ok(false)` when the bound elapses first. A missing extension is
/// [`HarnessError::ExtensionNotFound`], returned before any waiting.
pub async fn ensure_active(registry: &dyn ExtensionRegistry, id: &str, policy: ActivationPolicy) -> Result<bool> {
	let handle = registry
		.lookup(id)
		.ok_or_else(|| HarnessError::ExtensionNotFound(id.to_owned()))?;

	let start = Instant::now();
	let deadline = start + policy.timeout;

	if policy.activate && !handle.is_active() {
		debug!(extension = id, "activation.request");
		if let Ok(result) = tokio::time::timeout_at(deadline, registry.activate(&handle)).await {
			result?;
		} else {
			warn!(extension = id, timeout = ?policy.timeout, "activation.request_timed_out");
			return Ok(handle.is_active());
		}
	}

	loop {
		if handle.is_active() {
			debug!(extension = id, elapsed = ?start.elapsed(), "activation.ready");
			return Ok(true);
		}
		if Instant::now() >= deadline {
			warn!(extension = id, timeout = ?policy.timeout, "activation.timed_out");
			return Ok(false);
		}
		tokio::time::sleep(policy.interval).await;
	}
}
