//! Format-on-save participants for the simulated host.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::{Error, Result};

/// Oldest formatter release the formatter extension accepts without a warning.
pub const MIN_VERSION: &str = "22.3.0";

/// Arguments that stop the formatter from emitting formatted source on stdout.
const BLOCKED_ARGS: &[&str] = &["--diff", "--check", "--color", "--no-color", "-h", "--help", "--version"];

/// A formatter driven by the formatter extension.
#[async_trait]
pub trait Formatter: Send + Sync {
	/// Probes the tool at extension startup. Returns the lines to log.
	async fn probe(&self) -> Result<Vec<String>>;

	/// Formats `source`. `None` means there is nothing to change.
	async fn format(&self, path: &Path, source: &str) -> Result<Option<String>>;
}

/// Formatter backed by a closure.
pub struct FnFormatter<F> {
	module: String,
	version: String,
	probe_failure: Option<String>,
	format: F,
}

impl<F> FnFormatter<F>
where
	F: Fn(&str) -> Option<String> + Send + Sync,
{
	/// Creates a closure formatter reporting itself as `module==version`.
	pub fn new(module: impl Into<String>, version: impl Into<String>, format: F) -> Self {
		Self {
			module: module.into(),
			version: version.into(),
			probe_failure: None,
			format,
		}
	}

	/// Makes [`Formatter::probe`] fail, as when the interpreter cannot be found.
	pub fn with_probe_failure(mut self, reason: impl Into<String>) -> Self {
		self.probe_failure = Some(reason.into());
		self
	}
}

#[async_trait]
impl<F> Formatter for FnFormatter<F>
where
	F: Fn(&str) -> Option<String> + Send + Sync,
{
	async fn probe(&self) -> Result<Vec<String>> {
		match &self.probe_failure {
			Some(reason) => Err(Error::Formatter(reason.clone())),
			None => Ok(version_report(&self.module, MIN_VERSION, &self.version)),
		}
	}

	async fn format(&self, _path: &Path, source: &str) -> Result<Option<String>> {
		let normalized = source.replace("\r\n", "\n");
		Ok((self.format)(&normalized)
			.map(|out| match_line_endings(source, &out))
			.filter(|out| out != source))
	}
}

/// Formatter running an external program that reads source on stdin.
///
/// The program is invoked as `<program> <args..> --stdin-filename <path> -`
/// and must print the formatted source on stdout.
#[derive(Debug, Clone)]
pub struct CommandFormatter {
	program: PathBuf,
	args: Vec<String>,
	module: String,
	min_version: String,
	cwd: Option<PathBuf>,
}

impl CommandFormatter {
	/// Creates a formatter for `program`; the module name defaults to its file stem.
	pub fn new(program: impl Into<PathBuf>) -> Self {
		let program = program.into();
		let module = program
			.file_stem()
			.map(|s| s.to_string_lossy().into_owned())
			.unwrap_or_default();
		Self {
			program,
			args: Vec::new(),
			module,
			min_version: MIN_VERSION.to_owned(),
			cwd: None,
		}
	}

	/// Adds leading arguments, e.g. `-m black` for an interpreter program.
	pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
		let args: Vec<String> = args.into_iter().map(Into::into).collect();
		self.args = filter_args(args);
		self
	}

	/// Overrides the module name used in version reports.
	pub fn with_module(mut self, module: impl Into<String>) -> Self {
		self.module = module.into();
		self
	}

	/// Overrides the minimum supported version.
	pub fn with_min_version(mut self, version: impl Into<String>) -> Self {
		self.min_version = version.into();
		self
	}

	/// Runs the program in `cwd`.
	pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
		self.cwd = Some(cwd.into());
		self
	}

	/// Path passed as `--stdin-filename`. With a `cwd` set, a relative path is
	/// resolved against this process's working directory, not the formatter's.
	fn stdin_filename(&self, path: &Path) -> Result<PathBuf> {
		if path.is_absolute() || self.cwd.is_none() {
			return Ok(path.to_path_buf());
		}
		std::path::absolute(path).map_err(|error| Error::io(path, error))
	}

	async fn run(&self, extra: &[&str], stdin: Option<&str>) -> Result<std::process::Output> {
		let mut cmd = tokio::process::Command::new(&self.program);
		cmd.args(&self.args)
			.args(extra)
			.stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			.kill_on_drop(true);
		if let Some(cwd) = &self.cwd {
			cmd.current_dir(cwd);
		}

		let mut child = cmd
			.spawn()
			.map_err(|e| Error::Formatter(format!("failed to spawn {}: {e}", self.program.display())))?;

		let pipe = child.stdin.take();
		let feed = async move {
			if let (Some(mut pipe), Some(source)) = (pipe, stdin) {
				pipe.write_all(source.as_bytes()).await?;
				pipe.shutdown().await?;
			}
			Ok::<_, std::io::Error>(())
		};
		let (fed, output) = tokio::join!(feed, child.wait_with_output());
		let output = output.map_err(|e| Error::Formatter(format!("{}: {e}", self.program.display())))?;
		fed.map_err(|e| Error::Formatter(format!("writing stdin of {}: {e}", self.program.display())))?;
		Ok(output)
	}
}

#[async_trait]
impl Formatter for CommandFormatter {
	async fn probe(&self) -> Result<Vec<String>> {
		let output = self.run(&["--version"], None).await?;
		let stdout = String::from_utf8_lossy(&output.stdout);
		let version = version_from_output(&stdout)
			.ok_or_else(|| Error::Formatter(format!("unrecognized version output: {stdout:?}")))?;
		Ok(version_report(&self.module, &self.min_version, version))
	}

	async fn format(&self, path: &Path, source: &str) -> Result<Option<String>> {
		let filename = self.stdin_filename(path)?;
		let filename = filename.to_string_lossy();
		let normalized = source.replace("\r\n", "\n");
		let output = self.run(&["--stdin-filename", &filename, "-"], Some(&normalized)).await?;

		let stderr = String::from_utf8_lossy(&output.stderr);
		if stderr.contains("Error:") || stderr.contains("error:") {
			return Err(Error::Formatter(stderr.into_owned()));
		}
		if !stderr.is_empty() {
			tracing::debug!(program = %self.program.display(), stderr = %stderr.trim_end(), "formatter.stderr");
		}

		let stdout = String::from_utf8(output.stdout).map_err(|e| Error::Formatter(format!("non UTF-8 output: {e}")))?;
		if stdout.is_empty() {
			return Ok(None);
		}
		let formatted = match_line_endings(source, &stdout);
		Ok((formatted != source).then_some(formatted))
	}
}

/// Lines the formatter extension logs after a successful version probe.
pub fn version_report(module: &str, min_version: &str, found: &str) -> Vec<String> {
	let mut lines = Vec::with_capacity(3);
	if version_lt(found, min_version) {
		lines.push("Version of formatter running is less than min supported version:".to_owned());
	}
	lines.push(format!("SUPPORTED {module}>={min_version}"));
	lines.push(format!("FOUND {module}=={found}"));
	lines
}

/// Extracts the version from `--version` output such as `black, 24.1.0 (compiled: yes)`.
pub fn version_from_output(stdout: &str) -> Option<&str> {
	stdout.lines().next()?.split(' ').nth(1).filter(|v| !v.is_empty())
}

fn version_parts(version: &str) -> Vec<u64> {
	version
		.split('.')
		.map(|part| {
			let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
			digits.parse().unwrap_or(0)
		})
		.collect()
}

fn version_lt(lhs: &str, rhs: &str) -> bool {
	let (mut lhs, mut rhs) = (version_parts(lhs), version_parts(rhs));
	let len = lhs.len().max(rhs.len());
	lhs.resize(len, 0);
	rhs.resize(len, 0);
	lhs < rhs
}

fn line_ending(text: &str) -> Option<&'static str> {
	let first = text.split_inclusive('\n').next()?;
	if !first.ends_with('\n') {
		return None;
	}
	Some(if first.ends_with("\r\n") { "\r\n" } else { "\n" })
}

/// Rewrites `text` to use the line endings of `document`.
pub fn match_line_endings(document: &str, text: &str) -> String {
	match (line_ending(document), line_ending(text)) {
		(Some(expected), Some(actual)) if expected != actual => text.replace(actual, expected),
		_ => text.to_owned(),
	}
}

fn filter_args(args: Vec<String>) -> Vec<String> {
	args.into_iter().filter(|a| !BLOCKED_ARGS.contains(&a.as_str())).collect()
}
