//! Vigil command line.
//!
//! Runs the smoke suite against a simulated editor host backed by the local
//! file system, with an external formatter program as the format-on-save
//! participant.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::Parser;
use tracing::info;
use vigil_harness::{HarnessConfig, Orchestrator, Suite, SuiteReport, WatchStrategy};
use vigil_host::LocalFs;
use vigil_host::sim::{ActivationEvent, CommandFormatter, ExtensionSpec, MIN_VERSION, SimulatedHost};

/// Command line arguments.
#[derive(Parser, Debug)]
#[command(name = "vigil")]
#[command(about = "Verify that a formatter extension activates and formats a file on save")]
struct Args {
	/// Harness configuration file (TOML)
	#[arg(short, long, value_name = "PATH")]
	config: Option<PathBuf>,

	/// Completion strategy: save, log or file
	#[arg(short, long)]
	strategy: Option<WatchStrategy>,

	/// Per-test timeout in milliseconds
	#[arg(long, value_name = "MS")]
	timeout_ms: Option<u64>,

	/// Formatter program
	#[arg(long, value_name = "PROGRAM", default_value = "black")]
	formatter: PathBuf,

	/// Leading formatter argument, repeatable (e.g. `-m black`)
	#[arg(long = "formatter-arg", value_name = "ARG", allow_hyphen_values = true)]
	formatter_args: Vec<String>,

	/// Module name reported by the version probe
	#[arg(long, value_name = "NAME")]
	module: Option<String>,

	/// Minimum supported formatter version
	#[arg(long, value_name = "VERSION", default_value = MIN_VERSION)]
	min_version: String,

	/// Output channel of the formatter extension
	#[arg(long, value_name = "NAME", default_value = "Black Formatter")]
	channel: String,

	/// Simulated activation delay of every extension, in milliseconds
	#[arg(long, value_name = "MS", default_value_t = 0)]
	activation_delay_ms: u64,

	/// Verbose logging
	#[arg(short, long)]
	verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
	let args = Args::parse();
	setup_tracing(args.verbose);

	let config = load_config(&args)?;
	info!(strategy = %config.strategy, target = %config.fixture.target.display(), "starting vigil");

	let host = build_host(&config, &args)?;
	let mut orchestrator = Orchestrator::new(Arc::new(host), config);
	let report = Suite::smoke(orchestrator.config().test_timeout())
		.run(&mut orchestrator)
		.await;

	print_report(&report);
	Ok(if report.passed() {
		ExitCode::SUCCESS
	} else {
		ExitCode::FAILURE
	})
}

fn load_config(args: &Args) -> anyhow::Result<HarnessConfig> {
	let mut config = match &args.config {
		Some(path) => HarnessConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
		None => HarnessConfig::default(),
	};
	if let Some(strategy) = args.strategy {
		config.strategy = strategy;
	}
	if let Some(ms) = args.timeout_ms {
		config.test_timeout_ms = ms;
	}
	config.validate()?;
	Ok(config)
}

/// Installs every configured extension; the last one formats on save.
fn build_host(config: &HarnessConfig, args: &Args) -> anyhow::Result<SimulatedHost> {
	let Some(participant) = config.extensions.last() else {
		bail!("no extensions configured");
	};

	let mut formatter = CommandFormatter::new(&args.formatter)
		.with_args(args.formatter_args.iter().cloned())
		.with_min_version(&args.min_version);
	if let Some(module) = &args.module {
		formatter = formatter.with_module(module);
	}
	if let Some(dir) = config.fixture.target.parent().filter(|d| !d.as_os_str().is_empty()) {
		formatter = formatter.with_cwd(dir);
	}

	let delay = Duration::from_millis(args.activation_delay_ms);
	let host = config
		.extensions
		.iter()
		.fold(SimulatedHost::new(Arc::new(LocalFs)), |host, ext| {
			let activation = if ext.activate {
				ActivationEvent::OnDemand
			} else {
				ActivationEvent::OnOpen
			};
			host.with_extension(ExtensionSpec::new(&ext.id).activation(activation).delay(delay))
		});

	Ok(host.with_format_on_save(&participant.id, &args.channel, Arc::new(formatter)))
}

fn print_report(report: &SuiteReport) {
	println!("{}", report.suite);
	for case in &report.cases {
		let mark = if case.outcome.is_passed() { "ok" } else { "FAIL" };
		println!("  {mark:<4} {} ({:.2?})", case.case, case.elapsed);
		if !case.outcome.is_passed() {
			println!("       {}", case.outcome);
		}
	}
	let failed = report.failures().count();
	println!("{} passed, {failed} failed", report.cases.len() - failed);
}

fn setup_tracing(verbose: bool) {
	use tracing_subscriber::EnvFilter;

	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
		if verbose {
			EnvFilter::new("vigil_harness=debug,vigil_host=debug,info")
		} else {
			EnvFilter::new("warn")
		}
	});
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.init();
}
