// Command-line entry point: wires clap's derive macros to the `run`,
// `benchmark`, `check-data`, `download`, `visualize`, and `version`
// subcommands (§6.4).
mod tools;

use anyhow::Result;
use clap::{Parser, Subcommand};
use clap_verbosity_flag::{ErrorLevel, Verbosity};

pub use giant::GiantConfig;

#[derive(Parser, Debug)]
#[command(
	author,
	version,
	about,
	long_about = None,
	propagate_version = true,
	disable_help_subcommand = true,
)]
struct Cli {
	#[command(subcommand)]
	command: Commands,

	#[command(flatten)]
	verbose: Verbosity<ErrorLevel>,
}

#[derive(Subcommand, Debug)]
enum Commands {
	/// Run a single slide through the agent loop with one question
	Run(tools::run::Subcommand),

	/// Run a benchmark CSV through the evaluation orchestrator
	Benchmark(tools::benchmark::Subcommand),

	/// Validate a benchmark CSV's slide paths without calling a provider
	#[clap(alias = "check_data")]
	CheckData(tools::check_data::Subcommand),

	/// Fetch a named dataset from the built-in registry
	Download(tools::download::Subcommand),

	/// Render a persisted trajectory as a static HTML page
	Visualize(tools::visualize::Subcommand),

	/// Print the build's package version
	Version(tools::version::Subcommand),
}

fn main() -> Result<()> {
	let cli = Cli::parse();

	env_logger::Builder::new().filter_level(cli.verbose.log_level_filter()).format_timestamp(None).init();

	run(cli)
}

fn run(cli: Cli) -> Result<()> {
	match &cli.command {
		Commands::Run(arguments) => tools::run::run(arguments),
		Commands::Benchmark(arguments) => tools::benchmark::run(arguments),
		Commands::CheckData(arguments) => tools::check_data::run(arguments),
		Commands::Download(arguments) => tools::download::run(arguments),
		Commands::Visualize(arguments) => tools::visualize::run(arguments),
		Commands::Version(arguments) => tools::version::run(arguments),
	}
}

#[cfg(test)]
mod tests {
	use crate::{run, Cli};
	use anyhow::Result;
	use clap::Parser;

	pub fn run_command(arg_vec: Vec<&str>) -> Result<String> {
		let cli = Cli::try_parse_from(arg_vec)?;
		let msg = format!("{cli:?}");
		run(cli)?;
		Ok(msg)
	}

	#[test]
	fn help() {
		let err = run_command(vec!["giant"]).unwrap_err().to_string();
		assert!(err.contains("Usage: giant"));
	}

	#[test]
	fn version_flag() {
		let err = run_command(vec!["giant", "-V"]).unwrap_err().to_string();
		assert!(err.starts_with("giant "));
	}

	#[test]
	fn version_subcommand() {
		run_command(vec!["giant", "version"]).unwrap();
	}

	#[test]
	fn check_data_alias() {
		let err = run_command(vec!["giant", "check_data"]).unwrap_err().to_string();
		assert!(err.contains("required"));
	}
}
