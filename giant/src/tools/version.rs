//! `giant version`: prints the build's package version.

use anyhow::Result;

#[derive(clap::Args, Debug)]
pub struct Subcommand {
	/// emit machine-readable JSON instead of a plain line
	#[arg(long)]
	json: bool,
}

pub fn run(arguments: &Subcommand) -> Result<()> {
	let version = env!("CARGO_PKG_VERSION");
	if arguments.json {
		serde_json::to_writer_pretty(std::io::stdout(), &serde_json::json!({ "version": version }))?;
		println!();
	} else {
		println!("giant {version}");
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use crate::tests::run_command;

	#[test]
	fn runs_successfully() {
		run_command(vec!["giant", "version"]).unwrap();
	}

	#[test]
	fn json_flag_is_accepted() {
		run_command(vec!["giant", "version", "--json"]).unwrap();
	}
}
