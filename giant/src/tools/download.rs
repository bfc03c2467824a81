//! `giant download`: resolves a named dataset against a small built-in
//! registry and shells out to `curl`/`tar` to fetch and extract it (§6.4: a
//! thin wrapper, intentionally out of scope as a subsystem).

use anyhow::{ensure, Context, Result};
use giant_core::error::ConfigError;
use std::path::PathBuf;
use std::process::Command;

struct Dataset {
	name: &'static str,
	url: &'static str,
}

/// The built-in registry of datasets `giant download` knows how to fetch.
/// Intentionally small and hardcoded — this is the "thin wrapper" §6.4
/// calls for, not a package manager.
const DATASETS: &[Dataset] = &[
	Dataset { name: "panda", url: "https://download.example.org/giant/panda.tar.gz" },
	Dataset { name: "mhist", url: "https://download.example.org/giant/mhist.tar.gz" },
	Dataset { name: "organ-id", url: "https://download.example.org/giant/organ-id.tar.gz" },
];

fn lookup(name: &str) -> Option<&'static Dataset> {
	DATASETS.iter().find(|dataset| dataset.name == name)
}

#[derive(clap::Args, Debug)]
#[command(arg_required_else_help = true)]
pub struct Subcommand {
	/// name of a dataset in the built-in registry
	#[arg(required = true)]
	dataset: String,

	/// directory the archive is downloaded into and extracted under
	#[arg(long, default_value = "data")]
	dest: PathBuf,

	#[arg(long)]
	json: bool,
}

pub fn run(arguments: &Subcommand) -> Result<()> {
	let dataset = lookup(&arguments.dataset).ok_or_else(|| {
		let known: Vec<&str> = DATASETS.iter().map(|d| d.name).collect();
		ConfigError(format!("unknown dataset {:?}; known datasets: {}", arguments.dataset, known.join(", ")))
	})?;

	std::fs::create_dir_all(&arguments.dest).with_context(|| format!("creating {}", arguments.dest.display()))?;
	let archive_path = arguments.dest.join(format!("{}.tar.gz", dataset.name));

	let status = Command::new("curl")
		.args(["-fL", "-o"])
		.arg(&archive_path)
		.arg(dataset.url)
		.status()
		.context("invoking curl to fetch the dataset archive")?;
	ensure!(status.success(), "curl exited with {status}");

	let status = Command::new("tar")
		.args(["-xzf"])
		.arg(&archive_path)
		.args(["-C"])
		.arg(&arguments.dest)
		.status()
		.context("invoking tar to extract the dataset archive")?;
	ensure!(status.success(), "tar exited with {status}");

	if arguments.json {
		serde_json::to_writer_pretty(std::io::stdout(), &serde_json::json!({ "dataset": dataset.name, "dest": arguments.dest }))?;
		println!();
	} else {
		println!("downloaded {} into {}", dataset.name, arguments.dest.display());
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::lookup;
	use crate::tests::run_command;

	#[test]
	fn requires_a_dataset_name() {
		let err = run_command(vec!["giant", "download"]).unwrap_err().to_string();
		assert!(err.contains("required"));
	}

	#[test]
	fn unknown_dataset_is_rejected_before_shelling_out() {
		assert!(lookup("not-a-real-dataset").is_none());
	}

	#[test]
	fn known_datasets_resolve() {
		assert!(lookup("panda").is_some());
		assert!(lookup("mhist").is_some());
		assert!(lookup("organ-id").is_some());
	}
}
