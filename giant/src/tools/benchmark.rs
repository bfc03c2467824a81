//! `giant benchmark`: loads a benchmark CSV, runs every item through the
//! evaluation orchestrator, and reports per-benchmark scores (§5/§6).

use anyhow::{Context, Result};
use giant_core::model::new_run_id;
use giant_eval::{build_provider, load_benchmark_csv, validate_run_id, Orchestrator};
use giant_provider::retry::RetryPolicy;
use giant_provider::ProviderRegistry;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::GiantConfig;

#[derive(clap::Args, Debug)]
#[command(arg_required_else_help = true)]
pub struct Subcommand {
	/// benchmark CSV listing items to evaluate (§6.1)
	#[arg(required = true)]
	items: PathBuf,

	/// directory containing the benchmark's slide files
	#[arg(required = true)]
	wsi_root: PathBuf,

	/// JSON file with the agent and orchestrator configuration (§2.3)
	#[arg(long)]
	config: PathBuf,

	/// directory results, checkpoints, and trajectories are written under
	#[arg(long, default_value = "results")]
	results_dir: PathBuf,

	/// identifies this run for checkpointing and output file naming; a
	/// resumed run must reuse the same id to see its prior checkpoint
	#[arg(long)]
	run_id: Option<String>,

	/// seed for the bootstrap metric estimator, so repeated runs of the same
	/// results are bit-for-bit reproducible
	#[arg(long, default_value_t = 0)]
	bootstrap_seed: u64,

	/// emit the full per-item results as JSON instead of a score summary
	#[arg(long)]
	json: bool,
}

#[tokio::main]
pub async fn run(arguments: &Subcommand) -> Result<()> {
	let config = GiantConfig::load(&arguments.config)?;
	let orchestrator_config = config.require_orchestrator()?;

	let run_id = match &arguments.run_id {
		Some(run_id) => run_id.clone(),
		None => new_run_id(),
	};
	validate_run_id(&run_id).map_err(|err| giant_core::error::ConfigError(format!("{err:#}")))?;

	let items = load_benchmark_csv(&arguments.items)?;
	log::info!("loaded {} item(s) from {}", items.len(), arguments.items.display());

	let registry = Arc::new(ProviderRegistry::new());
	let provider = build_provider(config.agent.provider.clone(), config.agent.request_timeout(), registry, RetryPolicy::default())?;
	let opener = Arc::new(giant_slide::raster::raster_opener());

	let orchestrator = Orchestrator::new(
		config.agent,
		orchestrator_config,
		provider,
		opener,
		arguments.wsi_root.clone(),
		arguments.results_dir.clone(),
		run_id,
		arguments.bootstrap_seed,
	)?;

	let cancel = Arc::new(AtomicBool::new(false));
	{
		let cancel = Arc::clone(&cancel);
		tokio::spawn(async move {
			if tokio::signal::ctrl_c().await.is_ok() {
				log::warn!("cancellation requested; finishing in-flight items and checkpointing");
				cancel.store(true, Ordering::Relaxed);
			}
		});
	}

	let summary = orchestrator.run(items, cancel).await.context("running benchmark")?;

	if arguments.json {
		serde_json::to_writer_pretty(std::io::stdout(), &summary)?;
		println!();
	} else {
		for (benchmark, score) in &summary.scores {
			println!(
				"{benchmark}: {:.4} (n={}, bootstrap {:.4} ± {:.4})",
				score.point_estimate, score.item_count, score.bootstrap.mean, score.bootstrap.std_dev
			);
		}
	}

	anyhow::ensure!(!summary.cancelled, "run cancelled before every item completed; rerun with the same --run-id to resume");
	Ok(())
}

#[cfg(test)]
mod tests {
	use crate::tests::run_command;

	#[test]
	fn requires_items_and_wsi_root() {
		let err = run_command(vec!["giant", "benchmark"]).unwrap_err().to_string();
		assert!(err.contains("required"));
	}

	#[test]
	fn requires_a_config_flag() {
		let err = run_command(vec!["giant", "benchmark", "items.csv", "/wsi"]).unwrap_err().to_string();
		assert!(err.contains("--config") || err.contains("required"));
	}
}
