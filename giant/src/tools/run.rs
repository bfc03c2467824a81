//! `giant run`: drives a single [`AgentRunner`] over one slide file and one
//! question, outside any benchmark — the unconstrained use named in §6.4.

use anyhow::{Context, Result};
use giant_agent::AgentRunner;
use giant_provider::retry::RetryPolicy;
use giant_provider::ProviderRegistry;
use giant_slide::SlideOpener;
use std::path::PathBuf;
use std::sync::Arc;

use crate::GiantConfig;

#[derive(clap::Args, Debug)]
#[command(arg_required_else_help = true)]
pub struct Subcommand {
	/// path to a slide image file (PNG/JPEG/TIFF; anything the `image` crate
	/// can decode)
	#[arg(required = true)]
	slide: PathBuf,

	/// question to ask the model about the slide
	#[arg(required = true)]
	question: String,

	/// JSON file with the agent configuration (§2.3)
	#[arg(long)]
	config: PathBuf,

	/// directory the run's trajectory JSON is written under
	#[arg(long, default_value = "results")]
	output_dir: PathBuf,

	/// emit the full `RunResult` as JSON instead of a short summary
	#[arg(long)]
	json: bool,
}

#[tokio::main]
pub async fn run(arguments: &Subcommand) -> Result<()> {
	let config = GiantConfig::load(&arguments.config)?;

	let registry = Arc::new(ProviderRegistry::new());
	let provider = giant_eval::build_provider(config.agent.provider.clone(), config.agent.request_timeout(), registry, RetryPolicy::default())?;
	let opener = giant_slide::raster::raster_opener();
	let handle = opener.open(&arguments.slide).await.with_context(|| format!("opening slide {}", arguments.slide.display()))?;

	let runner = AgentRunner::new(config.agent, provider);
	let result = runner.run(handle, &arguments.question).await?;

	std::fs::create_dir_all(&arguments.output_dir).with_context(|| format!("creating {}", arguments.output_dir.display()))?;
	let trajectory_path = arguments.output_dir.join(format!("{}.json", result.run_id));
	std::fs::write(&trajectory_path, serde_json::to_vec_pretty(&result)?).with_context(|| format!("writing {}", trajectory_path.display()))?;

	if arguments.json {
		serde_json::to_writer_pretty(std::io::stdout(), &result)?;
		println!();
	} else {
		println!("answer: {}", result.answer.as_deref().unwrap_or("<none>"));
		println!("success: {}", result.success);
		println!("turns: {}", result.trajectory.turns.len());
		println!("cost: ${:.4}", result.total_cost_usd);
		println!("trajectory written to {}", trajectory_path.display());
	}

	if !result.success {
		anyhow::bail!(result.error.clone().unwrap_or_else(|| "run did not produce an answer".into()));
	}
	Ok(())
}
