//! The Evaluation Orchestrator (§5): drives a bounded pool of
//! [`AgentRunner`](giant_agent::AgentRunner)s over a benchmark's items,
//! majority-votes `runs_per_item` independent runs per item, checkpoints
//! completed items so a killed run resumes cleanly, and persists the
//! trajectory and summary artifacts §6.5 names.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{ensure, Context, Result};
use giant_agent::AgentRunner;
use giant_core::config::{AgentConfig, OrchestratorConfig};
use giant_core::model::{BenchmarkItem, RunResult};
use giant_provider::Provider;
use giant_slide::SlideOpener;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::checkpoint::{sanitize_item_id, Checkpoint};
use crate::extract::{canonicalize_truth, extract_label};
use crate::metrics::{bootstrap, score, BootstrapEstimate, ScoredItem, DEFAULT_BOOTSTRAP_ITERATIONS};
use crate::resolve::resolve_slide_path;

/// All `runs_per_item` attempts at one item, plus the majority-voted
/// verdict they resolve to.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ItemOutcome {
	pub item_id: String,
	pub benchmark: String,
	pub metric_type: giant_core::model::MetricType,
	pub truth: Option<i64>,
	pub predicted: Option<i64>,
	pub correct: Option<bool>,
	pub runs: Vec<RunResult>,
}

/// Per-benchmark scoring, including the bootstrap estimate (§8).
#[derive(Debug, Clone, serde::Serialize)]
pub struct BenchmarkScore {
	pub point_estimate: f64,
	pub bootstrap: BootstrapEstimate,
	pub item_count: usize,
}

/// Everything one evaluation invocation produced.
#[derive(Debug, Clone, serde::Serialize)]
pub struct EvalSummary {
	pub run_id: String,
	pub outcomes: Vec<ItemOutcome>,
	pub scores: BTreeMap<String, BenchmarkScore>,
	/// Set if a cancellation request cut the run short before every item
	/// was attempted (§5: "stop accepting new items, let in-flight runners
	/// finish, write the checkpoint, exit non-zero").
	pub cancelled: bool,
}

/// Bounded-concurrency executor over one benchmark's items.
pub struct Orchestrator {
	agent_config: AgentConfig,
	orchestrator_config: OrchestratorConfig,
	provider: Arc<dyn Provider>,
	opener: Arc<dyn SlideOpener>,
	wsi_root: PathBuf,
	results_dir: PathBuf,
	run_id: String,
	bootstrap_seed: u64,
}

impl Orchestrator {
	/// # Errors
	/// Returns an error if `agent_config`/`orchestrator_config` fail their
	/// own validation, or if a budget ceiling is set while `max_concurrency`
	/// is greater than 1 (§5: a per-run dollar budget is only meaningful
	/// against a serialized sequence of runs; checking it against
	/// concurrently in-flight spend would race).
	pub fn new(
		agent_config: AgentConfig,
		orchestrator_config: OrchestratorConfig,
		provider: Arc<dyn Provider>,
		opener: Arc<dyn SlideOpener>,
		wsi_root: PathBuf,
		results_dir: PathBuf,
		run_id: String,
		bootstrap_seed: u64,
	) -> Result<Self> {
		agent_config.validate().context("validating agent config")?;
		orchestrator_config.validate().context("validating orchestrator config")?;
		ensure!(
			!agent_config.budget_enabled() || orchestrator_config.max_concurrency == 1,
			"budget_usd requires max_concurrency == 1 (concurrent spend cannot be checked against a single ceiling)"
		);
		Ok(Self {
			agent_config,
			orchestrator_config,
			provider,
			opener,
			wsi_root,
			results_dir,
			run_id,
			bootstrap_seed,
		})
	}

	/// Runs every item in `items` (skipping ones the checkpoint already
	/// marks complete), up to `orchestrator_config.max_concurrency` at a
	/// time. `cancel` is polled before admitting each new item; when it
	/// flips to `true`, no further items are started but in-flight ones are
	/// allowed to finish.
	///
	/// # Errors
	/// Returns an error if the checkpoint directory cannot be created or a
	/// persisted artifact cannot be written.
	pub async fn run(&self, items: Vec<BenchmarkItem>, cancel: Arc<AtomicBool>) -> Result<EvalSummary> {
		let checkpoint = Checkpoint::open(&self.results_dir, &self.run_id)?;
		let already_done = checkpoint.completed_item_ids()?;
		let trajectories_dir = self.results_dir.join("trajectories");
		std::fs::create_dir_all(&trajectories_dir)?;

		let pending = items.iter().filter(|item| !already_done.contains(&item.id)).count();
		let mut progress = giant_core::progress::get_progress_bar("evaluating items", pending as u64);

		let semaphore = Arc::new(Semaphore::new(self.orchestrator_config.max_concurrency));
		let mut join_set: JoinSet<Result<ItemOutcome>> = JoinSet::new();
		let mut cancelled = false;

		for item in items {
			if already_done.contains(&item.id) {
				continue;
			}
			if cancel.load(Ordering::Relaxed) {
				cancelled = true;
				break;
			}

			let permit = Arc::clone(&semaphore).acquire_owned().await.expect("semaphore is never closed");
			let agent_config = self.agent_config.clone();
			let provider = Arc::clone(&self.provider);
			let opener = Arc::clone(&self.opener);
			let wsi_root = self.wsi_root.clone();
			let trajectories_dir = trajectories_dir.clone();
			let runs_per_item = self.orchestrator_config.runs_per_item;

			join_set.spawn(async move {
				let _permit = permit;
				run_item(&item, runs_per_item, &agent_config, provider, opener.as_ref(), &wsi_root, &trajectories_dir).await
			});
		}

		let mut outcomes = Vec::new();
		while let Some(joined) = join_set.join_next().await {
			let outcome = joined.context("evaluation task panicked")??;
			checkpoint.mark_completed(&outcome.item_id)?;
			progress.inc(1);
			outcomes.push(outcome);
		}
		progress.finish();

		let scores = score_outcomes(&outcomes, self.bootstrap_seed);
		let summary = EvalSummary {
			run_id: self.run_id.clone(),
			outcomes,
			scores,
			cancelled,
		};
		write_results_file(&self.results_dir, &summary)?;
		Ok(summary)
	}
}

/// Runs `runs_per_item` independent [`AgentRunner`] attempts at `item`,
/// majority-votes their extracted labels, and persists each run's
/// trajectory.
async fn run_item(
	item: &BenchmarkItem,
	runs_per_item: u32,
	agent_config: &AgentConfig,
	provider: Arc<dyn Provider>,
	opener: &dyn SlideOpener,
	wsi_root: &Path,
	trajectories_dir: &Path,
) -> Result<ItemOutcome> {
	let slide_path = resolve_slide_path(wsi_root, item).map_err(|err| anyhow::anyhow!("{err}"))?;
	let options = item.choices.clone().unwrap_or_default();
	let truth = canonicalize_truth(&item.answer, &item.benchmark, &options);

	let mut runs = Vec::new();
	let mut labels = Vec::new();
	for run_index in 0..runs_per_item {
		let handle = opener.open(&slide_path).await.with_context(|| format!("opening slide for item {}", item.id))?;
		let runner = AgentRunner::new(agent_config.clone(), Arc::clone(&provider));
		let mut result = runner.run(handle, &item.question).await?;
		result.item_id = Some(item.id.clone());

		let predicted = result.answer.as_deref().and_then(|answer| extract_label(answer, &item.benchmark, &options).label);
		result.correct = truth.zip(predicted).map(|(truth, predicted)| truth == predicted);

		let file_name = format!("{}_run{}.json", sanitize_item_id(&item.id), run_index + 1);
		let contents = serde_json::to_vec_pretty(&result)?;
		std::fs::write(trajectories_dir.join(file_name), contents)?;

		labels.push(predicted);
		runs.push(result);
	}

	let predicted = majority_vote(&labels);
	let correct = truth.zip(predicted).map(|(truth, predicted)| truth == predicted);

	Ok(ItemOutcome {
		item_id: item.id.clone(),
		benchmark: item.benchmark.clone(),
		metric_type: item.metric_type,
		truth,
		predicted,
		correct,
		runs,
	})
}

/// The most frequent `Some` label across `labels`, ties broken by whichever
/// label was seen first (§5: "majority voting ... ties broken by first
/// occurrence"). `None` only if every run's extraction failed.
fn majority_vote(labels: &[Option<i64>]) -> Option<i64> {
	let mut order = Vec::new();
	let mut counts: HashMap<i64, usize> = HashMap::new();
	for label in labels.iter().flatten() {
		*counts.entry(*label).or_insert(0) += 1;
		if !order.contains(label) {
			order.push(*label);
		}
	}
	let mut best: Option<(i64, usize)> = None;
	for label in order {
		let count = counts[&label];
		match best {
			Some((_, best_count)) if count <= best_count => {}
			_ => best = Some((label, count)),
		}
	}
	best.map(|(label, _)| label)
}

fn score_outcomes(outcomes: &[ItemOutcome], seed: u64) -> BTreeMap<String, BenchmarkScore> {
	let mut by_benchmark: BTreeMap<String, (giant_core::model::MetricType, Vec<ScoredItem>)> = BTreeMap::new();
	for outcome in outcomes {
		if let Some(truth) = outcome.truth {
			let entry = by_benchmark.entry(outcome.benchmark.clone()).or_insert((outcome.metric_type, Vec::new()));
			entry.1.push(ScoredItem { predicted: outcome.predicted, truth });
		}
	}
	by_benchmark
		.into_iter()
		.map(|(benchmark, (metric_type, items))| {
			let estimate = bootstrap(&items, metric_type, seed, DEFAULT_BOOTSTRAP_ITERATIONS);
			let point_estimate = score(&items, metric_type);
			(
				benchmark,
				BenchmarkScore {
					point_estimate,
					bootstrap: estimate,
					item_count: items.len(),
				},
			)
		})
		.collect()
}

#[derive(serde::Serialize)]
struct PersistedSummary<'a> {
	run_id: &'a str,
	cancelled: bool,
	scores: &'a BTreeMap<String, BenchmarkScore>,
	items: Vec<PersistedItem<'a>>,
}

#[derive(serde::Serialize)]
struct PersistedItem<'a> {
	item_id: &'a str,
	benchmark: &'a str,
	truth: Option<i64>,
	predicted: Option<i64>,
	correct: Option<bool>,
}

/// Writes `results/<benchmark>_<model>_results.json`-shaped output: one
/// summary file per run covering every benchmark the run touched (items are
/// already partitioned by `benchmark` in `scores`/`outcomes`, so a single
/// file, keyed internally by benchmark, stands in for the
/// one-file-per-benchmark naming scheme when a run spans more than one).
fn write_results_file(results_dir: &Path, summary: &EvalSummary) -> Result<()> {
	let persisted = PersistedSummary {
		run_id: &summary.run_id,
		cancelled: summary.cancelled,
		scores: &summary.scores,
		items: summary
			.outcomes
			.iter()
			.map(|outcome| PersistedItem {
				item_id: &outcome.item_id,
				benchmark: &outcome.benchmark,
				truth: outcome.truth,
				predicted: outcome.predicted,
				correct: outcome.correct,
			})
			.collect(),
	};
	let path = results_dir.join(format!("{}_results.json", summary.run_id));
	std::fs::write(&path, serde_json::to_vec_pretty(&persisted)?).with_context(|| format!("writing {}", path.display()))?;
	Ok(())
}
