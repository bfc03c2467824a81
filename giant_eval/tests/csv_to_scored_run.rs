//! Drives the full evaluation path from a benchmark CSV on disk through slide
//! path resolution and the orchestrator to a scored `EvalSummary`, exercising
//! the seam between `load_benchmark_csv`/`resolve_slide_path` and
//! `Orchestrator` that the colocated unit tests (which build `BenchmarkItem`s
//! by hand) don't cover.

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use giant_core::config::{AgentConfig, CircuitBreakerConfig, ImageTerm, OrchestratorConfig, PriceTable, ProviderConfig, ProviderFamily};
use giant_core::error::ProviderError;
use giant_core::model::{Action, Message, StepResponse, TokenUsage};
use giant_eval::{load_benchmark_csv, Orchestrator};
use giant_provider::Provider;
use giant_slide::{FnSlideOpener, MockSlideReader, SlideOpener, SlideReader};
use tempfile::TempDir;

struct AlwaysAnswers(&'static str);

#[async_trait]
impl Provider for AlwaysAnswers {
	async fn generate_response(&self, _messages: &[Message]) -> Result<StepResponse, ProviderError> {
		Ok(StepResponse {
			action: Action::Answer { text: self.0.into() },
			raw_text: self.0.into(),
			usage: TokenUsage::default(),
		})
	}

	fn target_size(&self) -> u32 {
		1000
	}

	fn price_table(&self) -> &PriceTable {
		const TABLE: PriceTable = PriceTable { input_price_per_1k: 0.0, output_price_per_1k: 0.0, image_term: ImageTerm::FixedPerImage(0.0) };
		&TABLE
	}
}

fn mock_opener() -> Arc<dyn SlideOpener> {
	Arc::new(FnSlideOpener::new(|_path: &std::path::Path| -> Result<Box<dyn SlideReader>> { Ok(Box::new(MockSlideReader::new(256, 256, 3))) }))
}

fn sample_agent_config() -> AgentConfig {
	AgentConfig {
		max_steps: 2,
		max_retries: 3,
		force_answer_retries: 2,
		thumbnail_size: 128,
		budget_usd: None,
		enforce_fixed_iterations: false,
		strict_font_check: false,
		enable_conch: false,
		system_prompt_override: None,
		request_timeout_secs: 30,
		provider: ProviderConfig {
			family: ProviderFamily::JsonSchema,
			endpoint: "https://api.example.com".into(),
			model: "vision-1".into(),
			api_key_env: "GIANT_TEST_E2E_KEY".into(),
			rpm: 6000,
			circuit_breaker: CircuitBreakerConfig::default(),
			price_table: PriceTable { input_price_per_1k: 0.0, output_price_per_1k: 0.0, image_term: ImageTerm::FixedPerImage(0.0) },
		},
	}
}

#[tokio::test]
async fn a_csv_loaded_benchmark_runs_end_to_end_and_scores_correctly() {
	let dir = TempDir::new().unwrap();
	let wsi_root = dir.path().join("wsi");
	std::fs::create_dir_all(wsi_root.join("organ_id")).unwrap();
	std::fs::write(wsi_root.join("organ_id").join("slide1.svs"), b"x").unwrap();

	let csv_path = dir.path().join("items.csv");
	std::fs::write(
		&csv_path,
		"benchmark_name,item_id,image_path,prompt,options,answer,metric_type,file_id,is_valid\n\
		 organ_id,item-1,slide1.svs,What organ is this?,\"['kidney','liver']\",2,accuracy,,true\n\
		 organ_id,item-2,slide1.svs,What organ is this?,\"['kidney','liver']\",1,accuracy,,false\n",
	)
	.unwrap();

	let items = load_benchmark_csv(&csv_path).unwrap();
	assert_eq!(items.len(), 1, "the is_valid=false row must be dropped before reaching the orchestrator");

	let results_dir = dir.path().join("results");
	let orchestrator = Orchestrator::new(
		sample_agent_config(),
		OrchestratorConfig { max_concurrency: 2, runs_per_item: 1, checkpoint_path: None },
		Arc::new(AlwaysAnswers("liver")),
		mock_opener(),
		wsi_root,
		results_dir.clone(),
		"run-e2e".into(),
		11,
	)
	.unwrap();

	let summary = orchestrator.run(items, Arc::new(AtomicBool::new(false))).await.unwrap();

	assert_eq!(summary.outcomes.len(), 1);
	assert_eq!(summary.outcomes[0].correct, Some(true), "'liver' should canonicalize to option index 2, matching the truth label");
	assert!(results_dir.join("run-e2e_results.json").is_file());
	assert!(results_dir.join("trajectories").join("item-1_run1.json").is_file());

	let resumed = Orchestrator::new(
		sample_agent_config(),
		OrchestratorConfig { max_concurrency: 2, runs_per_item: 1, checkpoint_path: None },
		Arc::new(AlwaysAnswers("liver")),
		mock_opener(),
		PathBuf::from(dir.path().join("wsi")),
		results_dir,
		"run-e2e".into(),
		11,
	)
	.unwrap();
	let resumed_summary = resumed.run(load_benchmark_csv(&csv_path).unwrap(), Arc::new(AtomicBool::new(false))).await.unwrap();
	assert!(resumed_summary.outcomes.is_empty(), "resuming a completed run must not re-score item-1");
}
