//! The data model shared by every crate downstream: slide metadata, wire
//! messages, agent actions, and the records an evaluation run produces.

use crate::geometry::Region;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use time::OffsetDateTime;

/// One resolution level of a slide pyramid, as reported by the reader.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelInfo {
	pub width: u32,
	pub height: u32,
	/// Downsample factor relative to level 0. Always `>= 1.0`; level 0 is
	/// `1.0` by convention.
	pub downsample: f64,
}

/// Static facts about a slide, read once when it is opened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideMetadata {
	pub path: PathBuf,
	pub levels: Vec<LevelInfo>,
	/// Microns-per-pixel at level 0, when the format records it.
	pub mpp_x: Option<f64>,
	pub mpp_y: Option<f64>,
}

impl SlideMetadata {
	#[must_use]
	pub fn level0(&self) -> LevelInfo {
		self.levels[0]
	}

	#[must_use]
	pub fn width(&self) -> u32 {
		self.level0().width
	}

	#[must_use]
	pub fn height(&self) -> u32 {
		self.level0().height
	}
}

/// A low-resolution full-slide overview, generated once per run to seed the
/// first turn's context.
#[derive(Debug, Clone)]
pub struct Thumbnail {
	pub jpeg_bytes: Vec<u8>,
	pub width: u32,
	pub height: u32,
}

/// A single crop produced by the Crop Engine: the region it was read from,
/// the level it was read at, and the encoded result the provider sees.
#[derive(Debug, Clone)]
pub struct CroppedImage {
	pub jpeg_bytes: Vec<u8>,
	pub width: u32,
	pub height: u32,
	pub region: Region,
	pub level: usize,
	/// The long-side scale applied after the level-k read, `<= 1.0`
	/// (downscale or identity; the Crop Engine never upsamples, §4.3 step 5).
	pub scale_factor: f64,
	/// Whether the Axis-Guide Overlay (grid lines + coordinate labels) was
	/// drawn onto this crop before encoding.
	pub overlay_applied: bool,
}

/// One piece of a [`Message`]'s content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageContent {
	Text { text: String },
	Image {
		/// MIME type, e.g. `image/jpeg`.
		media_type: String,
		/// Base64-encoded bytes.
		data: String,
	},
}

/// Who sent a [`Message`] in the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
	System,
	User,
	Assistant,
}

/// One message in the conversation the Context Manager assembles. The
/// ordering invariant (`system, user, (assistant, user)*, assistant?`) is
/// enforced by the Context Manager, not by this type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
	pub role: Role,
	pub content: Vec<MessageContent>,
}

impl Message {
	#[must_use]
	pub fn text(role: Role, text: impl Into<String>) -> Self {
		Self {
			role,
			content: vec![MessageContent::Text { text: text.into() }],
		}
	}
}

/// What the model decided to do this turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
	/// Request a closer look at `region`, read at `level`.
	Crop { region: Region, level: usize },
	/// Terminate the run with a final answer.
	Answer { text: String },
	/// Invoke the conch tool: a free-text scratchpad action with no crop or
	/// answer side effect, disabled unless [`crate::config::AgentConfig::enable_conch`]
	/// is set.
	Conch { note: String },
}

/// Token and dollar accounting for a single provider call.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
	pub input_tokens: u32,
	pub output_tokens: u32,
	pub image_cost_usd: f64,
}

impl TokenUsage {
	#[must_use]
	pub fn text_cost_usd(&self, input_price_per_1k: f64, output_price_per_1k: f64) -> f64 {
		f64::from(self.input_tokens) / 1000.0 * input_price_per_1k
			+ f64::from(self.output_tokens) / 1000.0 * output_price_per_1k
	}

	#[must_use]
	pub fn total_cost_usd(&self, input_price_per_1k: f64, output_price_per_1k: f64) -> f64 {
		self.text_cost_usd(input_price_per_1k, output_price_per_1k) + self.image_cost_usd
	}
}

/// A provider's response to one turn: the extracted action plus the raw
/// text it was parsed from (kept for debugging and trajectory replay) and
/// the usage it was billed for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResponse {
	pub action: Action,
	pub raw_text: String,
	pub usage: TokenUsage,
}

/// One full round trip: the request sent and the response received, with
/// wall-clock duration for diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
	pub index: u32,
	pub request: Message,
	pub response: StepResponse,
	pub duration_ms: u64,
}

/// The complete record of an agent run: every turn it took, in order, plus
/// the final answer if one was reached.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Trajectory {
	pub turns: Vec<Turn>,
	pub final_answer: Option<String>,
}

impl Trajectory {
	#[must_use]
	pub fn total_usage(&self) -> TokenUsage {
		let mut total = TokenUsage::default();
		for turn in &self.turns {
			total.input_tokens += turn.response.usage.input_tokens;
			total.output_tokens += turn.response.usage.output_tokens;
			total.image_cost_usd += turn.response.usage.image_cost_usd;
		}
		total
	}
}

/// Generates a fresh run identifier.
#[must_use]
pub fn new_run_id() -> String {
	uuid::Uuid::new_v4().to_string()
}

/// The outcome of one agent run against one benchmark item (or an
/// unconstrained `run` invocation, in which case `item_id`/`correct` are
/// absent).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
	pub run_id: String,
	pub item_id: Option<String>,
	pub trajectory: Trajectory,
	pub answer: Option<String>,
	pub correct: Option<bool>,
	#[serde(with = "time::serde::rfc3339")]
	pub started_at: OffsetDateTime,
	#[serde(with = "time::serde::rfc3339")]
	pub finished_at: OffsetDateTime,
	pub total_cost_usd: f64,
	/// Whether the run reached a genuine `answer` action (directly or via
	/// forcing), as opposed to exhausting its retries or its step budget.
	pub success: bool,
	/// Populated when `success` is `false`: a short, human-readable reason
	/// (`"exceeded step limit after retries"`, a provider error's `Display`,
	/// etc.), never both this and a meaningful `answer`.
	pub error: Option<String>,
}

/// Which accuracy variant a benchmark is scored with (§6.1's `metric_type`
/// column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
	Accuracy,
	BalancedAccuracy,
}

/// One row loaded from a benchmark CSV (§6.1): the question, its slide, and
/// the ground-truth answer used to score a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkItem {
	pub id: String,
	pub benchmark: String,
	pub slide_path: PathBuf,
	pub question: String,
	/// Present for multiple-choice items; absent for free-response ones.
	pub choices: Option<Vec<String>>,
	/// The raw `answer` cell, not yet canonicalized to an integer label —
	/// canonicalization happens through the same rules the Answer Extractor
	/// applies to model output (§4.9), so ground truth and predictions are
	/// always compared on equal footing.
	pub answer: String,
	pub metric_type: MetricType,
	/// Used by slide path resolution's per-benchmark glob fallback (§6.2)
	/// for datasets that nest files by id rather than by `image_path`.
	pub file_id: Option<String>,
}
