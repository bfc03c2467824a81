//! The Prompt Builder (§4.7): the persona/contract system prompt and the
//! per-step user prompt the Agent Runner asks the [`crate::context::ContextManager`]
//! to stitch into a full message sequence.
//!
//! Nothing here talks to a provider or mutates state; both functions are
//! pure string builders so the exact wording the model sees is easy to
//! golden-test.

use giant_core::geometry::{OutOfBounds, Region};

/// Prepended to the system prompt whenever [`giant_core::config::AgentConfig::enforce_fixed_iterations`]
/// is set (§4.6 step 4): the model must crop on every step but the last.
pub const FIXED_ITERATIONS_DIRECTIVE: &str =
	"You are operating in fixed-iterations mode: you MUST call crop() on every step except the final one, where you MUST call answer().";

/// Appended to the final user message when the Agent Runner enters Forcing
/// (§4.8): the step budget is exhausted and only `answer()` is accepted.
pub const FORCE_ANSWER_DIRECTIVE: &str =
	"You are out of steps. You MUST call answer() now with your best final answer based on everything you have seen so far.";

/// Builds the default system prompt: persona, the level-0 coordinate
/// convention, the `crop`/`answer` tool contract, and the JSON output
/// schema the model must produce. `max_steps` lets the persona state the
/// crop budget precisely (`max_steps - 1` crops under fixed iterations).
#[must_use]
pub fn default_system_prompt(max_steps: u32, enforce_fixed_iterations: bool) -> String {
	let crop_budget = if enforce_fixed_iterations {
		format!("You have at most {} crop actions before you must answer on step {max_steps}.", max_steps.saturating_sub(1))
	} else {
		format!("You have up to {max_steps} steps total, after which you will be asked to answer immediately.")
	};
	format!(
		"You are an expert pathologist examining a gigapixel whole-slide image one region at a time.\n\
		 All coordinates you use — in your own `crop` calls and in any region the system describes back \
		 to you — are in level-0 pixels: absolute pixel coordinates at the slide's highest resolution.\n\
		 \n\
		 On every step you must choose exactly one action:\n\
		 - `crop(x, y, width, height)`: request a closer look at a level-0 region.\n\
		 - `answer(text)`: give your final answer to the question and end the run.\n\
		 \n\
		 {crop_budget}\n\
		 \n\
		 Respond with a single JSON object matching this shape:\n\
		 {{\"reasoning\": \"...\", \"action\": \"crop\"|\"answer\", \"region\": {{\"x\":.., \"y\":.., \"width\":.., \"height\":..}}, \"text\": \"...\"}}\n\
		 Include `region` only for `crop` and `text` only for `answer`."
	)
}

/// Builds the per-step user prompt: which step this is out of `max_steps`,
/// the question, and (when set) feedback about why the previous action was
/// rejected.
///
/// # Errors
/// Returns an error if `step > max_steps` (§4.7: construction is rejected
/// past the step cap, mirroring [`crate::context::ContextManager::get_messages`]).
pub fn step_user_prompt(step: u32, max_steps: u32, question: &str, rejected: Option<&RejectedCrop>) -> anyhow::Result<String> {
	anyhow::ensure!(step <= max_steps, "cannot build a user prompt for step {step}, max_steps is {max_steps}");

	let mut prompt = format!("Step {step} of {max_steps}.\n\nQuestion: {question}");
	if let Some(rejection) = rejected {
		prompt.push_str("\n\n");
		prompt.push_str(&rejection.feedback_block());
	}
	Ok(prompt)
}

/// The specifics of one crop the Agent Runner rejected before it ever
/// reached the Crop Engine, so the Prompt Builder can tell the model
/// exactly what it asked for and exactly why that was invalid (§4.7:
/// "the builder injects a feedback block with the requested (x,y,w,h), the
/// slide bounds, and a list of specific constraint violations").
#[derive(Debug, Clone)]
pub struct RejectedCrop {
	pub requested: Region,
	pub out_of_bounds: OutOfBounds,
}

impl RejectedCrop {
	pub(crate) fn feedback_block(&self) -> String {
		let region = self.requested;
		let bounds = self.out_of_bounds.bounds;
		let issues = self.out_of_bounds.issues.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ");
		format!(
			"Your previous crop request (x={}, y={}, width={}, height={}) was rejected.\n\
			 Slide bounds are {}x{} pixels.\n\
			 Problems: {issues}.\n\
			 Please request a region that fits entirely within the slide.",
			region.x, region.y, region.width, region.height, bounds.width, bounds.height
		)
	}
}
