//! The Agent Runner (§4.8): the bounded state machine that drives one slide
//! through `Init -> AwaitingDecision -> (ExecutingCrop | Recovering | Forcing) -> Terminated`.
//!
//! The whole run is one `loop` over `AwaitingDecision`; `ExecutingCrop` and
//! `Recovering` are inlined as a helper the loop calls on a `Crop` action,
//! and `Forcing` is a second helper entered either on step-cap overflow or
//! on a budget trip. Every exit path flows through the same tail so the
//! trajectory is built and the slide handle released exactly once (it drops
//! with `run`'s parameter at function return).

use std::sync::Arc;
use std::time::Instant;

use giant_core::error::{CropError, ProviderError};
use giant_core::geometry::{Region, Size};
use giant_core::model::{Action, Message, MessageContent, Role, RunResult, StepResponse, Trajectory, Turn};
use giant_core::config::AgentConfig;
use giant_image::{build_thumbnail, crop_region, CropRequest};
use giant_provider::Provider;
use giant_slide::{SlideHandle, SlideReader};
use time::OffsetDateTime;

use crate::context::ContextManager;
use crate::prompt::{default_system_prompt, RejectedCrop, FORCE_ANSWER_DIRECTIVE};

/// Drives one agent run end to end against one slide.
pub struct AgentRunner {
	config: AgentConfig,
	provider: Arc<dyn Provider>,
}

/// Why `Forcing` was entered, so a failed forced answer reports the right
/// one of the two distinct error strings §7/§8 name.
#[derive(Clone, Copy)]
enum ForceReason {
	Budget,
	StepCap,
}

/// Terminal result of the state machine, before it's folded into a
/// [`RunResult`].
struct Outcome {
	answer: Option<String>,
	success: bool,
	error: Option<String>,
}

impl Outcome {
	fn success(answer: String) -> Self {
		Self { answer: Some(answer), success: true, error: None }
	}

	fn failure(error: impl Into<String>) -> Self {
		Self { answer: None, success: false, error: Some(error.into()) }
	}
}

/// Outcome of one `Crop` action dispatch: either the run advances to the
/// next step, or it terminated (recovery exhausted `max_retries`, or the
/// model answered mid-recovery).
enum CropOutcome {
	NextStep(u32),
	Terminated(Outcome),
}

impl AgentRunner {
	#[must_use]
	pub fn new(config: AgentConfig, provider: Arc<dyn Provider>) -> Self {
		Self { config, provider }
	}

	/// Runs the loop to completion against `slide`, which this call owns for
	/// its duration and releases on every exit path.
	///
	/// # Errors
	/// Returns an error only for failures outside the state machine's own
	/// vocabulary — building the Turn-0 thumbnail, or a context-manager
	/// invariant violation. Provider errors, invalid crops, and an exhausted
	/// budget are all reported as `Ok(RunResult { success: false, .. })`,
	/// never as an `Err` (§7: "per-run failures are surfaced as a
	/// `RunResult`").
	pub async fn run(&self, slide: SlideHandle, question: &str) -> anyhow::Result<RunResult> {
		let started_at = OffsetDateTime::now_utc();
		let run_id = giant_core::model::new_run_id();
		let max_steps = self.config.max_steps;
		let price_table = *self.provider.price_table();
		let reader = slide.reader();

		let thumbnail = build_thumbnail(reader, self.config.thumbnail_size, self.config.strict_font_check, 85)
			.await
			.map_err(|err| err.context(format!("building thumbnail for {}", slide.path().display())))?;

		let turn0_message = Message {
			role: Role::User,
			content: vec![
				MessageContent::Text { text: question.to_string() },
				MessageContent::Image { media_type: "image/jpeg".into(), data: base64_encode(&thumbnail.jpeg_bytes) },
			],
		};
		let system_prompt = self
			.config
			.system_prompt_override
			.clone()
			.unwrap_or_else(|| default_system_prompt(max_steps, self.config.enforce_fixed_iterations));
		let mut context = ContextManager::new(system_prompt, turn0_message, max_steps, None, self.config.enforce_fixed_iterations);
		let bounds = Size { width: reader.metadata().width(), height: reader.metadata().height() };

		let mut consecutive_errors = 0u32;
		let mut total_cost_usd = 0.0f64;
		let mut turns: Vec<Turn> = Vec::new();
		let mut step = 1u32;

		let outcome = loop {
			// AwaitingDecision
			let messages = context.get_messages(step)?;
			let call_started = Instant::now();
			let response = match self.provider.generate_response(&messages).await {
				Ok(response) => response,
				Err(err) => {
					if !is_recoverable(&err) {
						break Outcome::failure(err.to_string());
					}
					consecutive_errors += 1;
					if consecutive_errors >= self.config.max_retries {
						break Outcome::failure(err.to_string());
					}
					continue;
				}
			};
			consecutive_errors = 0;
			total_cost_usd += response.usage.total_cost_usd(price_table.input_price_per_1k, price_table.output_price_per_1k);

			if self.config.budget_enabled() && total_cost_usd >= self.config.budget_usd.unwrap_or_default() {
				break self.force_answer(&context, step, max_steps, &mut turns, ForceReason::Budget).await;
			}

			match response.action.clone() {
				Action::Crop { region, .. } => {
					let crop_outcome = self
						.dispatch_crop(reader, region, bounds, step, &mut context, &messages, &response, call_started, &mut turns, &mut consecutive_errors)
						.await;
					match crop_outcome {
						CropOutcome::NextStep(next_step) => {
							step = next_step;
							if step > max_steps {
								break self.force_answer(&context, max_steps, max_steps, &mut turns, ForceReason::StepCap).await;
							}
						}
						CropOutcome::Terminated(outcome) => break outcome,
					}
				}
				Action::Answer { text } => {
					if self.config.enforce_fixed_iterations && step < max_steps {
						// Treated as an invalid-action error (§4.8): retry the
						// same step without committing a turn.
						consecutive_errors += 1;
						if consecutive_errors >= self.config.max_retries {
							break Outcome::failure("model answered before the fixed-iterations step cap was reached");
						}
						continue;
					}
					turns.push(Turn {
						index: step,
						request: last_message(&messages),
						response,
						duration_ms: elapsed_ms(call_started),
					});
					break Outcome::success(text);
				}
				Action::Conch { note } => {
					if !self.config.enable_conch {
						log::warn!("model invoked the disabled conch tool: {note}");
						consecutive_errors += 1;
						if consecutive_errors >= self.config.max_retries {
							break Outcome::failure("conch tool invoked while disabled, exceeding max_retries");
						}
						continue;
					}
					// A scratchpad note is not a step toward the crop/answer
					// budget: record it and keep deciding at the same step.
					context.add_turn(step, None, &response);
				}
			}
		};

		let finished_at = OffsetDateTime::now_utc();
		let trajectory = Trajectory { turns, final_answer: outcome.answer.clone() };
		Ok(RunResult {
			run_id,
			item_id: None,
			trajectory,
			answer: outcome.answer,
			correct: None,
			started_at,
			finished_at,
			total_cost_usd,
			success: outcome.success,
			error: outcome.error,
		})
	}

	/// `ExecutingCrop`, falling into the `Recovering` loop on any validation
	/// or crop-engine failure.
	#[allow(clippy::too_many_arguments)]
	async fn dispatch_crop(
		&self,
		reader: &dyn SlideReader,
		region: Region,
		bounds: Size,
		step: u32,
		context: &mut ContextManager,
		decision_messages: &[Message],
		decision_response: &StepResponse,
		call_started: Instant,
		turns: &mut Vec<Turn>,
		consecutive_errors: &mut u32,
	) -> CropOutcome {
		match self.try_crop(reader, region, bounds).await {
			Ok(cropped) => {
				context.add_turn(step, Some(cropped.jpeg_bytes), decision_response);
				turns.push(Turn {
					index: step,
					request: last_message(decision_messages),
					response: decision_response.clone(),
					duration_ms: elapsed_ms(call_started),
				});
				return CropOutcome::NextStep(step + 1);
			}
			Err(feedback) => {
				*consecutive_errors += 1;
				if *consecutive_errors >= self.config.max_retries {
					return CropOutcome::Terminated(Outcome::failure("exceeded max_retries during crop recovery"));
				}
				self.recover(reader, bounds, step, context, feedback, turns, consecutive_errors).await
			}
		}
	}

	/// Runs the region through bounds validation and the Crop Engine,
	/// returning a ready-to-show feedback string on either kind of failure.
	async fn try_crop(&self, reader: &dyn SlideReader, region: Region, bounds: Size) -> Result<giant_core::model::CroppedImage, String> {
		let out_of_bounds = region.validate(bounds).err();
		if let Some(out_of_bounds) = out_of_bounds {
			let rejected = RejectedCrop { requested: region, out_of_bounds };
			return Err(rejected.feedback_block());
		}
		let request = CropRequest::new(region, self.provider.target_size());
		crop_region(reader, request).await.map_err(|err| crop_error_feedback(region, &err))
	}

	/// `Recovering`: an explicit bounded loop (not recursion, per §9's
	/// design note) re-asking the model with an appended feedback block
	/// until it either answers, produces a valid crop, or exhausts
	/// `max_retries`.
	#[allow(clippy::too_many_arguments)]
	async fn recover(
		&self,
		reader: &dyn SlideReader,
		bounds: Size,
		step: u32,
		context: &mut ContextManager,
		mut feedback: String,
		turns: &mut Vec<Turn>,
		consecutive_errors: &mut u32,
	) -> CropOutcome {
		loop {
			let mut messages = match context.get_messages(step) {
				Ok(messages) => messages,
				Err(err) => return CropOutcome::Terminated(Outcome::failure(err.to_string())),
			};
			append_feedback(&mut messages, std::mem::take(&mut feedback));
			let call_started = Instant::now();

			let response = match self.provider.generate_response(&messages).await {
				Ok(response) => response,
				Err(err) => {
					if !is_recoverable(&err) {
						return CropOutcome::Terminated(Outcome::failure(err.to_string()));
					}
					*consecutive_errors += 1;
					if *consecutive_errors >= self.config.max_retries {
						return CropOutcome::Terminated(Outcome::failure(err.to_string()));
					}
					feedback = err.to_string();
					continue;
				}
			};

			match response.action.clone() {
				Action::Answer { text } => {
					*consecutive_errors = 0;
					turns.push(Turn { index: step, request: last_message(&messages), response, duration_ms: elapsed_ms(call_started) });
					return CropOutcome::Terminated(Outcome::success(text));
				}
				Action::Crop { region: retried_region, .. } => match self.try_crop(reader, retried_region, bounds).await {
					Ok(cropped) => {
						*consecutive_errors = 0;
						context.add_turn(step, Some(cropped.jpeg_bytes), &response);
						turns.push(Turn { index: step, request: last_message(&messages), response, duration_ms: elapsed_ms(call_started) });
						return CropOutcome::NextStep(step + 1);
					}
					Err(retry_feedback) => {
						*consecutive_errors += 1;
						if *consecutive_errors >= self.config.max_retries {
							return CropOutcome::Terminated(Outcome::failure("exceeded max_retries during crop recovery"));
						}
						feedback = retry_feedback;
					}
				},
				Action::Conch { .. } => {
					*consecutive_errors += 1;
					if *consecutive_errors >= self.config.max_retries {
						return CropOutcome::Terminated(Outcome::failure("exceeded max_retries during crop recovery"));
					}
					feedback = "Please respond with crop() or answer(); the conch tool cannot be used here.".to_string();
				}
			}
		}
	}

	/// `Forcing`: appends the force-answer directive to the last valid
	/// prompt and gives the model `force_answer_retries` attempts to comply.
	async fn force_answer(&self, context: &ContextManager, message_step: u32, max_steps: u32, turns: &mut Vec<Turn>, reason: ForceReason) -> Outcome {
		let mut messages = match context.get_messages(message_step) {
			Ok(messages) => messages,
			Err(_) => return Outcome::failure(failure_message(reason)),
		};
		append_feedback(&mut messages, FORCE_ANSWER_DIRECTIVE.to_string());

		for _attempt in 0..self.config.force_answer_retries {
			if let Ok(response) = self.provider.generate_response(&messages).await {
				if let Action::Answer { text } = response.action.clone() {
					turns.push(Turn { index: max_steps, request: last_message(&messages), response, duration_ms: 0 });
					return Outcome::success(text);
				}
			}
		}
		Outcome::failure(failure_message(reason))
	}
}

fn failure_message(reason: ForceReason) -> &'static str {
	match reason {
		ForceReason::Budget => "budget exceeded",
		ForceReason::StepCap => "exceeded step limit after retries",
	}
}

/// Appends `feedback` to the last message's content rather than appending a
/// new message, preserving the `system, user, (assistant, user)*, assistant?`
/// alternation invariant (§4.6) even for transient, uncommitted retries.
fn append_feedback(messages: &mut [Message], feedback: String) {
	if let Some(last) = messages.last_mut() {
		last.content.push(MessageContent::Text { text: feedback });
	}
}

fn last_message(messages: &[Message]) -> Message {
	messages.last().cloned().unwrap_or_else(|| Message::text(Role::User, String::new()))
}

fn elapsed_ms(started: Instant) -> u64 {
	u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn base64_encode(bytes: &[u8]) -> String {
	use base64::engine::general_purpose::STANDARD;
	use base64::Engine;
	STANDARD.encode(bytes)
}

/// §4.8's consecutive-error bucket: failures the runner retries up to
/// `max_retries` times rather than aborting the run outright.
fn is_recoverable(err: &ProviderError) -> bool {
	matches!(
		err,
		ProviderError::Transport(_)
			| ProviderError::RateLimited { .. }
			| ProviderError::Parse { .. }
			| ProviderError::CircuitOpen { .. }
			| ProviderError::CostMissing { .. }
			| ProviderError::UnknownActionType { .. }
	)
}

fn crop_error_feedback(region: Region, err: &CropError) -> String {
	format!(
		"Your previous crop request (x={}, y={}, width={}, height={}) failed: {err}. Please request a different or smaller region.",
		region.x, region.y, region.width, region.height
	)
}
