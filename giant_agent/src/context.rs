//! The Context Manager (§4.6): assembles the message sequence one provider
//! call sees from an append-only list of completed turns, pruning older
//! crop images to text placeholders without ever mutating a past
//! [`Message`] (§9, "Context pruning without mutation").

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use giant_core::model::{Action, Message, MessageContent, Role, StepResponse};

/// One completed turn as the Context Manager needs it: enough to rebuild
/// the assistant message it produced and the crop (if any) the model saw in
/// response, without carrying the full [`giant_core::model::Turn`] record
/// the Agent Runner keeps for the trajectory.
#[derive(Debug, Clone)]
struct RecordedTurn {
	step_index: u32,
	/// The crop image shown to the model as a *result* of this turn's
	/// action, if any (absent for `Answer`/`Conch`, or for a turn past
	/// `max_steps` that never gets a followup message).
	image_jpeg: Option<Vec<u8>>,
	raw_text: String,
	action: Action,
}

/// Maintains the ordered [`Turn`] history, the question, and the limits
/// that shape `get_messages`'s output: `max_steps`, `max_history_images`,
/// and `enforce_fixed_iterations`.
pub struct ContextManager {
	system_prompt: String,
	/// Turn 0: the question plus the axis-guided thumbnail. Never pruned.
	turn0_message: Message,
	turns: Vec<RecordedTurn>,
	max_steps: u32,
	/// `None` keeps every crop image in history; `Some(k)` keeps only the
	/// `k` most recent, replacing older ones with a text placeholder.
	max_history_images: Option<u32>,
	enforce_fixed_iterations: bool,
}

impl ContextManager {
	#[must_use]
	pub fn new(system_prompt: impl Into<String>, turn0_message: Message, max_steps: u32, max_history_images: Option<u32>, enforce_fixed_iterations: bool) -> Self {
		Self {
			system_prompt: system_prompt.into(),
			turn0_message,
			turns: Vec::new(),
			max_steps,
			max_history_images,
			enforce_fixed_iterations,
		}
	}

	/// Appends a completed turn. `image_jpeg` is the crop the model will be
	/// shown in its next user message, or `None` for actions that produce
	/// no image (`Answer`, `Conch`, or an invalid crop that never executed).
	pub fn add_turn(&mut self, step_index: u32, image_jpeg: Option<Vec<u8>>, response: &StepResponse) {
		self.turns.push(RecordedTurn {
			step_index,
			image_jpeg,
			raw_text: response.raw_text.clone(),
			action: response.action.clone(),
		});
	}

	#[must_use]
	pub fn completed_turns(&self) -> usize {
		self.turns.len()
	}

	/// Builds the message sequence for the upcoming call at `next_step`:
	/// `system, user, (assistant, user)*, assistant?`.
	///
	/// # Errors
	/// Returns an error if `next_step > max_steps` (§4.7: the builder never
	/// constructs prompts past the step cap).
	pub fn get_messages(&self, next_step: u32) -> anyhow::Result<Vec<Message>> {
		anyhow::ensure!(next_step <= self.max_steps, "cannot build a prompt for step {next_step}, max_steps is {}", self.max_steps);

		let mut messages = Vec::with_capacity(2 + self.turns.len() * 2);
		messages.push(Message::text(Role::System, self.system_prompt_text()));
		messages.push(self.turn0_message.clone());

		// Turns are appended strictly in increasing step_index (§5's
		// ordering guarantee), so the turns eligible for a followup image
		// are exactly the leading run with step_index < max_steps.
		let followup_count = self.turns.iter().take_while(|turn| turn.step_index < self.max_steps).count();
		let keep_images_from = match self.max_history_images {
			None => 0,
			Some(k) => followup_count.saturating_sub(k as usize),
		};

		let mut followup_position = 0usize;
		for turn in &self.turns {
			messages.push(Message::text(Role::Assistant, turn.raw_text.clone()));
			if turn.step_index >= self.max_steps {
				break;
			}
			let keep_image = followup_position >= keep_images_from;
			messages.push(self.followup_user_message(turn, keep_image));
			followup_position += 1;
		}

		Ok(messages)
	}

	fn system_prompt_text(&self) -> String {
		if self.enforce_fixed_iterations {
			format!("{}\n\n{}", crate::prompt::FIXED_ITERATIONS_DIRECTIVE, self.system_prompt)
		} else {
			self.system_prompt.clone()
		}
	}

	fn followup_user_message(&self, turn: &RecordedTurn, keep_image: bool) -> Message {
		let mut content = vec![MessageContent::Text { text: describe_previous_action(&turn.action) }];
		match (&turn.image_jpeg, keep_image) {
			(Some(bytes), true) => content.push(MessageContent::Image { media_type: "image/jpeg".into(), data: BASE64.encode(bytes) }),
			(Some(_), false) => content.push(MessageContent::Text { text: format!("[image from step {} omitted]", turn.step_index) }),
			(None, _) => {}
		}
		Message { role: Role::User, content }
	}
}

fn describe_previous_action(action: &Action) -> String {
	match action {
		Action::Crop { region, level } => {
			format!("Here is the crop you requested at ({}, {}, {}x{}) read from level {level}.", region.x, region.y, region.width, region.height)
		}
		Action::Answer { text } => format!("You answered: {text}"),
		Action::Conch { note } => format!("Scratchpad note recorded: {note}"),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use giant_core::geometry::Region;
	use giant_core::model::TokenUsage;

	fn turn0() -> Message {
		Message {
			role: Role::User,
			content: vec![
				MessageContent::Text { text: "Grade this slide.".into() },
				MessageContent::Image { media_type: "image/jpeg".into(), data: "dGh1bWI=".into() },
			],
		}
	}

	fn step_response(action: Action) -> StepResponse {
		StepResponse { action, raw_text: "{}".into(), usage: TokenUsage::default() }
	}

	fn manager(max_steps: u32, max_history_images: Option<u32>) -> ContextManager {
		ContextManager::new("You are a pathologist.", turn0(), max_steps, max_history_images, false)
	}

	#[test]
	fn fresh_context_yields_exactly_system_and_turn0() {
		let context = manager(5, None);
		let messages = context.get_messages(1).unwrap();
		assert_eq!(messages.len(), 2);
		assert_eq!(messages[0].role, Role::System);
		assert_eq!(messages[1].role, Role::User);
	}

	#[test]
	fn sequence_alternates_assistant_and_user_after_the_system_and_turn0_messages() {
		let mut context = manager(5, None);
		context.add_turn(1, Some(vec![1, 2, 3]), &step_response(Action::Crop { region: Region::new(0, 0, 10, 10), level: 0 }));
		context.add_turn(2, Some(vec![4, 5, 6]), &step_response(Action::Crop { region: Region::new(0, 0, 10, 10), level: 0 }));
		let messages = context.get_messages(3).unwrap();
		// system, turn0, assistant, user, assistant, user = 6
		assert_eq!(messages.len(), 6);
		let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
		assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant, Role::User, Role::Assistant, Role::User]);
	}

	#[test]
	fn a_turn_at_the_step_cap_gets_no_followup_user_message() {
		let mut context = manager(1, None);
		context.add_turn(1, Some(vec![1]), &step_response(Action::Answer { text: "done".into() }));
		// max_steps == 1, so this turn's step_index is NOT < max_steps: no followup.
		let messages = context.get_messages(1).unwrap();
		assert_eq!(messages.len(), 3); // system, turn0, assistant
	}

	#[test]
	fn rejects_a_step_past_the_cap() {
		let context = manager(2, None);
		assert!(context.get_messages(3).is_err());
	}

	#[test]
	fn pruning_keeps_only_the_most_recent_k_images() {
		let mut context = manager(10, Some(1));
		context.add_turn(1, Some(vec![1]), &step_response(Action::Crop { region: Region::new(0, 0, 10, 10), level: 0 }));
		context.add_turn(2, Some(vec![2]), &step_response(Action::Crop { region: Region::new(0, 0, 10, 10), level: 0 }));
		let messages = context.get_messages(3).unwrap();
		// messages: system, turn0, assistant(1), user(1 - pruned), assistant(2), user(2 - image kept)
		let first_user_followup = &messages[3];
		let second_user_followup = &messages[5];
		let has_image = |message: &Message| message.content.iter().any(|c| matches!(c, MessageContent::Image { .. }));
		assert!(!has_image(first_user_followup));
		assert!(has_image(second_user_followup));
	}

	#[test]
	fn turn0_image_is_never_pruned_regardless_of_max_history_images() {
		let mut context = manager(10, Some(0));
		context.add_turn(1, Some(vec![1]), &step_response(Action::Crop { region: Region::new(0, 0, 10, 10), level: 0 }));
		let messages = context.get_messages(2).unwrap();
		let has_image = |message: &Message| message.content.iter().any(|c| matches!(c, MessageContent::Image { .. }));
		assert!(has_image(&messages[1]));
	}
}
