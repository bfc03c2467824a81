//! Dollar cost accounting for one provider call (§4.5.5): text tokens
//! priced per-1000 off the model's [`PriceTable`], plus an image term that
//! differs by family — a flat per-image add-on for Family A, a
//! per-megapixel charge for Family B computed from the actual pixels
//! submitted.
//!
//! A response missing either token count is rejected outright rather than
//! silently priced at zero: a cost nobody can see is worse than a run that
//! fails loudly, since the former quietly blows through `budget_usd`.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use giant_core::config::{ImageTerm, PriceTable};
use giant_core::error::ProviderError;
use giant_core::model::{Message, MessageContent, TokenUsage};

/// Raw usage counters read off a provider response, before they're known to
/// be complete.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawUsage {
	pub prompt_tokens: Option<u32>,
	pub completion_tokens: Option<u32>,
}

/// Validates that both token counts are present and computes the billed
/// [`TokenUsage`] for one call, including the image term.
///
/// # Errors
/// Returns [`ProviderError::CostMissing`] if either token count is absent,
/// or [`ProviderError::InvalidImagePayload`] if an image in `request` can't
/// be decoded for pixel counting (Family B only).
pub fn compute_usage(
	provider: &str,
	model: &str,
	raw: RawUsage,
	price_table: &PriceTable,
	request_messages: &[Message],
) -> Result<TokenUsage, ProviderError> {
	let (Some(prompt_tokens), Some(completion_tokens)) = (raw.prompt_tokens, raw.completion_tokens) else {
		return Err(ProviderError::CostMissing { provider: provider.to_string(), model: model.to_string() });
	};
	let image_cost_usd = match price_table.image_term {
		ImageTerm::FixedPerImage(rate) => rate * count_images(request_messages) as f64,
		ImageTerm::PerMegapixel(rate) => {
			let megapixels = count_image_pixels(request_messages)? as f64 / 1_000_000.0;
			rate * megapixels
		}
	};
	Ok(TokenUsage { input_tokens: prompt_tokens, output_tokens: completion_tokens, image_cost_usd })
}

fn count_images(messages: &[Message]) -> u32 {
	messages
		.iter()
		.flat_map(|message| &message.content)
		.filter(|content| matches!(content, MessageContent::Image { .. }))
		.count() as u32
}

/// Decodes every image payload in `messages` and sums its pixel count.
/// Rejects a nil (never reached, `data` is a plain `String`), empty-string,
/// or empty-bytes payload, since any of those would silently undercount the
/// bill to zero.
fn count_image_pixels(messages: &[Message]) -> Result<u64, ProviderError> {
	let mut total = 0u64;
	for content in messages.iter().flat_map(|message| &message.content) {
		let MessageContent::Image { data, .. } = content else { continue };
		if data.is_empty() {
			return Err(ProviderError::InvalidImagePayload("base64 payload is empty".into()));
		}
		let bytes = BASE64
			.decode(data)
			.map_err(|err| ProviderError::InvalidImagePayload(format!("invalid base64: {err}")))?;
		if bytes.is_empty() {
			return Err(ProviderError::InvalidImagePayload("decoded image is 0 bytes".into()));
		}
		let dimensions = image::load_from_memory(&bytes)
			.map_err(|err| ProviderError::InvalidImagePayload(format!("could not decode image: {err}")))?;
		total += u64::from(dimensions.width()) * u64::from(dimensions.height());
	}
	Ok(total)
}

#[cfg(test)]
mod tests {
	use super::*;
	use giant_core::model::Role;
	use image::{ImageBuffer, Rgb};

	fn price_table(image_term: ImageTerm) -> PriceTable {
		PriceTable { input_price_per_1k: 1.0, output_price_per_1k: 2.0, image_term }
	}

	fn jpeg_message(width: u32, height: u32) -> Message {
		let image: ImageBuffer<Rgb<u8>, _> = ImageBuffer::from_pixel(width, height, Rgb([10, 20, 30]));
		let mut bytes = Vec::new();
		image
			.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Jpeg)
			.unwrap();
		Message {
			role: Role::User,
			content: vec![MessageContent::Image { media_type: "image/jpeg".into(), data: BASE64.encode(bytes) }],
		}
	}

	#[test]
	fn missing_token_counts_is_cost_missing() {
		let err = compute_usage(
			"acme",
			"vision-1",
			RawUsage { prompt_tokens: Some(10), completion_tokens: None },
			&price_table(ImageTerm::FixedPerImage(0.01)),
			&[],
		)
		.unwrap_err();
		assert!(matches!(err, ProviderError::CostMissing { .. }));
	}

	#[test]
	fn fixed_per_image_counts_images_not_pixels() {
		let messages = vec![jpeg_message(10, 10), jpeg_message(4000, 4000)];
		let usage = compute_usage(
			"acme",
			"vision-1",
			RawUsage { prompt_tokens: Some(100), completion_tokens: Some(50) },
			&price_table(ImageTerm::FixedPerImage(0.02)),
			&messages,
		)
		.unwrap();
		assert!((usage.image_cost_usd - 0.04).abs() < 1e-9);
	}

	#[test]
	fn per_megapixel_scales_with_decoded_pixel_count() {
		let messages = vec![jpeg_message(1000, 1000)];
		let usage = compute_usage(
			"acme",
			"vision-1",
			RawUsage { prompt_tokens: Some(100), completion_tokens: Some(50) },
			&price_table(ImageTerm::PerMegapixel(0.5)),
			&messages,
		)
		.unwrap();
		assert!((usage.image_cost_usd - 0.5).abs() < 1e-6);
	}

	#[test]
	fn empty_base64_payload_is_rejected() {
		let messages = vec![Message {
			role: Role::User,
			content: vec![MessageContent::Image { media_type: "image/jpeg".into(), data: String::new() }],
		}];
		let err = compute_usage(
			"acme",
			"vision-1",
			RawUsage { prompt_tokens: Some(1), completion_tokens: Some(1) },
			&price_table(ImageTerm::PerMegapixel(1.0)),
			&messages,
		)
		.unwrap_err();
		assert!(matches!(err, ProviderError::InvalidImagePayload(_)));
	}

	#[test]
	fn text_only_request_has_no_image_cost_under_fixed_per_image() {
		let messages = vec![Message::text(Role::User, "no pictures here")];
		let usage = compute_usage(
			"acme",
			"vision-1",
			RawUsage { prompt_tokens: Some(10), completion_tokens: Some(5) },
			&price_table(ImageTerm::FixedPerImage(0.03)),
			&messages,
		)
		.unwrap();
		assert_eq!(usage.image_cost_usd, 0.0);
	}
}
