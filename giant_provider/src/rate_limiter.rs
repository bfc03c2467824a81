//! The local rate limiter half of the resilience stack: a sliding-window
//! request cap enforced client-side so the agent backs off before the
//! remote API does. Token-bucket-equivalent: the window holds the
//! timestamps of admitted calls in the trailing 60 seconds, and a call is
//! admitted only while fewer than `rpm` of those timestamps remain.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

const WINDOW: Duration = Duration::from_secs(60);

pub struct RateLimiter {
	rpm: u32,
	admitted: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
	#[must_use]
	pub fn new(rpm: u32) -> Self {
		Self { rpm, admitted: Mutex::new(VecDeque::new()) }
	}

	/// Attempts to admit one call under the rolling-minute cap. Returns
	/// `true` and records the call if there's budget left, `false`
	/// otherwise.
	pub fn try_acquire(&self) -> bool {
		let mut admitted = self.admitted.lock();
		let now = Instant::now();
		while let Some(&oldest) = admitted.front() {
			if now.duration_since(oldest) >= WINDOW {
				admitted.pop_front();
			} else {
				break;
			}
		}
		if (admitted.len() as u32) < self.rpm {
			admitted.push_back(now);
			true
		} else {
			false
		}
	}
}
