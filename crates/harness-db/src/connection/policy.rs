//! Post-connection reconnection policy

use std::time::Duration;

use crate::error::SettingsError;

/// Reconnection policy handed to the driver once a connection is established
///
/// It does not bound the bootstrap loop that runs before the first success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
	max_retries: u32,
	retry_interval: Duration,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_retries: 30,
			retry_interval: Duration::from_millis(1000),
		}
	}
}

impl RetryPolicy {
	/// Create a policy; `max_retries == 0` means unlimited reconnection attempts
	///
	/// # Examples
	///
	/// ```
	/// use harness_db::connection::RetryPolicy;
	///
	/// let policy = RetryPolicy::new(5, 250).unwrap();
	/// assert_eq!(policy.max_retries(), 5);
	/// assert!(RetryPolicy::new(5, 0).is_err());
	/// ```
	pub fn new(max_retries: u32, retry_interval_ms: u64) -> Result<Self, SettingsError> {
		if retry_interval_ms == 0 {
			return Err(SettingsError::ValidationError(
				"retry_interval_ms must be > 0".to_string(),
			));
		}
		Ok(Self {
			max_retries,
			retry_interval: Duration::from_millis(retry_interval_ms),
		})
	}

	pub fn max_retries(&self) -> u32 {
		self.max_retries
	}

	pub fn retry_interval(&self) -> Duration {
		self.retry_interval
	}

	pub fn is_unlimited(&self) -> bool {
		self.max_retries == 0
	}

	/// Whether `failures` consecutive transport failures exceed the policy
	///
	/// The first failure is the drop itself; each one after it is a failed
	/// reconnection attempt.
	pub(crate) fn exhausted(&self, failures: u32) -> bool {
		!self.is_unlimited() && failures > self.max_retries
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(0, 1, false)]
	#[case(0, 10_000, false)]
	#[case(3, 3, false)]
	#[case(3, 4, true)]
	#[case(1, 2, true)]
	fn test_exhausted(#[case] max_retries: u32, #[case] failures: u32, #[case] expected: bool) {
		// Arrange
		let policy = RetryPolicy::new(max_retries, 10).unwrap();

		// Act & Assert
		assert_eq!(policy.exhausted(failures), expected);
	}

	#[rstest]
	fn test_zero_retries_is_unlimited() {
		let policy = RetryPolicy::new(0, 500).unwrap();

		assert!(policy.is_unlimited());
		assert_eq!(policy.retry_interval(), Duration::from_millis(500));
	}
}
