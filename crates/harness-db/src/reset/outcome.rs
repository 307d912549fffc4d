//! Result of a reset run

use serde::{Deserialize, Serialize};

use super::collections::CollectionName;
use crate::error::ResetError;

/// One collection that failed to purge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionFailure {
	pub collection: CollectionName,
	pub message: String,
}

impl CollectionFailure {
	pub fn new(collection: CollectionName, message: impl Into<String>) -> Self {
		Self {
			collection,
			message: message.into(),
		}
	}
}

/// Aggregate outcome of [`reset_all`](super::CollectionResetCoordinator::reset_all)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResetOutcome {
	Success,
	/// Every existing collection was attempted; these ones failed, in attempt order
	PartialFailure(Vec<CollectionFailure>),
}

impl ResetOutcome {
	pub(crate) fn from_failures(failures: Vec<CollectionFailure>) -> Self {
		if failures.is_empty() {
			ResetOutcome::Success
		} else {
			ResetOutcome::PartialFailure(failures)
		}
	}

	pub fn is_success(&self) -> bool {
		matches!(self, ResetOutcome::Success)
	}

	/// Failures of this run; empty on success
	pub fn failures(&self) -> &[CollectionFailure] {
		match self {
			ResetOutcome::Success => &[],
			ResetOutcome::PartialFailure(failures) => failures,
		}
	}

	/// Turn a partial failure into the terminal [`ResetError::PartialFailure`]
	pub fn into_result(self) -> Result<(), ResetError> {
		match self {
			ResetOutcome::Success => Ok(()),
			ResetOutcome::PartialFailure(failures) => Err(ResetError::PartialFailure(failures)),
		}
	}
}
