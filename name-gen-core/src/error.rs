use thiserror::Error;

use crate::model::filter::FilterCriteria;
use crate::store::Table;

/// Errors surfaced by the name generation pipeline.
///
/// Each variant is a distinct condition so that callers (HTTP API, CLI)
/// can map it to their own status codes and messages.
#[derive(Debug, Error)]
pub enum GeneratorError {
	/// The backing store could not be opened or read.
	#[error("name store unavailable ({source_desc}): {reason}")]
	StoreUnavailable {
		source_desc: String,
		reason: String,
	},

	/// A required table or column is absent, or a column holds malformed data.
	#[error("schema mismatch in table '{table}': {reason}")]
	SchemaMismatch {
		table: Table,
		reason: String,
	},

	/// A caller-supplied parameter violates a documented constraint.
	#[error("invalid request: {0}")]
	InvalidRequest(String),

	/// Filtering left no candidate for the requested criteria.
	#[error("no {table} found for {criteria}")]
	NoCandidates {
		table: Table,
		criteria: FilterCriteria,
	},

	/// Weights handed to the sampler break its invariants.
	///
	/// Unreachable through the filter; seeing it means a defect upstream.
	#[error("invalid sampling weights: {0}")]
	InvalidWeights(String),
}

pub type Result<T, E = GeneratorError> = std::result::Result<T, E>;

impl GeneratorError {
	pub(crate) fn unavailable(source_desc: impl Into<String>, reason: impl ToString) -> Self {
		Self::StoreUnavailable {
			source_desc: source_desc.into(),
			reason: reason.to_string(),
		}
	}

	pub(crate) fn schema(table: Table, reason: impl Into<String>) -> Self {
		Self::SchemaMismatch {
			table,
			reason: reason.into(),
		}
	}
}
