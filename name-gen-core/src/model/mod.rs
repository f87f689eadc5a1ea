//! Top-level module for the sampling pipeline.
//!
//! This module provides the weighted name generation system, including:
//! - Candidate selection by ethnicity, gender and threshold (`filter`)
//! - Cumulative-weight sampling with replacement (`sampler`)
//! - Pairing of draws into full names (`composer`)
//! - Request parameters (`request`)
//! - A high-level generation interface (`Generator`)

/// Candidate selection for a draw.
///
/// Narrows a table to the records matching a request and assigns each its
/// weight: population count when unconditioned, ethnicity probability otherwise.
pub mod filter;

/// Weighted sampling with replacement.
///
/// Inverse-transform sampling over cumulative weights, bounded per draw
/// by the candidate count.
pub mod sampler;

/// Position-wise pairing of first names and surnames.
pub mod composer;

/// Generation request parameters and the per-name ethnicity mix.
pub mod request;

/// High-level interface running a request against a name store.
pub mod generator;
