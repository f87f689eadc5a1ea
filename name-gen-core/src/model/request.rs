use std::collections::BTreeMap;

use crate::error::{GeneratorError, Result};
use crate::model::filter::{check_min_probability, FilterCriteria, DEFAULT_MIN_PROBABILITY};
use crate::store::record::{Ethnicity, Gender};

/// Share of each ethnicity used to mix output when no ethnicity is requested.
///
/// # Responsibilities
/// - Track per-ethnicity intensity (user-adjustable, not normalized)
/// - Derive normalized shares that always sum to 1.0
///
/// # Invariants
/// - Every ethnicity has an intensity (possibly zero)
/// - `shares` is proportional to the intensities, or uniform if all are zero
#[derive(Clone, Debug, PartialEq)]
pub struct EthnicDistribution {
	intensity: BTreeMap<Ethnicity, f64>,
	shares: BTreeMap<Ethnicity, f64>,
}

impl EthnicDistribution {
	/// Creates a distribution where every ethnicity has the same share.
	pub fn uniform() -> Self {
		let mut distribution = Self {
			intensity: Ethnicity::ALL.into_iter().map(|e| (e, 0.0)).collect(),
			shares: BTreeMap::new(),
		};
		distribution.normalize();
		distribution
	}

	/// US demographic proportions (2024 estimates).
	pub fn us_default() -> Self {
		let mut distribution = Self::uniform();
		for (ethnicity, share) in [
			(Ethnicity::White, 0.60),
			(Ethnicity::Hispanic, 0.18),
			(Ethnicity::Black, 0.13),
			(Ethnicity::Asian, 0.06),
			(Ethnicity::Other, 0.03),
		] {
			distribution.intensity.insert(ethnicity, share);
		}
		distribution.normalize();
		distribution
	}

	/// Normalizes `intensity` into `shares`.
	///
	/// - If total intensity > 0, shares are proportional to intensities.
	/// - If all intensities are 0, every ethnicity gets the same share.
	fn normalize(&mut self) {
		let sum: f64 = self.intensity.values().sum();

		self.shares.clear();

		if sum > 0.0 {
			for (ethnicity, intensity) in &self.intensity {
				self.shares.insert(*ethnicity, intensity / sum);
			}
		} else {
			let uniform = 1.0 / self.intensity.len() as f64;
			for ethnicity in self.intensity.keys() {
				self.shares.insert(*ethnicity, uniform);
			}
		}
	}

	/// Sets the intensity of one ethnicity and renormalizes.
	///
	/// # Errors
	/// `InvalidRequest` if the intensity is negative or not finite.
	pub fn set_intensity(&mut self, ethnicity: Ethnicity, intensity: f64) -> Result<()> {
		if !intensity.is_finite() || intensity < 0.0 {
			return Err(GeneratorError::InvalidRequest(format!(
				"intensity for {} must be a non-negative number, got {}",
				ethnicity, intensity
			)));
		}
		self.intensity.insert(ethnicity, intensity);
		self.normalize();
		Ok(())
	}

	/// Normalized share of `ethnicity`.
	pub fn share(&self, ethnicity: Ethnicity) -> f64 {
		self.shares.get(&ethnicity).copied().unwrap_or(0.0)
	}

	/// Iterates over `(ethnicity, share)` pairs, in ethnicity order.
	pub fn shares(&self) -> impl Iterator<Item = (Ethnicity, f64)> + '_ {
		self.shares.iter().map(|(e, s)| (*e, *s))
	}
}

/// Parameters of one generation request.
///
/// `count = 0` is a valid request and produces an empty result.
///
/// # Invariants
/// - `min_probability` is always within `[0, 1]` (enforced by the setter)
#[derive(Clone, Debug, PartialEq)]
pub struct GenerateRequest {
	/// Number of names to produce.
	pub count: usize,

	/// Restrict and weight draws by this ethnicity.
	pub ethnicity: Option<Ethnicity>,

	/// Restrict first names to this gender.
	pub gender: Option<Gender>,

	/// Per-name ethnicity mix, used only when `ethnicity` is `None`.
	pub distribution: Option<EthnicDistribution>,

	/// Seed for a reproducible random stream.
	pub seed: Option<u64>,

	/// Threshold on the requested ethnicity's probability.
	min_probability: f64,
}

impl GenerateRequest {
	/// Creates an unconditioned request for `count` names.
	pub fn new(count: usize) -> Self {
		Self {
			count,
			ethnicity: None,
			gender: None,
			distribution: None,
			seed: None,
			min_probability: DEFAULT_MIN_PROBABILITY,
		}
	}

	/// Converts an externally supplied count.
	///
	/// # Errors
	/// `InvalidRequest` if the count is negative.
	pub fn parse_count(count: i64) -> Result<usize> {
		usize::try_from(count)
			.map_err(|_| GeneratorError::InvalidRequest(format!("count must not be negative, got {}", count)))
	}

	pub fn with_ethnicity(mut self, ethnicity: Ethnicity) -> Self {
		self.ethnicity = Some(ethnicity);
		self
	}

	pub fn with_gender(mut self, gender: Gender) -> Self {
		self.gender = Some(gender);
		self
	}

	pub fn with_seed(mut self, seed: u64) -> Self {
		self.seed = Some(seed);
		self
	}

	pub fn with_distribution(mut self, distribution: EthnicDistribution) -> Self {
		self.distribution = Some(distribution);
		self
	}

	/// Returns the current probability threshold.
	pub fn min_probability(&self) -> f64 {
		self.min_probability
	}

	/// Sets the probability threshold (0.0..=1.0).
	///
	/// # Errors
	/// Returns `InvalidRequest` if the value is outside the valid range.
	pub fn set_min_probability(&mut self, min_probability: f64) -> Result<()> {
		check_min_probability(min_probability)?;
		self.min_probability = min_probability;
		Ok(())
	}

	/// Filter criteria for first names.
	pub fn criteria(&self) -> FilterCriteria {
		FilterCriteria {
			ethnicity: self.ethnicity,
			gender: self.gender,
			min_probability: self.min_probability,
		}
	}

	/// Same criteria with the ethnicity replaced, used by the ethnicity mix.
	pub(crate) fn criteria_for(&self, ethnicity: Ethnicity) -> FilterCriteria {
		FilterCriteria {
			ethnicity: Some(ethnicity),
			..self.criteria()
		}
	}
}
