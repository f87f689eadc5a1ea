use rand::Rng;

use crate::error::{GeneratorError, Result};
use crate::model::filter::Candidates;

/// Cumulative-weight table over a candidate set.
///
/// Conceptually the candidates are laid end to end on the interval
/// `[0, total)`, each occupying a span equal to its weight. A draw picks a
/// uniform point on that interval and returns the candidate owning it.
///
/// ## Responsibilities:
/// - Validate the weights once, at construction
/// - Draw candidates with replacement, each draw independent
///
/// ## Invariants
/// - `items` is non-empty and `cumulative` has the same length
/// - `cumulative` is strictly increasing (all weights are > 0)
/// - `total` equals the last cumulative value
#[derive(Debug, Clone)]
pub struct CumulativeTable<'a, T> {
	items: Vec<&'a T>,
	cumulative: Vec<f64>,
	total: f64,
}

impl<'a, T> CumulativeTable<'a, T> {
	/// Builds a table from `(item, weight)` pairs.
	///
	/// # Errors
	/// `InvalidWeights` if the input is empty, a weight is negative or not
	/// finite, or the total is not strictly positive.
	pub fn new<I>(weighted: I) -> Result<Self>
	where
		I: IntoIterator<Item = (&'a T, f64)>,
	{
		let mut items = Vec::new();
		let mut cumulative = Vec::new();
		let mut total = 0.0;

		for (item, weight) in weighted {
			if !weight.is_finite() || weight < 0.0 {
				return Err(GeneratorError::InvalidWeights(format!(
					"weight {} at position {}",
					weight,
					items.len()
				)));
			}
			// Zero-weight items can never be drawn
			if weight == 0.0 {
				continue;
			}
			total += weight;
			items.push(item);
			cumulative.push(total);
		}

		if items.is_empty() || !(total > 0.0) || !total.is_finite() {
			return Err(GeneratorError::InvalidWeights(format!("total weight {}", total)));
		}

		Ok(Self { items, cumulative, total })
	}

	/// Builds a table from filtered candidates.
	pub fn from_candidates(candidates: &Candidates<'a, T>) -> Result<Self> {
		Self::new(candidates.iter())
	}

	pub fn len(&self) -> usize {
		self.items.len()
	}

	pub fn total(&self) -> f64 {
		self.total
	}

	/// Draws one item.
	///
	/// The probability of an item is its weight divided by the total.
	/// A single-item table returns that item without consuming randomness.
	///
	/// This method performs:
	/// - one uniform draw in `[0, total)`
	/// - a binary search for the first cumulative weight above it
	pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> &'a T {
		if self.items.len() == 1 {
			return self.items[0];
		}

		let target = rng.random_range(0.0..self.total);
		let index = self.cumulative.partition_point(|&c| c <= target);

		// Rounding can only push the index one past the end
		self.items[index.min(self.items.len() - 1)]
	}

	/// Draws `n` items with replacement. `n = 0` yields an empty vector.
	pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, n: usize) -> Vec<&'a T> {
		(0..n).map(|_| self.draw(rng)).collect()
	}
}

/// Draws `n` candidates with replacement, proportionally to their weights.
///
/// # Errors
/// `InvalidWeights` if the candidate weights break the table invariants.
pub fn sample<'a, T, R>(candidates: &Candidates<'a, T>, n: usize, rng: &mut R) -> Result<Vec<&'a T>>
where
	R: Rng + ?Sized,
{
	Ok(CumulativeTable::from_candidates(candidates)?.sample(rng, n))
}
