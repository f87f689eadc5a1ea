use std::fmt;

use log::debug;

use crate::error::{GeneratorError, Result};
use crate::store::record::{Ethnicity, Gender, NameEntry};

/// Threshold applied when the caller does not supply one.
pub const DEFAULT_MIN_PROBABILITY: f64 = 0.40;

/// What a draw is conditioned on.
///
/// - `ethnicity: None` samples the whole table by population count.
/// - `gender` only applies to tables that carry a gender column.
/// - `min_probability` only applies when an ethnicity is set.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FilterCriteria {
	pub ethnicity: Option<Ethnicity>,
	pub gender: Option<Gender>,
	pub min_probability: f64,
}

impl Default for FilterCriteria {
	fn default() -> Self {
		Self {
			ethnicity: None,
			gender: None,
			min_probability: DEFAULT_MIN_PROBABILITY,
		}
	}
}

impl fmt::Display for FilterCriteria {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.ethnicity {
			Some(ethnicity) => write!(f, "ethnicity={}", ethnicity)?,
			None => f.write_str("ethnicity=any")?,
		}
		match self.gender {
			Some(gender) => write!(f, ", gender={}", gender)?,
			None => f.write_str(", gender=any")?,
		}
		write!(f, ", min_probability={}", self.min_probability)
	}
}

/// Validates a probability threshold.
///
/// # Errors
/// `InvalidRequest` if the value is not a finite number in `[0, 1]`.
pub fn check_min_probability(min_probability: f64) -> Result<()> {
	if !(0.0..=1.0).contains(&min_probability) {
		return Err(GeneratorError::InvalidRequest(format!(
			"min_probability must be between 0.0 and 1.0, got {}",
			min_probability
		)));
	}
	Ok(())
}

/// Records eligible for a draw, each paired with its weight.
///
/// # Invariants
/// - Never empty.
/// - Every weight is finite and strictly positive.
#[derive(Debug)]
pub struct Candidates<'a, T> {
	entries: Vec<(&'a T, f64)>,
}

impl<'a, T> Candidates<'a, T> {
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&'a T, f64)> + '_ {
		self.entries.iter().copied()
	}

	pub fn total_weight(&self) -> f64 {
		self.entries.iter().map(|(_, w)| w).sum()
	}
}

/// Narrows `records` to the candidates matching `criteria`.
///
/// # Behavior
/// - Gender (if requested and the table has one) must match exactly;
///   records with an unspecified gender are dropped.
/// - Without an ethnicity, candidates are the records with `count > 0`,
///   weighted by count.
/// - With an ethnicity, candidates are the records whose probability for it
///   is `>= min_probability` (inclusive) and non-zero, weighted by that
///   probability.
///
/// # Errors
/// - `InvalidRequest` if `min_probability` is outside `[0, 1]`.
/// - `NoCandidates` if nothing survives. There is no fallback to a lower
///   threshold or to the unconditioned pool.
pub fn filter<'a, T: NameEntry>(records: &'a [T], criteria: &FilterCriteria) -> Result<Candidates<'a, T>> {
	check_min_probability(criteria.min_probability)?;

	let gender = criteria.gender.filter(|_| T::TABLE.carries_gender());

	let entries: Vec<(&'a T, f64)> = records
		.iter()
		.filter(|record| gender.is_none() || record.gender() == gender)
		.filter_map(|record| {
			let weight = match criteria.ethnicity {
				None => record.count() as f64,
				Some(ethnicity) => {
					let p = record.probabilities().get(ethnicity);
					if p < criteria.min_probability {
						return None;
					}
					p
				}
			};
			(weight > 0.0).then_some((record, weight))
		})
		.collect();

	debug!("{} candidates out of {} {} for {}", entries.len(), records.len(), T::TABLE, criteria);

	if entries.is_empty() {
		return Err(GeneratorError::NoCandidates {
			table: T::TABLE,
			criteria: *criteria,
		});
	}
	Ok(Candidates { entries })
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::store::record::{FirstName, Probabilities, Surname};
	use crate::store::Table;

	fn surname(name: &str, count: u64, asian: f64) -> Surname {
		Surname::new(name, count, Probabilities::from_array([1.0 - asian, 0.0, 0.0, asian, 0.0])).unwrap()
	}

	fn first_name(name: &str, gender: Option<Gender>, count: u64, hispanic: f64) -> FirstName {
		FirstName::new(name, gender, count, Probabilities::from_array([1.0 - hispanic, 0.0, hispanic, 0.0, 0.0])).unwrap()
	}

	fn asian(min_probability: f64) -> FilterCriteria {
		FilterCriteria {
			ethnicity: Some(Ethnicity::Asian),
			gender: None,
			min_probability,
		}
	}

	fn names<T: NameEntry>(candidates: &Candidates<'_, T>) -> Vec<String> {
		candidates.iter().map(|(r, _)| r.name().to_owned()).collect()
	}

	#[test]
	fn unconditioned_weights_by_count_and_skips_zero_counts() {
		let records = vec![surname("Smith", 100, 0.1), surname("Nguyen", 10, 0.9), surname("Rare", 0, 0.9)];
		let candidates = filter(&records, &FilterCriteria::default()).unwrap();

		let weights: Vec<f64> = candidates.iter().map(|(_, w)| w).collect();
		assert_eq!(names(&candidates), vec!["Smith", "Nguyen"]);
		assert_eq!(weights, vec![100.0, 10.0]);
	}

	#[test]
	fn conditioned_weights_by_probability_and_keeps_zero_counts() {
		let records = vec![surname("Smith", 100, 0.1), surname("Rare", 0, 0.8)];
		let candidates = filter(&records, &asian(0.5)).unwrap();

		assert_eq!(names(&candidates), vec!["Rare"]);
		assert_eq!(candidates.total_weight(), 0.8);
	}

	#[test]
	fn threshold_is_inclusive() {
		let records = vec![surname("Edge", 5, 0.5), surname("Below", 5, 0.4999)];
		let candidates = filter(&records, &asian(0.5)).unwrap();
		assert_eq!(names(&candidates), vec!["Edge"]);
	}

	#[test]
	fn raising_threshold_never_grows_candidate_set() {
		let records: Vec<Surname> = (0..=20)
			.map(|i| surname(&format!("S{}", i), 1, i as f64 / 20.0))
			.collect();

		let mut previous: Option<Vec<String>> = None;
		for step in 0..=20 {
			let threshold = step as f64 / 20.0;
			let current = match filter(&records, &asian(threshold)) {
				Ok(candidates) => names(&candidates),
				Err(_) => Vec::new(),
			};
			if let Some(previous) = &previous {
				assert!(current.len() <= previous.len());
				assert!(current.iter().all(|name| previous.contains(name)));
			}
			previous = Some(current);
		}
	}

	#[test]
	fn zero_probability_is_excluded_even_at_zero_threshold() {
		let records = vec![surname("Smith", 100, 0.0), surname("Lee", 10, 0.3)];
		let candidates = filter(&records, &asian(0.0)).unwrap();
		assert_eq!(names(&candidates), vec!["Lee"]);
	}

	#[test]
	fn empty_result_is_no_candidates() {
		let records = vec![surname("Smith", 100, 0.1), surname("Nguyen", 10, 0.9)];
		match filter(&records, &asian(0.99)) {
			Err(GeneratorError::NoCandidates { table, criteria }) => {
				assert_eq!(table, Table::Surnames);
				assert_eq!(criteria.min_probability, 0.99);
			}
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[test]
	fn gender_filter_excludes_unspecified() {
		let records = vec![
			first_name("Maria", Some(Gender::Female), 10, 0.75),
			first_name("Jose", Some(Gender::Male), 8, 0.8),
			first_name("Alex", None, 5, 0.9),
		];
		let criteria = FilterCriteria {
			ethnicity: Some(Ethnicity::Hispanic),
			gender: Some(Gender::Female),
			min_probability: 0.4,
		};
		assert_eq!(names(&filter(&records, &criteria).unwrap()), vec!["Maria"]);
	}

	#[test]
	fn gender_is_ignored_for_surnames() {
		let records = vec![surname("Smith", 100, 0.1)];
		let criteria = FilterCriteria {
			gender: Some(Gender::Male),
			..FilterCriteria::default()
		};
		assert_eq!(filter(&records, &criteria).unwrap().len(), 1);
	}

	#[test]
	fn out_of_range_threshold_is_invalid_request() {
		let records = vec![surname("Smith", 100, 0.1)];
		assert!(matches!(filter(&records, &asian(1.5)), Err(GeneratorError::InvalidRequest(_))));
		assert!(matches!(filter(&records, &asian(f64::NAN)), Err(GeneratorError::InvalidRequest(_))));
	}
}
