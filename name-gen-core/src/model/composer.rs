use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GeneratorError, Result};
use crate::store::record::{Ethnicity, FirstName, Gender, NameEntry, Probabilities, Surname};

/// A generated first name + surname pair.
///
/// `probabilities` is the mean of both records' probabilities, rounded to
/// three decimals, and `dominant_ethnicity` is its most likely ethnicity.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FullName {
	pub first_name: String,
	pub surname: String,
	pub gender: Option<Gender>,
	pub probabilities: Probabilities,
	pub dominant_ethnicity: Ethnicity,
}

impl FullName {
	fn pair(first: &FirstName, surname: &Surname) -> Self {
		let probabilities = first.probabilities().average(surname.probabilities());
		Self {
			first_name: first.name().to_owned(),
			surname: surname.name().to_owned(),
			gender: first.gender(),
			dominant_ethnicity: probabilities.dominant(),
			probabilities,
		}
	}
}

impl fmt::Display for FullName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} {}", self.first_name, self.surname)
	}
}

/// Pairs the i-th first name with the i-th surname.
///
/// No filtering happens here: gender constraints must already be applied
/// to the first-name draws.
///
/// # Errors
/// `InvalidRequest` if the two sequences differ in length.
pub fn compose(first_names: &[&FirstName], surnames: &[&Surname]) -> Result<Vec<FullName>> {
	if first_names.len() != surnames.len() {
		return Err(GeneratorError::InvalidRequest(format!(
			"cannot pair {} first names with {} surnames",
			first_names.len(),
			surnames.len()
		)));
	}

	Ok(first_names
		.iter()
		.zip(surnames)
		.map(|(first, surname)| FullName::pair(first, surname))
		.collect())
}
