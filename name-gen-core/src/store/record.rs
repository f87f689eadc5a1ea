use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GeneratorError;
use crate::store::{NameStore, Table};

/// Ethnic categories carried by both name tables.
///
/// The set is closed: every record holds exactly one probability per variant.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Ethnicity {
	White,
	Black,
	Hispanic,
	Asian,
	Other,
}

impl Ethnicity {
	/// All ethnicities, in column order.
	pub const ALL: [Ethnicity; 5] = [
		Ethnicity::White,
		Ethnicity::Black,
		Ethnicity::Hispanic,
		Ethnicity::Asian,
		Ethnicity::Other,
	];

	pub fn as_str(self) -> &'static str {
		match self {
			Ethnicity::White => "white",
			Ethnicity::Black => "black",
			Ethnicity::Hispanic => "hispanic",
			Ethnicity::Asian => "asian",
			Ethnicity::Other => "other",
		}
	}

	/// Probability column in the SQLite tables (`prob_white`, ...).
	pub fn sql_column(self) -> &'static str {
		match self {
			Ethnicity::White => "prob_white",
			Ethnicity::Black => "prob_black",
			Ethnicity::Hispanic => "prob_hispanic",
			Ethnicity::Asian => "prob_asian",
			Ethnicity::Other => "prob_other",
		}
	}

	/// Probability column in the Dataverse tab files (`whi`, ...).
	pub fn tab_column(self) -> &'static str {
		match self {
			Ethnicity::White => "whi",
			Ethnicity::Black => "bla",
			Ethnicity::Hispanic => "his",
			Ethnicity::Asian => "asi",
			Ethnicity::Other => "oth",
		}
	}
}

impl fmt::Display for Ethnicity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Ethnicity {
	type Err = GeneratorError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let tag = s.trim().to_lowercase();
		Ethnicity::ALL
			.into_iter()
			.find(|e| e.as_str() == tag)
			.ok_or_else(|| {
				GeneratorError::InvalidRequest(format!(
					"unknown ethnicity '{}', expected one of white, black, hispanic, asian, other",
					s
				))
			})
	}
}

/// Gender tag of a first name. An absent tag means "unspecified".
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Gender {
	#[serde(rename = "M")]
	Male,
	#[serde(rename = "F")]
	Female,
}

impl Gender {
	pub fn as_str(self) -> &'static str {
		match self {
			Gender::Male => "M",
			Gender::Female => "F",
		}
	}

	/// Reads a stored gender column value.
	///
	/// Unknown or empty values map to `None`.
	pub fn from_column(value: &str) -> Option<Self> {
		match value.trim().to_lowercase().as_str() {
			"m" | "male" => Some(Gender::Male),
			"f" | "female" => Some(Gender::Female),
			_ => None,
		}
	}
}

impl fmt::Display for Gender {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Gender {
	type Err = GeneratorError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Gender::from_column(s).ok_or_else(|| {
			GeneratorError::InvalidRequest(format!("unknown gender '{}', expected M or F", s))
		})
	}
}

/// Per-ethnicity probabilities of a name.
///
/// Values are independent: they are not required to sum to 1 and are
/// never renormalized.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Default)]
pub struct Probabilities {
	pub white: f64,
	pub black: f64,
	pub hispanic: f64,
	pub asian: f64,
	pub other: f64,
}

impl Probabilities {
	/// Builds probabilities from values in `Ethnicity::ALL` order.
	pub fn from_array(values: [f64; 5]) -> Self {
		let [white, black, hispanic, asian, other] = values;
		Self { white, black, hispanic, asian, other }
	}

	pub fn get(&self, ethnicity: Ethnicity) -> f64 {
		match ethnicity {
			Ethnicity::White => self.white,
			Ethnicity::Black => self.black,
			Ethnicity::Hispanic => self.hispanic,
			Ethnicity::Asian => self.asian,
			Ethnicity::Other => self.other,
		}
	}

	pub fn iter(&self) -> impl Iterator<Item = (Ethnicity, f64)> + '_ {
		Ethnicity::ALL.into_iter().map(|e| (e, self.get(e)))
	}

	/// Returns the first ethnicity whose value lies outside `[0, 1]`.
	fn first_out_of_range(&self) -> Option<(Ethnicity, f64)> {
		self.iter().find(|(_, p)| !(0.0..=1.0).contains(p))
	}

	/// Most likely ethnicity. Ties go to the earliest in `Ethnicity::ALL`.
	pub fn dominant(&self) -> Ethnicity {
		let mut best = (Ethnicity::White, self.white);
		for (ethnicity, p) in self.iter().skip(1) {
			if p > best.1 {
				best = (ethnicity, p);
			}
		}
		best.0
	}

	/// Element-wise mean of two probability sets, rounded to 3 decimals.
	pub fn average(&self, other: &Self) -> Self {
		let mean = |a: f64, b: f64| ((a + b) / 2.0 * 1000.0).round() / 1000.0;
		Self {
			white: mean(self.white, other.white),
			black: mean(self.black, other.black),
			hispanic: mean(self.hispanic, other.hispanic),
			asian: mean(self.asian, other.asian),
			other: mean(self.other, other.other),
		}
	}
}

/// A row as read from a backing store, before validation.
///
/// `gender` is always `None` for surname rows.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NameRow {
	pub name: String,
	pub gender: Option<String>,
	pub count: i64,
	pub probabilities: Probabilities,
}

/// Common view over the typed records of both tables.
///
/// The filter and sampler are generic over this trait, so a table
/// without a gender column simply never reports one.
pub trait NameEntry: Sized {
	/// Table the record type is loaded from.
	const TABLE: Table;

	fn name(&self) -> &str;

	fn count(&self) -> u64;

	fn probabilities(&self) -> &Probabilities;

	fn gender(&self) -> Option<Gender> {
		None
	}

	/// Validates a raw row into a record.
	///
	/// # Errors
	/// Returns the reason the row is invalid.
	fn from_row(row: NameRow) -> Result<Self, String>;

	/// Returns the cached records of this type held by the store.
	fn in_store(store: &NameStore) -> &[Self];
}

fn validate(name: &str, count: i64, probabilities: &Probabilities) -> Result<u64, String> {
	if name.trim().is_empty() {
		return Err("empty name".to_owned());
	}
	let count = u64::try_from(count).map_err(|_| format!("negative count {} for '{}'", count, name))?;
	if let Some((ethnicity, p)) = probabilities.first_out_of_range() {
		return Err(format!("probability {}={} out of [0, 1] for '{}'", ethnicity, p, name));
	}
	Ok(count)
}

/// A validated first-name record.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FirstName {
	name: String,
	gender: Option<Gender>,
	count: u64,
	probabilities: Probabilities,
}

impl FirstName {
	/// Creates a first name.
	///
	/// # Errors
	/// Returns an error if the name is blank or a probability is outside `[0, 1]`.
	pub fn new(name: &str, gender: Option<Gender>, count: u64, probabilities: Probabilities) -> Result<Self, String> {
		let count = i64::try_from(count).map_err(|_| format!("count {} too large", count))?;
		let count = validate(name, count, &probabilities)?;
		Ok(Self { name: name.trim().to_owned(), gender, count, probabilities })
	}
}

impl NameEntry for FirstName {
	const TABLE: Table = Table::FirstNames;

	fn name(&self) -> &str {
		&self.name
	}

	fn count(&self) -> u64 {
		self.count
	}

	fn probabilities(&self) -> &Probabilities {
		&self.probabilities
	}

	fn gender(&self) -> Option<Gender> {
		self.gender
	}

	fn from_row(row: NameRow) -> Result<Self, String> {
		let count = validate(&row.name, row.count, &row.probabilities)?;
		Ok(Self {
			name: row.name.trim().to_owned(),
			gender: row.gender.as_deref().and_then(Gender::from_column),
			count,
			probabilities: row.probabilities,
		})
	}

	fn in_store(store: &NameStore) -> &[Self] {
		store.first_names()
	}
}

/// A validated surname record. Surnames carry no gender.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Surname {
	name: String,
	count: u64,
	probabilities: Probabilities,
}

impl Surname {
	/// Creates a surname.
	///
	/// # Errors
	/// Returns an error if the name is blank or a probability is outside `[0, 1]`.
	pub fn new(name: &str, count: u64, probabilities: Probabilities) -> Result<Self, String> {
		let count = i64::try_from(count).map_err(|_| format!("count {} too large", count))?;
		let count = validate(name, count, &probabilities)?;
		Ok(Self { name: name.trim().to_owned(), count, probabilities })
	}
}

impl NameEntry for Surname {
	const TABLE: Table = Table::Surnames;

	fn name(&self) -> &str {
		&self.name
	}

	fn count(&self) -> u64 {
		self.count
	}

	fn probabilities(&self) -> &Probabilities {
		&self.probabilities
	}

	fn from_row(row: NameRow) -> Result<Self, String> {
		let count = validate(&row.name, row.count, &row.probabilities)?;
		Ok(Self {
			name: row.name.trim().to_owned(),
			count,
			probabilities: row.probabilities,
		})
	}

	fn in_store(store: &NameStore) -> &[Self] {
		store.surnames()
	}
}
