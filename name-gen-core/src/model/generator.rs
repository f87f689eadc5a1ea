use std::collections::BTreeMap;

use log::debug;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::{GeneratorError, Result};
use crate::model::composer::{compose, FullName};
use crate::model::filter::{filter, FilterCriteria};
use crate::model::request::{EthnicDistribution, GenerateRequest};
use crate::model::sampler::CumulativeTable;
use crate::store::record::{Ethnicity, FirstName, NameEntry, Surname};
use crate::store::NameStore;

/// High-level generator over a loaded name store.
///
/// # Responsibilities
/// - Turn a `GenerateRequest` into filter criteria for both tables
/// - Draw first names and surnames independently, with replacement
/// - Pair the draws into full names
///
/// The generator holds no state besides the shared, read-only store; each
/// call is determined by its request and random source.
#[derive(Debug, Clone, Copy)]
pub struct Generator<'s> {
	store: &'s NameStore,
}

/// Candidate tables for one ethnicity of a mix.
struct MixTables<'s> {
	first_names: CumulativeTable<'s, FirstName>,
	surnames: CumulativeTable<'s, Surname>,
}

impl<'s> Generator<'s> {
	pub fn new(store: &'s NameStore) -> Self {
		Self { store }
	}

	/// Random stream for a request: seeded ChaCha8 when a seed is given,
	/// otherwise seeded from the thread-local generator.
	fn make_rng(request: &GenerateRequest) -> ChaCha8Rng {
		match request.seed {
			Some(seed) => ChaCha8Rng::seed_from_u64(seed),
			None => ChaCha8Rng::from_rng(&mut rand::rng()),
		}
	}

	/// Generates `request.count` full names.
	///
	/// # Errors
	/// - `InvalidRequest` for out-of-range parameters
	/// - `NoCandidates` if a table has nothing matching the request
	pub fn generate(&self, request: &GenerateRequest) -> Result<Vec<FullName>> {
		self.generate_with_rng(request, &mut Self::make_rng(request))
	}

	/// Generates full names drawing randomness from `rng`.
	///
	/// Both tables are filtered before anything is drawn, so a request
	/// either fails up front or yields exactly `request.count` names.
	pub fn generate_with_rng<R: Rng + ?Sized>(&self, request: &GenerateRequest, rng: &mut R) -> Result<Vec<FullName>> {
		match (request.ethnicity, &request.distribution) {
			(None, Some(distribution)) => self.generate_mixed(request, distribution, rng),
			_ => {
				let criteria = request.criteria();
				let first_names = Self::table::<FirstName>(self.store.first_names(), &criteria)?;
				let surnames = Self::table::<Surname>(self.store.surnames(), &criteria)?;

				let first_draws = first_names.sample(rng, request.count);
				let surname_draws = surnames.sample(rng, request.count);
				debug!("Drew {} names for {}", request.count, criteria);
				compose(&first_draws, &surname_draws)
			}
		}
	}

	/// Generates first names only.
	pub fn generate_first_names(&self, request: &GenerateRequest) -> Result<Vec<FirstName>> {
		self.generate_first_names_with_rng(request, &mut Self::make_rng(request))
	}

	/// Generates first names only, drawing randomness from `rng`.
	///
	/// A distribution mix applies the same way as for full names.
	pub fn generate_first_names_with_rng<R: Rng + ?Sized>(
		&self,
		request: &GenerateRequest,
		rng: &mut R,
	) -> Result<Vec<FirstName>> {
		match (request.ethnicity, &request.distribution) {
			(None, Some(distribution)) => {
				let ethnicities = Self::ethnicity_table(distribution)?;
				let mut tables = BTreeMap::new();
				for (ethnicity, _) in distribution.shares().filter(|(_, share)| *share > 0.0) {
					let criteria = request.criteria_for(ethnicity);
					tables.insert(ethnicity, Self::table::<FirstName>(self.store.first_names(), &criteria)?);
				}
				(0..request.count)
					.map(|_| {
						let ethnicity = ethnicities.draw(rng);
						Self::mix_entry(&tables, *ethnicity).map(|table| table.draw(rng).clone())
					})
					.collect()
			}
			_ => {
				let table = Self::table::<FirstName>(self.store.first_names(), &request.criteria())?;
				Ok(table.sample(rng, request.count).into_iter().cloned().collect())
			}
		}
	}

	/// Each name first draws an ethnicity from the distribution, then both
	/// its parts are drawn conditioned on that ethnicity.
	fn generate_mixed<R: Rng + ?Sized>(
		&self,
		request: &GenerateRequest,
		distribution: &EthnicDistribution,
		rng: &mut R,
	) -> Result<Vec<FullName>> {
		let ethnicities = Self::ethnicity_table(distribution)?;

		// Every reachable ethnicity is checked before the first draw
		let mut tables = BTreeMap::new();
		for (ethnicity, _) in distribution.shares().filter(|(_, share)| *share > 0.0) {
			let criteria = request.criteria_for(ethnicity);
			tables.insert(
				ethnicity,
				MixTables {
					first_names: Self::table(self.store.first_names(), &criteria)?,
					surnames: Self::table(self.store.surnames(), &criteria)?,
				},
			);
		}

		let mut first_draws = Vec::with_capacity(request.count);
		let mut surname_draws = Vec::with_capacity(request.count);
		for _ in 0..request.count {
			let ethnicity = *ethnicities.draw(rng);
			let pair = Self::mix_entry(&tables, ethnicity)?;
			first_draws.push(pair.first_names.draw(rng));
			surname_draws.push(pair.surnames.draw(rng));
		}
		debug!("Drew {} mixed names", request.count);
		compose(&first_draws, &surname_draws)
	}

	fn table<'a, T: NameEntry>(records: &'a [T], criteria: &FilterCriteria) -> Result<CumulativeTable<'a, T>> {
		CumulativeTable::from_candidates(&filter(records, criteria)?)
	}

	fn ethnicity_table(distribution: &EthnicDistribution) -> Result<CumulativeTable<'static, Ethnicity>> {
		let all: &'static [Ethnicity; 5] = &Ethnicity::ALL;
		CumulativeTable::new(all.iter().map(|e| (e, distribution.share(*e))))
	}

	fn mix_entry<'t, V>(tables: &'t BTreeMap<Ethnicity, V>, ethnicity: Ethnicity) -> Result<&'t V> {
		tables.get(&ethnicity).ok_or_else(|| {
			GeneratorError::InvalidWeights(format!("ethnicity {} drawn with a zero share", ethnicity))
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::store::record::{Gender, Probabilities};
	use crate::store::Table;

	fn store() -> NameStore {
		let first = |name: &str, gender: Gender, count: u64, p: [f64; 5]| {
			FirstName::new(name, Some(gender), count, Probabilities::from_array(p)).unwrap()
		};
		let last = |name: &str, count: u64, p: [f64; 5]| Surname::new(name, count, Probabilities::from_array(p)).unwrap();

		NameStore::from_records(
			vec![
				first("Maria", Gender::Female, 10_000, [0.10, 0.05, 0.75, 0.08, 0.02]),
				first("Jose", Gender::Male, 8_000, [0.08, 0.03, 0.80, 0.07, 0.02]),
				first("Jennifer", Gender::Female, 12_000, [0.70, 0.15, 0.10, 0.03, 0.02]),
				first("Michael", Gender::Male, 15_000, [0.65, 0.20, 0.10, 0.03, 0.02]),
				first("Wei", Gender::Male, 3_000, [0.05, 0.02, 0.03, 0.88, 0.02]),
				first("Jamal", Gender::Male, 4_000, [0.05, 0.85, 0.05, 0.03, 0.02]),
			],
			vec![
				last("Garcia", 20_000, [0.05, 0.03, 0.85, 0.05, 0.02]),
				last("Smith", 30_000, [0.70, 0.20, 0.05, 0.03, 0.02]),
				last("Wang", 8_000, [0.03, 0.01, 0.02, 0.92, 0.02]),
				last("Williams", 22_000, [0.45, 0.48, 0.03, 0.02, 0.02]),
			],
		)
	}

	#[test]
	fn conditioned_request_stays_within_ethnicity() {
		let store = store();
		let request = GenerateRequest::new(50).with_ethnicity(Ethnicity::Hispanic).with_seed(5);
		let names = Generator::new(&store).generate(&request).unwrap();

		assert_eq!(names.len(), 50);
		for name in &names {
			assert!(["Maria", "Jose"].contains(&name.first_name.as_str()));
			assert_eq!(name.surname, "Garcia");
		}
	}

	#[test]
	fn gender_applies_to_first_names_only() {
		let store = store();
		let request = GenerateRequest::new(40).with_gender(Gender::Female).with_seed(8);
		let names = Generator::new(&store).generate(&request).unwrap();

		assert!(names.iter().all(|n| n.gender == Some(Gender::Female)));
		assert!(names.iter().any(|n| n.surname != "Garcia"));
	}

	#[test]
	fn missing_gender_for_ethnicity_is_no_candidates() {
		let store = store();
		let request = GenerateRequest::new(1).with_ethnicity(Ethnicity::Asian).with_gender(Gender::Female);
		match Generator::new(&store).generate(&request) {
			Err(GeneratorError::NoCandidates { table, .. }) => assert_eq!(table, Table::FirstNames),
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[test]
	fn first_names_only() {
		let store = store();
		let request = GenerateRequest::new(10).with_ethnicity(Ethnicity::Black).with_seed(1);
		let names = Generator::new(&store).generate_first_names(&request).unwrap();
		assert_eq!(names.len(), 10);
		assert!(names.iter().all(|n| n.name() == "Jamal"));
	}

	#[test]
	fn mix_pairs_parts_of_same_ethnicity() {
		let store = store();
		let mut distribution = EthnicDistribution::uniform();
		distribution.set_intensity(Ethnicity::Hispanic, 1.0).unwrap();
		distribution.set_intensity(Ethnicity::Asian, 1.0).unwrap();
		let request = GenerateRequest::new(200).with_distribution(distribution).with_seed(3);

		let names = Generator::new(&store).generate(&request).unwrap();
		assert_eq!(names.len(), 200);
		for name in &names {
			match name.surname.as_str() {
				"Garcia" => assert!(["Maria", "Jose"].contains(&name.first_name.as_str())),
				"Wang" => assert_eq!(name.first_name, "Wei"),
				other => panic!("unexpected surname {}", other),
			}
		}
		assert!(names.iter().any(|n| n.surname == "Garcia"));
		assert!(names.iter().any(|n| n.surname == "Wang"));
	}

	#[test]
	fn mix_fails_up_front_when_a_share_has_no_candidates() {
		let store = store();
		let request = GenerateRequest::new(0).with_distribution(EthnicDistribution::us_default());
		// No name reaches 0.40 for "other"
		assert!(matches!(
			Generator::new(&store).generate(&request),
			Err(GeneratorError::NoCandidates { .. })
		));
	}

	#[test]
	fn explicit_ethnicity_overrides_distribution() {
		let store = store();
		let request = GenerateRequest::new(5)
			.with_ethnicity(Ethnicity::Asian)
			.with_distribution(EthnicDistribution::us_default())
			.with_seed(2);
		let names = Generator::new(&store).generate(&request).unwrap();
		assert!(names.iter().all(|n| n.to_string() == "Wei Wang"));
	}
}
