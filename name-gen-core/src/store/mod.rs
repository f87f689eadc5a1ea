//! Read-only name store over the first-name and surname tables.
//!
//! Records are loaded once from a [`NameSource`], validated into typed
//! records and kept in memory for the lifetime of the store.

use std::fmt;
use std::path::Path;

use log::{debug, info, warn};

use crate::error::Result;

pub mod record;
pub mod sqlite;
pub mod tab_file;

use record::{FirstName, NameEntry, NameRow, Surname};
use sqlite::SqliteSource;
use tab_file::TabFileSource;

/// The two relations of the name model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Table {
	FirstNames,
	Surnames,
}

impl Table {
	/// Relation name, also used as the file stem of tab sources.
	pub fn name(self) -> &'static str {
		match self {
			Table::FirstNames => "first_names",
			Table::Surnames => "surnames",
		}
	}

	/// Whether rows of this table carry a gender tag.
	pub fn carries_gender(self) -> bool {
		matches!(self, Table::FirstNames)
	}
}

impl fmt::Display for Table {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

/// A backend able to read the raw rows of a table.
pub trait NameSource {
	/// Human-readable location, used in logs and errors.
	fn describe(&self) -> String;

	/// Reads every row of `table`.
	///
	/// # Errors
	/// - `StoreUnavailable` if the backend cannot be opened or read.
	/// - `SchemaMismatch` if columns are missing or malformed.
	fn load(&self, table: Table) -> Result<Vec<NameRow>>;
}

/// In-memory, immutable copy of both name tables.
///
/// # Invariants
/// - Every held record passed validation (non-blank name, probabilities in `[0, 1]`).
/// - Records are never mutated after construction, so a store can be
///   shared between threads without locking.
#[derive(Debug, Clone, Default)]
pub struct NameStore {
	first_names: Vec<FirstName>,
	surnames: Vec<Surname>,
}

impl NameStore {
	/// Opens a store from a path.
	///
	/// A directory is read as Dataverse tab files, anything else as a
	/// SQLite database.
	pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
		let path = path.as_ref();
		if path.is_dir() {
			Self::load(&TabFileSource::new(path))
		} else {
			Self::load(&SqliteSource::new(path))
		}
	}

	/// Loads both tables from `source`.
	///
	/// Invalid rows are logged and dropped; they never become candidates.
	///
	/// # Errors
	/// Propagates the source's `StoreUnavailable` / `SchemaMismatch`.
	pub fn load<S: NameSource + ?Sized>(source: &S) -> Result<Self> {
		let description = source.describe();
		debug!("Loading name store from {}", description);

		let first_names = Self::validate_rows::<FirstName>(source.load(Table::FirstNames)?);
		let surnames = Self::validate_rows::<Surname>(source.load(Table::Surnames)?);

		info!(
			"Loaded {} first names and {} surnames from {}",
			first_names.len(),
			surnames.len(),
			description
		);
		Ok(Self { first_names, surnames })
	}

	/// Builds a store from records already in memory.
	pub fn from_records(first_names: Vec<FirstName>, surnames: Vec<Surname>) -> Self {
		Self { first_names, surnames }
	}

	fn validate_rows<T: NameEntry>(rows: Vec<NameRow>) -> Vec<T> {
		let total = rows.len();
		let mut records = Vec::with_capacity(total);
		for row in rows {
			match T::from_row(row) {
				Ok(record) => records.push(record),
				Err(reason) => debug!("Skipping {} row: {}", T::TABLE, reason),
			}
		}
		let skipped = total - records.len();
		if skipped > 0 {
			warn!("Excluded {} invalid rows out of {} from {}", skipped, total, T::TABLE);
		}
		records
	}

	pub fn first_names(&self) -> &[FirstName] {
		&self.first_names
	}

	pub fn surnames(&self) -> &[Surname] {
		&self.surnames
	}

	/// Cached records of one table, selected by record type.
	///
	/// ```
	/// use name_gen_core::store::NameStore;
	/// use name_gen_core::store::record::Surname;
	///
	/// let store = NameStore::default();
	/// assert!(store.get::<Surname>().is_empty());
	/// ```
	pub fn get<T: NameEntry>(&self) -> &[T] {
		T::in_store(self)
	}

	/// Number of records held for `table`.
	pub fn len(&self, table: Table) -> usize {
		match table {
			Table::FirstNames => self.first_names.len(),
			Table::Surnames => self.surnames.len(),
		}
	}
}
