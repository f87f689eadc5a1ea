use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;

use log::{debug, warn};

use super::record::{Ethnicity, NameRow, Probabilities};
use super::{NameSource, Table};
use crate::error::{GeneratorError, Result};
use crate::io::{build_output_path, is_up_to_date, read_file, title_case};

/// Count assigned to rows when the tab file has no `count` column.
///
/// The Dataverse race-probability files only publish probabilities, so
/// every name gets the same population weight.
pub const DEFAULT_TAB_COUNT: i64 = 100;

/// Reads name tables from Dataverse tab-separated files.
///
/// The directory must contain `first_names.tab` and `surnames.tab`, each
/// with a header row naming at least `name`, `whi`, `bla`, `his`, `asi`
/// and `oth`. Optional `count` and `gender` columns are honoured.
///
/// Parsed tables are cached beside their source as postcard `.bin` files
/// and reused while they are not older than the `.tab` file.
pub struct TabFileSource {
	dir: PathBuf,
}

/// Column positions resolved from a header row.
#[derive(Clone, Copy, Debug)]
struct Columns {
	name: usize,
	count: Option<usize>,
	gender: Option<usize>,
	probabilities: [usize; 5],
}

impl Columns {
	fn from_header(table: Table, header: &str) -> Result<Self> {
		let headers: Vec<String> = header
			.split('\t')
			.map(|h| clean_cell(h).to_lowercase())
			.collect();
		let find = |column: &str| headers.iter().position(|h| h == column);
		let require = |column: &str| {
			find(column).ok_or_else(|| GeneratorError::schema(table, format!("missing column '{}'", column)))
		};

		let mut probabilities = [0; 5];
		for (slot, ethnicity) in probabilities.iter_mut().zip(Ethnicity::ALL) {
			*slot = require(ethnicity.tab_column())?;
		}

		Ok(Self {
			name: require("name")?,
			count: find("count"),
			gender: if table.carries_gender() { find("gender") } else { None },
			probabilities,
		})
	}

	/// Parses one data line. Returns `None` for rows with a blank name.
	fn parse(&self, table: Table, line_number: usize, line: &str) -> Result<Option<NameRow>> {
		let cells: Vec<&str> = line.split('\t').collect();
		let cell = |index: usize| {
			cells.get(index).map(|c| clean_cell(c)).ok_or_else(|| {
				GeneratorError::schema(table, format!("line {}: expected at least {} fields", line_number, index + 1))
			})
		};

		let name = title_case(cell(self.name)?);
		if name.is_empty() {
			return Ok(None);
		}

		let count = match self.count {
			Some(index) => {
				let raw = cell(index)?;
				raw.parse::<i64>().map_err(|_| {
					GeneratorError::schema(table, format!("line {}: count '{}' is not an integer", line_number, raw))
				})?
			}
			None => DEFAULT_TAB_COUNT,
		};

		let gender = match self.gender {
			Some(index) => Some(cell(index)?.to_owned()).filter(|g| !g.is_empty()),
			None => None,
		};

		let mut values = [0.0; 5];
		for ((value, index), ethnicity) in values.iter_mut().zip(self.probabilities).zip(Ethnicity::ALL) {
			let raw = cell(index)?;
			*value = raw.parse::<f64>().map_err(|_| {
				GeneratorError::schema(
					table,
					format!("line {}: column '{}' is not numeric: '{}'", line_number, ethnicity.tab_column(), raw),
				)
			})?;
		}

		Ok(Some(NameRow {
			name,
			gender,
			count,
			probabilities: Probabilities::from_array(values),
		}))
	}
}

fn clean_cell(cell: &str) -> &str {
	cell.trim().trim_matches('"').trim()
}

impl TabFileSource {
	pub fn new<P: AsRef<Path>>(dir: P) -> Self {
		Self { dir: dir.as_ref().to_path_buf() }
	}

	/// Location of the tab file backing `table`.
	pub fn table_path(&self, table: Table) -> PathBuf {
		self.dir.join(format!("{}.tab", table.name()))
	}

	fn read_cache(binary_path: &Path) -> Option<Vec<NameRow>> {
		let bytes = std::fs::read(binary_path).ok()?;
		match postcard::from_bytes(&bytes) {
			Ok(rows) => Some(rows),
			Err(e) => {
				warn!("Ignoring unreadable cache {}: {}", binary_path.display(), e);
				None
			}
		}
	}

	fn write_cache(binary_path: &Path, rows: &Vec<NameRow>) {
		let written = postcard::to_stdvec(rows)
			.map_err(|e| e.to_string())
			.and_then(|bytes| std::fs::write(binary_path, bytes).map_err(|e| e.to_string()));
		if let Err(e) = written {
			warn!("Failed to write cache {}: {}", binary_path.display(), e);
		}
	}

	/// Reads a tab file, splits its lines into chunks, parses the chunks in
	/// parallel and reassembles the rows in file order.
	///
	/// # Errors
	/// - `StoreUnavailable` if the file cannot be read.
	/// - `SchemaMismatch` for a missing column or malformed cell; when several
	///   lines are malformed the earliest one is reported.
	fn parse_file(&self, table: Table, path: &Path) -> Result<Vec<NameRow>> {
		let lines = read_file(path)
			.map_err(|e| GeneratorError::unavailable(format!("tab:{}", path.display()), e))?;

		let Some((header, body)) = lines.split_first() else {
			return Err(GeneratorError::schema(table, "file is empty"));
		};
		let columns = Columns::from_header(table, header)?;

		let cpus = num_cpus::get();
		let factor = 8;
		let chunks = cpus * factor;
		let chunk_size = ((body.len() + chunks - 1) / chunks).max(1);

		let (tx, rx) = mpsc::channel();
		let mut nb_chunks = 0;
		for (chunk_index, chunk) in body.chunks(chunk_size).enumerate() {
			let tx = tx.clone();
			let chunk: Vec<String> = chunk.to_vec();
			// Header is line 1
			let first_line = chunk_index * chunk_size + 2;
			nb_chunks += 1;

			thread::spawn(move || {
				let mut rows = Vec::with_capacity(chunk.len());
				let mut outcome = Ok(());
				for (offset, line) in chunk.iter().enumerate() {
					if line.trim().is_empty() {
						continue;
					}
					match columns.parse(table, first_line + offset, line) {
						Ok(Some(row)) => rows.push(row),
						Ok(None) => (),
						Err(e) => {
							outcome = Err(e);
							break;
						}
					}
				}
				// The receiver outlives every sender
				let _ = tx.send((chunk_index, outcome.map(|_| rows)));
			});
		}
		drop(tx);

		let mut parts: Vec<Option<Result<Vec<NameRow>>>> = (0..nb_chunks).map(|_| None).collect();
		for (chunk_index, part) in rx.iter() {
			parts[chunk_index] = Some(part);
		}

		let mut rows = Vec::with_capacity(body.len());
		for part in parts {
			match part {
				Some(part) => rows.extend(part?),
				None => {
					return Err(GeneratorError::unavailable(
						format!("tab:{}", path.display()),
						"a parsing worker stopped unexpectedly",
					));
				}
			}
		}
		Ok(rows)
	}
}

impl NameSource for TabFileSource {
	fn describe(&self) -> String {
		format!("tab:{}", self.dir.display())
	}

	fn load(&self, table: Table) -> Result<Vec<NameRow>> {
		let path = self.table_path(table);
		if !path.is_file() {
			return Err(GeneratorError::unavailable(
				self.describe(),
				format!("{} not found", path.display()),
			));
		}

		let binary_path = build_output_path(&path, "bin")
			.map_err(|e| GeneratorError::unavailable(self.describe(), e))?;
		if is_up_to_date(&binary_path, &path) {
			if let Some(rows) = Self::read_cache(&binary_path) {
				debug!("Loaded {} {} rows from cache {}", rows.len(), table, binary_path.display());
				return Ok(rows);
			}
		}

		let rows = self.parse_file(table, &path)?;
		debug!("Parsed {} {} rows from {}", rows.len(), table, path.display());
		Self::write_cache(&binary_path, &rows);
		Ok(rows)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	const HEADER: &str = "name\twhi\tbla\this\tasi\toth";

	fn write(dir: &TempDir, table: Table, contents: &str) {
		std::fs::write(dir.path().join(format!("{}.tab", table.name())), contents).unwrap();
	}

	#[test]
	fn parses_rows_with_default_count_and_title_case() {
		let dir = TempDir::new().unwrap();
		write(&dir, Table::Surnames, &format!("{HEADER}\n\"GARCIA\"\t0.05\t0.03\t0.85\t0.05\t0.02\n\"\"\t0.2\t0.2\t0.2\t0.2\t0.2\n"));

		let rows = TabFileSource::new(dir.path()).load(Table::Surnames).unwrap();
		assert_eq!(rows.len(), 1);
		assert_eq!(rows[0].name, "Garcia");
		assert_eq!(rows[0].count, DEFAULT_TAB_COUNT);
		assert_eq!(rows[0].probabilities.hispanic, 0.85);
	}

	#[test]
	fn honours_optional_count_and_gender_columns() {
		let dir = TempDir::new().unwrap();
		write(
			&dir,
			Table::FirstNames,
			"name\tgender\tcount\twhi\tbla\this\tasi\toth\nmaria\tF\t10000\t0.10\t0.05\t0.75\t0.08\t0.02\n",
		);
		let rows = TabFileSource::new(dir.path()).load(Table::FirstNames).unwrap();
		assert_eq!(rows[0].gender.as_deref(), Some("F"));
		assert_eq!(rows[0].count, 10_000);
	}

	#[test]
	fn writes_and_reuses_cache() {
		let dir = TempDir::new().unwrap();
		write(&dir, Table::Surnames, &format!("{HEADER}\nsmith\t0.7\t0.2\t0.05\t0.03\t0.02\n"));
		let source = TabFileSource::new(dir.path());

		let first = source.load(Table::Surnames).unwrap();
		assert!(dir.path().join("surnames.bin").is_file());
		let second = source.load(Table::Surnames).unwrap();
		assert_eq!(first, second);
	}

	#[test]
	fn corrupt_cache_is_rebuilt() {
		let dir = TempDir::new().unwrap();
		write(&dir, Table::Surnames, &format!("{HEADER}\nsmith\t0.7\t0.2\t0.05\t0.03\t0.02\n"));
		std::fs::write(dir.path().join("surnames.bin"), [0xff, 0xff, 0xff]).unwrap();

		let rows = TabFileSource::new(dir.path()).load(Table::Surnames).unwrap();
		assert_eq!(rows[0].name, "Smith");
	}

	#[test]
	fn preserves_file_order_across_chunks() {
		let dir = TempDir::new().unwrap();
		let mut contents = format!("{HEADER}\n");
		for i in 0..2_000 {
			contents.push_str(&format!("name{}\t0.2\t0.2\t0.2\t0.2\t0.2\n", i));
		}
		write(&dir, Table::Surnames, &contents);

		let rows = TabFileSource::new(dir.path()).load(Table::Surnames).unwrap();
		assert_eq!(rows.len(), 2_000);
		for (i, row) in rows.iter().enumerate() {
			assert_eq!(row.name, format!("Name{}", i));
		}
	}

	#[test]
	fn missing_column_is_schema_mismatch() {
		let dir = TempDir::new().unwrap();
		write(&dir, Table::Surnames, "name\twhi\tbla\nsmith\t0.7\t0.2\n");
		assert!(matches!(
			TabFileSource::new(dir.path()).load(Table::Surnames),
			Err(GeneratorError::SchemaMismatch { .. })
		));
	}

	#[test]
	fn non_numeric_cell_reports_line() {
		let dir = TempDir::new().unwrap();
		write(&dir, Table::Surnames, &format!("{HEADER}\nsmith\t0.7\t0.2\t0.05\t0.03\t0.02\njones\tn/a\t0.2\t0.05\t0.03\t0.02\n"));
		match TabFileSource::new(dir.path()).load(Table::Surnames) {
			Err(GeneratorError::SchemaMismatch { reason, .. }) => assert!(reason.contains("line 3")),
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[test]
	fn missing_file_is_unavailable() {
		let dir = TempDir::new().unwrap();
		assert!(matches!(
			TabFileSource::new(dir.path()).load(Table::FirstNames),
			Err(GeneratorError::StoreUnavailable { .. })
		));
	}
}
