use std::path::{Path, PathBuf};

use log::debug;
use rusqlite::types::Type;
use rusqlite::{Connection, ErrorCode, OpenFlags, Row};

use super::record::{Ethnicity, NameRow, Probabilities};
use super::{NameSource, Table};
use crate::error::{GeneratorError, Result};

/// Reads name tables from a SQLite database.
///
/// Expected schema:
/// - `first_names(name TEXT, gender TEXT, count INTEGER, prob_white REAL, ..., prob_other REAL)`
/// - `surnames(name TEXT, count INTEGER, prob_white REAL, ..., prob_other REAL)`
///
/// The database is opened read-only; the source never creates or migrates it.
pub struct SqliteSource {
	path: PathBuf,
}

impl SqliteSource {
	pub fn new<P: AsRef<Path>>(path: P) -> Self {
		Self { path: path.as_ref().to_path_buf() }
	}

	fn open(&self) -> Result<Connection> {
		Connection::open_with_flags(
			&self.path,
			OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
		)
		.map_err(|e| GeneratorError::unavailable(self.describe(), e))
	}

	fn select_statement(table: Table) -> String {
		let mut columns = vec!["name"];
		if table.carries_gender() {
			columns.push("gender");
		}
		columns.push("count");
		columns.extend(Ethnicity::ALL.iter().map(|e| e.sql_column()));
		format!("SELECT {} FROM {}", columns.join(", "), table.name())
	}

	/// Maps a query error to the store taxonomy.
	///
	/// Errors meaning "this is not a readable database" are availability
	/// problems; anything else (missing table, missing column) is schema.
	fn map_error(&self, table: Table, error: rusqlite::Error) -> GeneratorError {
		match error.sqlite_error_code() {
			Some(ErrorCode::NotADatabase)
			| Some(ErrorCode::CannotOpen)
			| Some(ErrorCode::PermissionDenied)
			| Some(ErrorCode::DatabaseCorrupt)
			| Some(ErrorCode::DatabaseBusy)
			| Some(ErrorCode::SystemIoFailure) => GeneratorError::unavailable(self.describe(), error),
			_ => GeneratorError::schema(table, error.to_string()),
		}
	}

	fn read_row(table: Table, row: &Row<'_>) -> rusqlite::Result<NameRow> {
		let mut index: usize = 0;
		let mut next = || {
			let current = index;
			index += 1;
			current
		};

		let name: String = row.get(next())?;
		let gender: Option<String> = if table.carries_gender() { row.get(next())? } else { None };
		let count: Option<i64> = row.get(next())?;

		let mut values = [0.0; 5];
		for value in values.iter_mut() {
			*value = row.get(next())?;
		}

		Ok(NameRow {
			name,
			gender,
			count: count.unwrap_or(0),
			probabilities: Probabilities::from_array(values),
		})
	}
}

impl NameSource for SqliteSource {
	fn describe(&self) -> String {
		format!("sqlite:{}", self.path.display())
	}

	fn load(&self, table: Table) -> Result<Vec<NameRow>> {
		let connection = self.open()?;
		let sql = Self::select_statement(table);
		debug!("{}", sql);

		let mut statement = connection.prepare(&sql).map_err(|e| self.map_error(table, e))?;
		let rows = statement
			.query_map([], |row| Self::read_row(table, row))
			.map_err(|e| self.map_error(table, e))?;

		let mut result = Vec::new();
		for row in rows {
			let row = row.map_err(|e| match e {
				rusqlite::Error::InvalidColumnType(index, column, Type::Null) => GeneratorError::schema(
					table,
					format!("column {} ('{}') holds NULL", index, column),
				),
				rusqlite::Error::InvalidColumnType(index, column, found) => GeneratorError::schema(
					table,
					format!("column {} ('{}') holds {} data", index, column, found),
				),
				other => self.map_error(table, other),
			})?;
			result.push(row);
		}
		Ok(result)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	fn create(dir: &TempDir, sql: &str) -> PathBuf {
		let path = dir.path().join("names.db");
		let connection = Connection::open(&path).unwrap();
		connection.execute_batch(sql).unwrap();
		path
	}

	const SCHEMA: &str = "
		CREATE TABLE first_names (name TEXT NOT NULL, gender TEXT, count INTEGER,
			prob_white REAL, prob_black REAL, prob_hispanic REAL, prob_asian REAL, prob_other REAL);
		CREATE TABLE surnames (name TEXT NOT NULL, count INTEGER,
			prob_white REAL, prob_black REAL, prob_hispanic REAL, prob_asian REAL, prob_other REAL);
	";

	#[test]
	fn reads_both_tables() {
		let dir = TempDir::new().unwrap();
		let path = create(&dir, &format!("{SCHEMA}
			INSERT INTO first_names VALUES ('Maria', 'F', 10000, 0.10, 0.05, 0.75, 0.08, 0.02);
			INSERT INTO first_names VALUES ('Sam', NULL, NULL, 0.5, 0.2, 0.1, 0.1, 0.1);
			INSERT INTO surnames VALUES ('Garcia', 20000, 0.05, 0.03, 0.85, 0.05, 0.02);
		"));
		let source = SqliteSource::new(&path);

		let first = source.load(Table::FirstNames).unwrap();
		assert_eq!(first.len(), 2);
		assert_eq!(first[0].gender.as_deref(), Some("F"));
		assert_eq!(first[0].probabilities.hispanic, 0.75);
		assert_eq!(first[1].gender, None);
		assert_eq!(first[1].count, 0);

		let surnames = source.load(Table::Surnames).unwrap();
		assert_eq!(surnames[0].name, "Garcia");
		assert_eq!(surnames[0].gender, None);
	}

	#[test]
	fn integer_probabilities_are_accepted() {
		let dir = TempDir::new().unwrap();
		let path = create(&dir, &format!("{SCHEMA}
			INSERT INTO surnames VALUES ('Nguyen', 10, 0, 0, 0, 1, 0);
		"));
		let rows = SqliteSource::new(&path).load(Table::Surnames).unwrap();
		assert_eq!(rows[0].probabilities.asian, 1.0);
	}

	#[test]
	fn missing_file_is_unavailable() {
		let dir = TempDir::new().unwrap();
		let source = SqliteSource::new(dir.path().join("absent.db"));
		assert!(matches!(
			source.load(Table::Surnames),
			Err(GeneratorError::StoreUnavailable { .. })
		));
	}

	#[test]
	fn non_database_file_is_unavailable() {
		let dir = TempDir::new().unwrap();
		let path = dir.path().join("names.db");
		std::fs::write(&path, "definitely not sqlite, just some text that is long enough to be read").unwrap();
		assert!(matches!(
			SqliteSource::new(&path).load(Table::Surnames),
			Err(GeneratorError::StoreUnavailable { .. })
		));
	}

	#[test]
	fn missing_column_is_schema_mismatch() {
		let dir = TempDir::new().unwrap();
		let path = create(&dir, "
			CREATE TABLE surnames (name TEXT, count INTEGER, prob_white REAL);
		");
		assert!(matches!(
			SqliteSource::new(&path).load(Table::Surnames),
			Err(GeneratorError::SchemaMismatch { table: Table::Surnames, .. })
		));
	}

	#[test]
	fn missing_table_is_schema_mismatch() {
		let dir = TempDir::new().unwrap();
		let path = create(&dir, "CREATE TABLE unrelated (id INTEGER);");
		assert!(matches!(
			SqliteSource::new(&path).load(Table::FirstNames),
			Err(GeneratorError::SchemaMismatch { table: Table::FirstNames, .. })
		));
	}

	#[test]
	fn textual_probability_is_schema_mismatch() {
		let dir = TempDir::new().unwrap();
		let path = create(&dir, &format!("{SCHEMA}
			INSERT INTO surnames VALUES ('Smith', 100, 'lots', 0.2, 0.05, 0.03, 0.02);
		"));
		assert!(matches!(
			SqliteSource::new(&path).load(Table::Surnames),
			Err(GeneratorError::SchemaMismatch { .. })
		));
	}
}
