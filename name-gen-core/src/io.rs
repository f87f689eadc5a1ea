use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::io;

/// Reads a text file and returns all its lines as a `Vec<String>`.
///
/// - Reads the entire file into memory
/// - Splits on `\n` / `\r\n`
pub(crate) fn read_file<P: AsRef<Path>>(filename: P) -> io::Result<Vec<String>> {
	let mut contents = String::new();
	File::open(filename)?.read_to_string(&mut contents)?;
	Ok(contents.lines().map(str::to_owned).collect())
}

/// Builds an output path based on an input path and a new extension.
///
/// Example:
/// `data/surnames.tab` + `"bin"` → `data/surnames.bin`
pub(crate) fn build_output_path<P: AsRef<Path>>(
	input_path: P,
	output_extension: &str,
) -> io::Result<PathBuf> {
	let input_path = input_path.as_ref();

	let parent = input_path.parent().unwrap_or_else(|| Path::new("."));
	let file_stem = input_path
		.file_stem()
		.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Input path has no filename"))?;

	let mut output = PathBuf::from(parent);
	output.push(file_stem);
	output.set_extension(output_extension);

	Ok(output)
}

/// Returns `true` if `derived` exists and was modified no earlier than `source`.
///
/// Any metadata failure counts as stale.
pub(crate) fn is_up_to_date<P: AsRef<Path>, Q: AsRef<Path>>(derived: P, source: Q) -> bool {
	let modified = |path: &Path| path.metadata().and_then(|m| m.modified()).ok();
	match (modified(derived.as_ref()), modified(source.as_ref())) {
		(Some(derived), Some(source)) => derived >= source,
		_ => false,
	}
}

/// Title-cases a name: first letter of every alphabetic run upper, the rest lower.
///
/// Examples:
/// - `"GARCIA"` → `"Garcia"`
/// - `"o'brien-smith"` → `"O'Brien-Smith"`
pub(crate) fn title_case(input: &str) -> String {
	let mut output = String::with_capacity(input.len());
	let mut previous_alphabetic = false;
	for c in input.chars() {
		if c.is_alphabetic() {
			if previous_alphabetic {
				output.extend(c.to_lowercase());
			} else {
				output.extend(c.to_uppercase());
			}
			previous_alphabetic = true;
		} else {
			output.push(c);
			previous_alphabetic = false;
		}
	}
	output
}
