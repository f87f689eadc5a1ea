//! Weighted synthetic name generation library.
//!
//! This crate draws full names from empirical first-name and surname tables:
//! - Unconditioned draws follow the population counts of the tables
//! - Ethnicity-conditioned draws keep names whose probability for that
//!   ethnicity meets a threshold, weighted by that probability
//! - First names can be restricted to a gender
//!
//! Tables are loaded once into a read-only [`store::NameStore`] (SQLite or
//! Dataverse tab files) and shared by every request.
//!
//! ```
//! use name_gen_core::model::generator::Generator;
//! use name_gen_core::model::request::GenerateRequest;
//! use name_gen_core::store::NameStore;
//! use name_gen_core::store::record::{FirstName, Gender, Probabilities, Surname};
//!
//! let store = NameStore::from_records(
//!     vec![FirstName::new("Wei", Some(Gender::Male), 3_000, Probabilities::from_array([0.05, 0.02, 0.03, 0.88, 0.02]))?],
//!     vec![Surname::new("Nguyen", 10, Probabilities::from_array([0.05, 0.0, 0.0, 0.9, 0.05]))?],
//! );
//! let names = Generator::new(&store).generate(&GenerateRequest::new(2).with_seed(7))?;
//! assert_eq!(names[0].to_string(), "Wei Nguyen");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Error taxonomy shared by the whole pipeline.
pub mod error;

/// Name store, record types and backing sources.
pub mod store;

/// Filtering, sampling and composition of names.
pub mod model;

/// I/O utilities (file loading, path helpers).
///
/// Not exposed
pub(crate) mod io;

pub use error::{GeneratorError, Result};
