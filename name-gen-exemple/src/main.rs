use std::path::Path;
use std::process::ExitCode;

use log::error;
use name_gen_core::model::generator::Generator;
use name_gen_core::model::request::{EthnicDistribution, GenerateRequest};
use name_gen_core::store::record::{Ethnicity, Gender, NameEntry};
use name_gen_core::store::{NameStore, Table};
use name_gen_core::GeneratorError;

/// Process exit code for each error kind
fn exit_code(e: &GeneratorError) -> u8 {
    match e {
        GeneratorError::StoreUnavailable { .. } | GeneratorError::SchemaMismatch { .. } => 2,
        GeneratorError::NoCandidates { .. } => 3,
        GeneratorError::InvalidRequest(_) => 64,
        GeneratorError::InvalidWeights(_) => 70,
    }
}

/// Prints `NoCandidates` and goes on with an empty result; other errors stop the demo
fn or_empty<T>(result: Result<Vec<T>, GeneratorError>) -> Result<Vec<T>, GeneratorError> {
    match result {
        Err(e @ GeneratorError::NoCandidates { .. }) => {
            println!("{}", e);
            Ok(Vec::new())
        }
        other => other,
    }
}

/// Runs every demo request against `store`.
fn demo(store: &NameStore) -> Result<(), GeneratorError> {
    println!(
        "Loaded {} first names and {} surnames",
        store.len(Table::FirstNames),
        store.len(Table::Surnames)
    );

    let generator = Generator::new(store);

    // Dataverse tab files carry no gender column
    // Only ask for a gender if the store actually knows some
    let gendered = store.first_names().iter().any(|n| n.gender().is_some());
    if !gendered {
        println!("No gendered first names, gender filters are skipped");
    }

    // Unconditioned request: names are drawn proportionally to their counts
    // A seed makes the output reproducible
    let request = GenerateRequest::new(5).with_seed(42);
    for name in generator.generate(&request)? {
        println!("{}", name);
    }

    // Conditioned request: only names with P(hispanic) >= 0.6 are kept,
    // weighted by P(hispanic)
    let mut request = GenerateRequest::new(5).with_ethnicity(Ethnicity::Hispanic);
    if gendered {
        request = request.with_gender(Gender::Female);
    }
    request.set_min_probability(0.6)?;
    for name in or_empty(generator.generate(&request))? {
        println!("{} ({}, hispanic {})", name, name.dominant_ethnicity, name.probabilities.hispanic);
    }

    // Invalid thresholds are rejected
    match request.set_min_probability(1.5) {
        Ok(_) => println!("Should not happen"),
        Err(e) => println!("{}", e),
    }

    // A threshold nobody reaches gives NoCandidates, not an empty list
    let mut strict = GenerateRequest::new(3).with_ethnicity(Ethnicity::Other);
    strict.set_min_probability(0.99)?;
    or_empty(generator.generate(&strict))?;

    // Mixed request: each name first draws an ethnicity from the distribution
    // Intensities are not normalized; shares are computed from them
    let mut distribution = EthnicDistribution::us_default();
    distribution.set_intensity(Ethnicity::Asian, 0.30)?;
    for (ethnicity, share) in distribution.shares() {
        println!("{}: {:.3}", ethnicity, share);
    }
    let request = GenerateRequest::new(10).with_distribution(distribution);
    for name in or_empty(generator.generate(&request))? {
        println!("{}", name);
    }

    // First names only
    let mut request = GenerateRequest::new(5);
    if gendered {
        request = request.with_gender(Gender::Male);
    }
    for first_name in or_empty(generator.generate_first_names(&request))? {
        println!("{}", first_name.name());
    }

    Ok(())
}

fn run() -> Result<(), GeneratorError> {
    // Load the name tables from the "data" directory (tab files)
    // A .bin cache is written next to each file and reused while it is newer
    // Fall back to a SQLite database if there is no "data" directory
    let path = if Path::new("./data").is_dir() { "./data" } else { "names.db" };
    let store = NameStore::open(path)?;
    demo(&store)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}
