use std::env;
use std::path::PathBuf;

use actix_cors::Cors;
use actix_web::{get, web, App, HttpResponse, HttpServer, Responder};
use log::{error, info, warn};

use serde::{Deserialize, Serialize};
use name_gen_core::model::generator::Generator;
use name_gen_core::model::request::{EthnicDistribution, GenerateRequest};
use name_gen_core::store::record::{Ethnicity, Gender, NameEntry, Probabilities};
use name_gen_core::store::{NameStore, Table};
use name_gen_core::GeneratorError;

/// Server settings, read from the environment.
///
/// - `NAME_GEN_DATA`: SQLite file or directory of tab files (default `./data`)
/// - `NAME_GEN_ADDR`: bind address (default `127.0.0.1:5000`)
/// - `NAME_GEN_MAX_COUNT`: largest accepted `count` (default `10000`)
#[derive(Debug, Clone)]
struct ServerConfig {
	data_path: PathBuf,
	address: String,
	max_count: usize,
}

impl ServerConfig {
	const DEFAULT_DATA: &'static str = "./data";
	const DEFAULT_ADDRESS: &'static str = "127.0.0.1:5000";
	const DEFAULT_MAX_COUNT: usize = 10_000;

	fn from_env() -> Self {
		let max_count = match env::var("NAME_GEN_MAX_COUNT") {
			Ok(value) => value.parse().unwrap_or_else(|_| {
				warn!("Ignoring invalid NAME_GEN_MAX_COUNT '{}'", value);
				Self::DEFAULT_MAX_COUNT
			}),
			Err(_) => Self::DEFAULT_MAX_COUNT,
		};
		Self {
			data_path: env::var("NAME_GEN_DATA").unwrap_or_else(|_| Self::DEFAULT_DATA.to_owned()).into(),
			address: env::var("NAME_GEN_ADDR").unwrap_or_else(|_| Self::DEFAULT_ADDRESS.to_owned()),
			max_count,
		}
	}
}

/// Struct representing query parameters for the `/v1/generate` endpoint
#[derive(Deserialize)]
struct GenerateParams {
	count: Option<i64>,
	ethnicity: Option<String>, // -> white, black, hispanic, asian, other or any
	gender: Option<String>,    // -> m, male, f, female or any
	min_probability: Option<f64>,
	seed: Option<u64>,
	first_only: Option<bool>,
	mix: Option<bool>
}

/// First-name-only entry of a `/v1/generate` response.
#[derive(Serialize)]
struct FirstNameResponse<'a> {
	first_name: &'a str,
	gender: Option<Gender>,
	ethnicity_probabilities: &'a Probabilities,
	dominant_ethnicity: Ethnicity,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct TablesResponse {
	first_names: usize,
	surnames: usize,
}

struct SharedData {
	store: NameStore,
	max_count: usize,
}

/// Treats a missing value or `"any"` as unspecified.
fn parse_optional<T>(value: &Option<String>) -> Result<Option<T>, GeneratorError>
where
	T: std::str::FromStr<Err = GeneratorError>,
{
	match value.as_deref().map(str::trim) {
		None | Some("") => Ok(None),
		Some(s) if s.eq_ignore_ascii_case("any") => Ok(None),
		Some(s) => s.parse().map(Some),
	}
}

impl GenerateParams {
	/// Builds a generation request from the query, applying defaults.
	fn request(&self, max_count: usize) -> Result<GenerateRequest, GeneratorError> {
		let count = GenerateRequest::parse_count(self.count.unwrap_or(1))?;
		if count > max_count {
			return Err(GeneratorError::InvalidRequest(format!(
				"count must be at most {}, got {}",
				max_count, count
			)));
		}

		let mut request = GenerateRequest::new(count);
		request.ethnicity = parse_optional::<Ethnicity>(&self.ethnicity)?;
		request.gender = parse_optional::<Gender>(&self.gender)?;
		request.seed = self.seed;
		if let Some(min_probability) = self.min_probability {
			request.set_min_probability(min_probability)?;
		}
		if self.mix.unwrap_or(false) {
			request.distribution = Some(EthnicDistribution::us_default());
		}
		Ok(request)
	}
}

/// Maps pipeline errors to HTTP responses.
fn error_response(e: GeneratorError) -> HttpResponse {
	match e {
		GeneratorError::InvalidRequest(_) => HttpResponse::BadRequest().body(e.to_string()),
		GeneratorError::NoCandidates { .. } => HttpResponse::NotFound().body(format!("{}; try a lower min_probability", e)),
		GeneratorError::StoreUnavailable { .. } => HttpResponse::ServiceUnavailable().body(e.to_string()),
		GeneratorError::SchemaMismatch { .. } | GeneratorError::InvalidWeights(_) => {
			error!("{}", e);
			HttpResponse::InternalServerError().body(e.to_string())
		}
	}
}

/// HTTP GET endpoint `/v1/generate`
///
/// Generates names from the shared store based on query parameters.
/// Each request draws from its own random stream.
#[get("/v1/generate")]
async fn get_generated(data: web::Data<SharedData>, query: web::Query<GenerateParams>) -> impl Responder {
	let request = match query.request(data.max_count) {
		Ok(r) => r,
		Err(e) => return error_response(e)
	};

	let generator = Generator::new(&data.store);
	if query.first_only.unwrap_or(false) {
		match generator.generate_first_names(&request) {
			Ok(names) => {
				let body: Vec<FirstNameResponse> = names
					.iter()
					.map(|n| FirstNameResponse {
						first_name: n.name(),
						gender: n.gender(),
						ethnicity_probabilities: n.probabilities(),
						dominant_ethnicity: n.probabilities().dominant(),
					})
					.collect();
				HttpResponse::Ok().json(body)
			}
			Err(e) => error_response(e),
		}
	} else {
		match generator.generate(&request) {
			Ok(names) => HttpResponse::Ok().json(names),
			Err(e) => error_response(e),
		}
	}
}

#[get("/v1/ethnicities")]
async fn get_ethnicities() -> impl Responder {
	HttpResponse::Ok().json(Ethnicity::ALL)
}

#[get("/v1/tables")]
async fn get_tables(data: web::Data<SharedData>) -> impl Responder {
	HttpResponse::Ok().json(TablesResponse {
		first_names: data.store.len(Table::FirstNames),
		surnames: data.store.len(Table::Surnames),
	})
}

/// Main entry point for the server.
///
/// Loads the name store once, shares it read-only between workers and
/// starts an Actix-web HTTP server.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

	let config = ServerConfig::from_env();
	let store = match NameStore::open(&config.data_path) {
		Ok(store) => store,
		Err(e) => {
			error!("{}", e);
			return Err(std::io::Error::other(e));
		}
	};

	let shared_data = web::Data::new(SharedData {
		store,
		max_count: config.max_count,
	});

	info!("Listening on {}", config.address);
	HttpServer::new(move || {
		App::new()
			.wrap(Cors::default().allow_any_origin().allowed_methods(vec!["GET"]))
			.app_data(shared_data.clone())
			.service(get_generated)
			.service(get_ethnicities)
			.service(get_tables)
	})
		.bind(config.address.as_str())?
		.run()
		.await
}
