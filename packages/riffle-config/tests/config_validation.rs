use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::Value;

use riffle_config::{Config, Error};

const SAMPLE_CONFIG_TOML: &str = include_str!("fixtures/sample_config.toml");

static COUNTER: AtomicU64 = AtomicU64::new(0);

fn sample_config() -> Config {
	toml::from_str(SAMPLE_CONFIG_TOML).expect("Failed to parse sample config.")
}

fn sample_toml_with<F>(mutate: F) -> String
where
	F: FnOnce(&mut toml::Table),
{
	let mut value: Value =
		toml::from_str(SAMPLE_CONFIG_TOML).expect("Failed to parse sample config.");
	let root = value.as_table_mut().expect("Sample config must be a table.");

	mutate(root);

	toml::to_string(&value).expect("Failed to render sample config.")
}

fn set(root: &mut toml::Table, section: &str, key: &str, value: Value) {
	let table = root
		.get_mut(section)
		.and_then(Value::as_table_mut)
		.unwrap_or_else(|| panic!("Sample config must include [{section}]."));

	table.insert(key.to_string(), value);
}

fn write_temp_config(payload: String) -> PathBuf {
	let nanos =
		SystemTime::now().duration_since(UNIX_EPOCH).expect("Clock went backwards.").as_nanos();
	let unique = COUNTER.fetch_add(1, Ordering::SeqCst);
	let path = env::temp_dir().join(format!("riffle_config_{nanos}_{unique}.toml"));

	fs::write(&path, payload).expect("Failed to write temp config.");

	path
}

fn load_error(payload: String) -> Error {
	let path = write_temp_config(payload);
	let result = riffle_config::load(&path);
	let _ = fs::remove_file(&path);

	result.expect_err("Expected config load to fail.")
}

#[test]
fn sample_config_is_valid() {
	let path = write_temp_config(SAMPLE_CONFIG_TOML.to_string());
	let result = riffle_config::load(&path);
	let _ = fs::remove_file(&path);

	assert!(result.is_ok());
}

#[test]
fn embedding_dimensions_must_match_vector_dim() {
	let payload = sample_toml_with(|root| {
		let providers = root
			.get_mut("providers")
			.and_then(Value::as_table_mut)
			.expect("Sample config must include [providers].");

		set(providers, "embedding", "dimensions", Value::Integer(768));
	});
	let err = load_error(payload);

	assert!(
		err.to_string()
			.contains("providers.embedding.dimensions must match storage.qdrant.vector_dim.")
	);
}

#[test]
fn retrieval_budgets_must_be_positive() {
	let payload = sample_toml_with(|root| set(root, "retrieval", "k", Value::Integer(0)));
	let err = load_error(payload);

	assert!(err.to_string().contains("retrieval.k must be greater than zero."));
}

#[test]
fn comprehensive_k_cannot_undercut_k() {
	let payload =
		sample_toml_with(|root| set(root, "retrieval", "comprehensive_k", Value::Integer(4)));
	let err = load_error(payload);

	assert!(err.to_string().contains("retrieval.comprehensive_k must be at least retrieval.k."));
}

#[test]
fn max_attempts_must_be_positive() {
	let payload =
		sample_toml_with(|root| set(root, "orchestrator", "max_attempts", Value::Integer(0)));
	let err = load_error(payload);

	assert!(err.to_string().contains("orchestrator.max_attempts must be greater than zero."));
}

#[test]
fn history_must_cover_recent_window() {
	let payload =
		sample_toml_with(|root| set(root, "conversation", "max_history_turns", Value::Integer(3)));
	let err = load_error(payload);

	assert!(err.to_string().contains(
		"conversation.max_history_turns must be at least conversation.recent_window."
	));
}

#[test]
fn provider_timeouts_must_be_positive() {
	let payload = sample_toml_with(|root| {
		let providers = root
			.get_mut("providers")
			.and_then(Value::as_table_mut)
			.expect("Sample config must include [providers].");

		set(providers, "generator", "timeout_ms", Value::Integer(0));
	});
	let err = load_error(payload);

	assert!(err.to_string().contains("providers.generator.timeout_ms must be greater than zero."));
}

#[test]
fn refine_temperature_defaults_when_absent() {
	let payload = sample_toml_with(|root| {
		let providers = root
			.get_mut("providers")
			.and_then(Value::as_table_mut)
			.expect("Sample config must include [providers].");
		let generator = providers
			.get_mut("generator")
			.and_then(Value::as_table_mut)
			.expect("Sample config must include [providers.generator].");

		generator.remove("refine_temperature");
	});
	let path = write_temp_config(payload);
	let cfg = riffle_config::load(&path).expect("Expected config load to succeed.");
	let _ = fs::remove_file(&path);

	assert!((cfg.providers.generator.refine_temperature - 0.3).abs() < f32::EPSILON);
}

#[test]
fn validate_accepts_programmatic_config() {
	let cfg = sample_config();

	assert!(riffle_config::validate(&cfg).is_ok());
}
