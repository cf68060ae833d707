mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, Conversation, EmbeddingProviderConfig, GeneratorProviderConfig, Orchestrator,
	Providers, Qdrant, RerankProviderConfig, Retrieval, Service, Storage,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.storage.qdrant.url.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.qdrant.url must be non-empty.".to_string(),
		});
	}
	if cfg.storage.qdrant.collection.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.qdrant.collection must be non-empty.".to_string(),
		});
	}
	if cfg.storage.qdrant.vector_dim == 0 {
		return Err(Error::Validation {
			message: "storage.qdrant.vector_dim must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.storage.qdrant.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.qdrant.vector_dim."
				.to_string(),
		});
	}
	if !cfg.providers.generator.temperature.is_finite()
		|| cfg.providers.generator.temperature < 0.0
	{
		return Err(Error::Validation {
			message: "providers.generator.temperature must be zero or greater.".to_string(),
		});
	}
	if !cfg.providers.generator.refine_temperature.is_finite()
		|| cfg.providers.generator.refine_temperature < 0.0
	{
		return Err(Error::Validation {
			message: "providers.generator.refine_temperature must be zero or greater.".to_string(),
		});
	}

	for (name, timeout_ms) in [
		("storage.qdrant", cfg.storage.qdrant.timeout_ms),
		("providers.embedding", cfg.providers.embedding.timeout_ms),
		("providers.rerank", cfg.providers.rerank.timeout_ms),
		("providers.generator", cfg.providers.generator.timeout_ms),
	] {
		if timeout_ms == 0 {
			return Err(Error::Validation {
				message: format!("{name}.timeout_ms must be greater than zero."),
			});
		}
	}

	if cfg.retrieval.k == 0 {
		return Err(Error::Validation {
			message: "retrieval.k must be greater than zero.".to_string(),
		});
	}
	if cfg.retrieval.comprehensive_k < cfg.retrieval.k {
		return Err(Error::Validation {
			message: "retrieval.comprehensive_k must be at least retrieval.k.".to_string(),
		});
	}
	if cfg.retrieval.final_k == 0 {
		return Err(Error::Validation {
			message: "retrieval.final_k must be greater than zero.".to_string(),
		});
	}
	if cfg.retrieval.comprehensive_final_k < cfg.retrieval.final_k {
		return Err(Error::Validation {
			message: "retrieval.comprehensive_final_k must be at least retrieval.final_k."
				.to_string(),
		});
	}
	if cfg.retrieval.rerank_top_k == 0 {
		return Err(Error::Validation {
			message: "retrieval.rerank_top_k must be greater than zero.".to_string(),
		});
	}
	if cfg.retrieval.comprehensive_rerank_top_k < cfg.retrieval.rerank_top_k {
		return Err(Error::Validation {
			message:
				"retrieval.comprehensive_rerank_top_k must be at least retrieval.rerank_top_k."
					.to_string(),
		});
	}

	if cfg.orchestrator.max_attempts == 0 {
		return Err(Error::Validation {
			message: "orchestrator.max_attempts must be greater than zero.".to_string(),
		});
	}
	if cfg.orchestrator.max_sub_queries == 0 {
		return Err(Error::Validation {
			message: "orchestrator.max_sub_queries must be greater than zero.".to_string(),
		});
	}

	if cfg.conversation.recent_window == 0 {
		return Err(Error::Validation {
			message: "conversation.recent_window must be greater than zero.".to_string(),
		});
	}
	if cfg.conversation.max_history_turns < cfg.conversation.recent_window {
		return Err(Error::Validation {
			message: "conversation.max_history_turns must be at least conversation.recent_window."
				.to_string(),
		});
	}
	if cfg.conversation.max_conversations == 0 {
		return Err(Error::Validation {
			message: "conversation.max_conversations must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.service.log_level.trim().is_empty() {
		cfg.service.log_level = "info".to_string();
	}
}
