use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	pub retrieval: Retrieval,
	pub orchestrator: Orchestrator,
	pub conversation: Conversation,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
	pub qdrant: Qdrant,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub collection: String,
	pub vector_dim: u32,
	pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub rerank: RerankProviderConfig,
	pub generator: GeneratorProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RerankProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub timeout_ms: u64,
	pub default_headers: Map<String, Value>,
	#[serde(default = "default_rerank_enabled")]
	pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	#[serde(default = "default_refine_temperature")]
	pub refine_temperature: f32,
	pub timeout_ms: u64,
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Retrieval {
	/// Nearest-neighbor budget for each sub-query search.
	pub k: u32,
	pub comprehensive_k: u32,
	/// Cap on the merged result list after cross-search aggregation.
	pub final_k: u32,
	pub comprehensive_final_k: u32,
	pub rerank_top_k: u32,
	pub comprehensive_rerank_top_k: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Orchestrator {
	pub max_attempts: u32,
	pub max_sub_queries: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Conversation {
	pub max_history_turns: u32,
	/// Turns kept verbatim at the tail of a compacted context.
	pub recent_window: u32,
	pub max_conversations: u32,
}

fn default_rerank_enabled() -> bool {
	true
}

fn default_refine_temperature() -> f32 {
	0.3
}
