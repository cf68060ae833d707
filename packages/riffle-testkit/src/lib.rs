use std::{
	collections::VecDeque,
	sync::{
		Mutex,
		atomic::{AtomicUsize, Ordering},
	},
};

use color_eyre::eyre;
use serde_json::Map;

use riffle_config::{
	Config, Conversation, EmbeddingProviderConfig, GeneratorProviderConfig, Orchestrator,
	Providers, Qdrant, RerankProviderConfig, Retrieval, Service, Storage,
};
use riffle_service::{
	BoxFuture, EmbeddingProvider, GeneratorProvider, RerankProvider, VectorIndex,
};
use riffle_storage::models::{ChunkMeta, RetrievedChunk};

/// A complete valid config pointed at unreachable local endpoints. Tests
/// inject fakes for every collaborator, so nothing is ever dialed.
pub fn test_config() -> Config {
	Config {
		service: Service {
			http_bind: "127.0.0.1:8080".to_string(),
			log_level: "info".to_string(),
		},
		storage: Storage {
			qdrant: Qdrant {
				url: "http://127.0.0.1:6334".to_string(),
				collection: "doc_chunks_test".to_string(),
				vector_dim: 8,
				timeout_ms: 1_000,
			},
		},
		providers: Providers {
			embedding: EmbeddingProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://127.0.0.1:1".to_string(),
				api_key: "key".to_string(),
				path: "/v1/embeddings".to_string(),
				model: "test-embed".to_string(),
				dimensions: 8,
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
			rerank: RerankProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://127.0.0.1:1".to_string(),
				api_key: "key".to_string(),
				path: "/v1/rerank".to_string(),
				model: "test-rerank".to_string(),
				timeout_ms: 1_000,
				default_headers: Map::new(),
				enabled: true,
			},
			generator: GeneratorProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://127.0.0.1:1".to_string(),
				api_key: "key".to_string(),
				path: "/v1/chat/completions".to_string(),
				model: "test-generate".to_string(),
				temperature: 0.2,
				refine_temperature: 0.3,
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
		},
		retrieval: Retrieval {
			k: 8,
			comprehensive_k: 16,
			final_k: 8,
			comprehensive_final_k: 16,
			rerank_top_k: 5,
			comprehensive_rerank_top_k: 10,
		},
		orchestrator: Orchestrator { max_attempts: 3, max_sub_queries: 8 },
		conversation: Conversation {
			max_history_turns: 50,
			recent_window: 6,
			max_conversations: 100,
		},
	}
}

pub fn chunk(doc_id: &str, section: &str, text: &str, distance: f32) -> RetrievedChunk {
	RetrievedChunk {
		text: text.to_string(),
		meta: ChunkMeta {
			doc_id: doc_id.to_string(),
			section_path: vec![section.to_string()],
			section_path_str: section.to_string(),
			kind: "text".to_string(),
			has_code: false,
			commands: Vec::new(),
			start_line: 1,
			end_line: 5,
			step_no: None,
		},
		distance,
	}
}

/// Deterministic embedding from text bytes. Identical text always produces
/// the identical vector.
pub struct HashEmbedding;

impl EmbeddingProvider for HashEmbedding {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		let dim = (cfg.dimensions as usize).max(1);
		let vectors = texts
			.iter()
			.map(|text| {
				let mut vector = vec![0.0f32; dim];

				for (index, byte) in text.bytes().enumerate() {
					vector[(index + byte as usize) % dim] += 1.0;
				}

				vector
			})
			.collect();

		Box::pin(async move { Ok(vectors) })
	}
}

pub struct FailingEmbedding;

impl EmbeddingProvider for FailingEmbedding {
	fn embed<'a>(
		&'a self,
		_cfg: &'a EmbeddingProviderConfig,
		_texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		Box::pin(async move { Err(eyre::eyre!("embedding endpoint unreachable")) })
	}
}

/// Returns the same fixture hits for every search, truncated to `k`.
pub struct FixtureIndex {
	hits: Vec<RetrievedChunk>,
}

impl FixtureIndex {
	pub fn new(hits: Vec<RetrievedChunk>) -> Self {
		Self { hits }
	}

	pub fn empty() -> Self {
		Self { hits: Vec::new() }
	}
}

impl VectorIndex for FixtureIndex {
	fn search<'a>(
		&'a self,
		_vector: Vec<f32>,
		k: u32,
	) -> BoxFuture<'a, color_eyre::Result<Vec<RetrievedChunk>>> {
		let mut hits = self.hits.clone();

		hits.truncate(k as usize);

		Box::pin(async move { Ok(hits) })
	}
}

/// Replays one scripted result set per search call, in call order; once the
/// script runs out every further search returns nothing.
pub struct PlaybackIndex {
	responses: Mutex<VecDeque<Vec<RetrievedChunk>>>,
}

impl PlaybackIndex {
	pub fn new(responses: Vec<Vec<RetrievedChunk>>) -> Self {
		Self { responses: Mutex::new(responses.into()) }
	}
}

impl VectorIndex for PlaybackIndex {
	fn search<'a>(
		&'a self,
		_vector: Vec<f32>,
		_k: u32,
	) -> BoxFuture<'a, color_eyre::Result<Vec<RetrievedChunk>>> {
		let hits = {
			let mut guard = self.responses.lock().unwrap_or_else(|err| err.into_inner());

			guard.pop_front().unwrap_or_default()
		};

		Box::pin(async move { Ok(hits) })
	}
}

pub struct FailingIndex;

impl VectorIndex for FailingIndex {
	fn search<'a>(
		&'a self,
		_vector: Vec<f32>,
		_k: u32,
	) -> BoxFuture<'a, color_eyre::Result<Vec<RetrievedChunk>>> {
		Box::pin(async move { Err(eyre::eyre!("vector index unreachable")) })
	}
}

/// Returns the same fixed score list for every rerank call.
pub struct ScriptedRerank {
	scores: Vec<f32>,
}

impl ScriptedRerank {
	pub fn new(scores: Vec<f32>) -> Self {
		Self { scores }
	}
}

impl RerankProvider for ScriptedRerank {
	fn rerank<'a>(
		&'a self,
		_cfg: &'a RerankProviderConfig,
		_query: &'a str,
		_docs: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<f32>>> {
		let scores = self.scores.clone();

		Box::pin(async move { Ok(scores) })
	}
}

/// Scores every candidate identically, which keeps retrieval order intact.
pub struct FlatRerank;

impl RerankProvider for FlatRerank {
	fn rerank<'a>(
		&'a self,
		_cfg: &'a RerankProviderConfig,
		_query: &'a str,
		docs: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<f32>>> {
		let scores = vec![0.0; docs.len()];

		Box::pin(async move { Ok(scores) })
	}
}

pub struct FailingRerank;

impl RerankProvider for FailingRerank {
	fn rerank<'a>(
		&'a self,
		_cfg: &'a RerankProviderConfig,
		_query: &'a str,
		_docs: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<f32>>> {
		Box::pin(async move { Err(eyre::eyre!("rerank endpoint unreachable")) })
	}
}

/// Pops scripted responses per generation call and repeats the final one
/// once the script runs out. Records every prompt and counts calls so tests
/// can assert the generation budget.
pub struct ScriptedGenerator {
	responses: Mutex<VecDeque<String>>,
	fallback: String,
	calls: AtomicUsize,
	prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
	pub fn always(response: &str) -> Self {
		Self {
			responses: Mutex::new(VecDeque::new()),
			fallback: response.to_string(),
			calls: AtomicUsize::new(0),
			prompts: Mutex::new(Vec::new()),
		}
	}

	pub fn sequence(responses: Vec<String>, fallback: &str) -> Self {
		Self {
			responses: Mutex::new(responses.into()),
			fallback: fallback.to_string(),
			calls: AtomicUsize::new(0),
			prompts: Mutex::new(Vec::new()),
		}
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	pub fn prompts(&self) -> Vec<String> {
		self.prompts.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}
}

impl GeneratorProvider for ScriptedGenerator {
	fn generate<'a>(
		&'a self,
		_cfg: &'a GeneratorProviderConfig,
		prompt: &'a str,
		_system: &'a str,
		_temperature: f32,
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		self.prompts.lock().unwrap_or_else(|err| err.into_inner()).push(prompt.to_string());

		let response = {
			let mut guard = self.responses.lock().unwrap_or_else(|err| err.into_inner());

			guard.pop_front().unwrap_or_else(|| self.fallback.clone())
		};

		Box::pin(async move { Ok(response) })
	}
}

pub struct FailingGenerator {
	calls: AtomicUsize,
}

impl FailingGenerator {
	pub fn new() -> Self {
		Self { calls: AtomicUsize::new(0) }
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}

impl Default for FailingGenerator {
	fn default() -> Self {
		Self::new()
	}
}

impl GeneratorProvider for FailingGenerator {
	fn generate<'a>(
		&'a self,
		_cfg: &'a GeneratorProviderConfig,
		_prompt: &'a str,
		_system: &'a str,
		_temperature: f32,
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		Box::pin(async move { Err(eyre::eyre!("generation endpoint unreachable")) })
	}
}
