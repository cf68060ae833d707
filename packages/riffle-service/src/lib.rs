pub mod answer;
pub mod context;
pub mod conversation;
pub mod retrieve;
pub mod time_serde;

mod error;

use std::{future::Future, pin::Pin, sync::Arc};

use riffle_config::{
	Config, EmbeddingProviderConfig, GeneratorProviderConfig, RerankProviderConfig,
};
use riffle_providers::{embedding, generator, rerank};
use riffle_storage::{models::RetrievedChunk, qdrant::QdrantIndex};

pub use answer::{AnswerRequest, AnswerResponse, QueryAnalysis};
pub use context::{BuiltContext, SourceRef};
pub use conversation::{
	ConversationStore, ConversationSummary, ConversationTurn, RagContext, Role,
};
pub use error::{Error, Result};
pub use retrieve::AggregatedHit;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>>;
}

pub trait RerankProvider
where
	Self: Send + Sync,
{
	fn rerank<'a>(
		&'a self,
		cfg: &'a RerankProviderConfig,
		query: &'a str,
		docs: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<f32>>>;
}

pub trait GeneratorProvider
where
	Self: Send + Sync,
{
	fn generate<'a>(
		&'a self,
		cfg: &'a GeneratorProviderConfig,
		prompt: &'a str,
		system: &'a str,
		temperature: f32,
	) -> BoxFuture<'a, color_eyre::Result<String>>;
}

pub trait VectorIndex
where
	Self: Send + Sync,
{
	fn search<'a>(
		&'a self,
		vector: Vec<f32>,
		k: u32,
	) -> BoxFuture<'a, color_eyre::Result<Vec<RetrievedChunk>>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub rerank: Arc<dyn RerankProvider>,
	pub generator: Arc<dyn GeneratorProvider>,
}

pub struct DefaultProviders;

impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		Box::pin(embedding::embed(cfg, texts))
	}
}

impl RerankProvider for DefaultProviders {
	fn rerank<'a>(
		&'a self,
		cfg: &'a RerankProviderConfig,
		query: &'a str,
		docs: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<f32>>> {
		Box::pin(rerank::rerank(cfg, query, docs))
	}
}

impl GeneratorProvider for DefaultProviders {
	fn generate<'a>(
		&'a self,
		cfg: &'a GeneratorProviderConfig,
		prompt: &'a str,
		system: &'a str,
		temperature: f32,
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		Box::pin(generator::generate(cfg, prompt, system, temperature))
	}
}

impl VectorIndex for QdrantIndex {
	fn search<'a>(
		&'a self,
		vector: Vec<f32>,
		k: u32,
	) -> BoxFuture<'a, color_eyre::Result<Vec<RetrievedChunk>>> {
		Box::pin(async move {
			QdrantIndex::search(self, vector, k).await.map_err(color_eyre::Report::from)
		})
	}
}

impl Providers {
	pub fn new(
		embedding: Arc<dyn EmbeddingProvider>,
		rerank: Arc<dyn RerankProvider>,
		generator: Arc<dyn GeneratorProvider>,
	) -> Self {
		Self { embedding, rerank, generator }
	}
}

impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { embedding: provider.clone(), rerank: provider.clone(), generator: provider }
	}
}

pub struct RiffleService {
	pub cfg: Config,
	pub index: Arc<dyn VectorIndex>,
	pub providers: Providers,
	pub conversations: ConversationStore,
}

impl RiffleService {
	pub fn new(cfg: Config, index: Arc<dyn VectorIndex>) -> Self {
		Self::with_providers(cfg, index, Providers::default())
	}

	pub fn with_providers(cfg: Config, index: Arc<dyn VectorIndex>, providers: Providers) -> Self {
		let conversations = ConversationStore::new(cfg.conversation.clone());

		Self { cfg, index, providers, conversations }
	}
}
