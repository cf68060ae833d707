use riffle_domain::{
	evaluate,
	query::{self, Intent, SearchQuery},
};

use crate::{
	Error, Result, RiffleService,
	context::{self, SourceRef},
	conversation::Role,
	retrieve::AggregatedHit,
};

const ANSWER_SYSTEM_PROMPT: &str = "You are a helpful technical assistant. Answer questions \
based ONLY on the provided context. If the context does not contain the information needed to \
answer the question, say so explicitly. Be concise but comprehensive.";
const REFINE_SYSTEM_PROMPT: &str = "You are a search query optimizer.";

/// Canned response for runs that retrieved nothing. Skips the generation
/// call entirely.
pub const NO_CONTEXT_RESPONSE: &str = "I could not find relevant information to answer your \
question. Please rephrase your query.";

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AnswerRequest {
	pub message: String,
	pub conversation_id: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct AnswerResponse {
	pub response: String,
	pub sources: Vec<SourceRef>,
	pub attempts: u32,
	pub analysis: QueryAnalysis,
	pub conversation_id: String,
	pub turn_count: usize,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct QueryAnalysis {
	pub intent: Intent,
	pub is_comprehensive: bool,
	pub sub_queries: Vec<String>,
}

impl From<&SearchQuery> for QueryAnalysis {
	fn from(analysis: &SearchQuery) -> Self {
		Self {
			intent: analysis.intent,
			is_comprehensive: analysis.is_comprehensive,
			sub_queries: analysis.decomposed.clone(),
		}
	}
}

/// Everything a single workflow run produces. Always returned; run-level
/// failures degrade to explanatory response text, never an error.
#[derive(Debug)]
pub struct AnswerOutcome {
	pub response: String,
	pub sources: Vec<SourceRef>,
	pub attempts: u32,
	pub analysis: QueryAnalysis,
}

/// Per-run mutable record threaded through every stage and discarded at run
/// end. Never persisted.
struct WorkflowState {
	query: String,
	retrieved_docs: Vec<AggregatedHit>,
	query_analysis: SearchQuery,
	llm_response: String,
	is_relevant: bool,
	attempts: u32,
	max_attempts: u32,
	final_response: String,
	sources: Vec<SourceRef>,
	conversation_context: String,
}

impl RiffleService {
	/// Answers one user message inside a conversation: resolves history,
	/// enriches the query with compacted context, runs the adaptive
	/// workflow, and records both turns.
	pub async fn answer(&self, req: AnswerRequest) -> Result<AnswerResponse> {
		let message = req.message.trim().to_string();

		if message.is_empty() {
			return Err(Error::InvalidRequest { message: "message must be non-empty.".to_string() });
		}

		let (conversation_id, _) = self.conversations.get_or_create(req.conversation_id.as_deref());
		let rag_context = self.conversations.context_for_rag(&conversation_id, true)?;
		let workflow_query = if rag_context.full_context.trim().is_empty() {
			message.clone()
		} else {
			format!("{message}\n\nContext: {}", rag_context.full_context)
		};
		let outcome = self.run_workflow(workflow_query, rag_context.full_context).await;

		self.conversations.add_turn(&conversation_id, Role::User, &message)?;
		self.conversations.add_turn(&conversation_id, Role::Assistant, &outcome.response)?;

		let turn_count = self.conversations.context_for_rag(&conversation_id, true)?.turn_count;

		Ok(AnswerResponse {
			response: outcome.response,
			sources: outcome.sources,
			attempts: outcome.attempts,
			analysis: outcome.analysis,
			conversation_id,
			turn_count,
		})
	}

	/// The adaptive loop: ANALYZE, then RETRIEVE -> GENERATE -> EVALUATE,
	/// refining and repeating until the response is accepted or the attempt
	/// budget runs out. Generation calls per run are bounded by
	/// `max_attempts` answers plus `max_attempts - 1` refinements.
	pub async fn run_workflow(
		&self,
		query: String,
		conversation_context: String,
	) -> AnswerOutcome {
		let max_sub_queries = self.cfg.orchestrator.max_sub_queries as usize;
		let mut state = WorkflowState {
			query_analysis: query::decompose(&query, max_sub_queries),
			query,
			retrieved_docs: Vec::new(),
			llm_response: String::new(),
			is_relevant: false,
			attempts: 0,
			max_attempts: self.cfg.orchestrator.max_attempts,
			final_response: String::new(),
			sources: Vec::new(),
			conversation_context,
		};

		tracing::info!(
			intent = ?state.query_analysis.intent,
			is_comprehensive = state.query_analysis.is_comprehensive,
			sub_queries = state.query_analysis.decomposed.len(),
			context_chars = state.conversation_context.chars().count(),
			"Query analyzed."
		);

		loop {
			let analysis = state.query_analysis.clone();
			let retrieval = &self.cfg.retrieval;
			let (k, final_k, rerank_top_k) = if analysis.is_comprehensive {
				(
					retrieval.comprehensive_k,
					retrieval.comprehensive_final_k as usize,
					retrieval.comprehensive_rerank_top_k as usize,
				)
			} else {
				(retrieval.k, retrieval.final_k as usize, retrieval.rerank_top_k as usize)
			};
			let hits = self.retrieve_hits(&analysis.decomposed, k, final_k).await;

			state.retrieved_docs = self.rerank_hits(&analysis.original, hits, rerank_top_k).await;

			if state.retrieved_docs.is_empty() {
				tracing::warn!(query = %analysis.original, "No documents retrieved.");

				state.llm_response = NO_CONTEXT_RESPONSE.to_string();
				state.sources = Vec::new();
			} else {
				let built = context::build_context(&state.retrieved_docs);
				let prompt = format!(
					"Context:\n{}\n\nQuestion: {}\n\nProvide a clear, direct answer using only \
the context provided.",
					built.context_text, state.query,
				);

				match self
					.providers
					.generator
					.generate(
						&self.cfg.providers.generator,
						&prompt,
						ANSWER_SYSTEM_PROMPT,
						self.cfg.providers.generator.temperature,
					)
					.await
				{
					Ok(text) => {
						state.llm_response = text;
						state.sources = built.sources;
					},
					Err(err) => {
						tracing::warn!(error = %err, "Generation failed.");

						state.llm_response = format!("Error generating response: {err}");
						state.sources = Vec::new();
					},
				}
			}

			state.is_relevant = evaluate::evaluate_response(
				&state.llm_response,
				!state.retrieved_docs.is_empty(),
				state.attempts,
				state.max_attempts,
				analysis.is_comprehensive,
			);
			state.attempts += 1;

			tracing::debug!(
				attempts = state.attempts,
				is_relevant = state.is_relevant,
				docs = state.retrieved_docs.len(),
				"Response evaluated."
			);

			if state.is_relevant || state.attempts >= state.max_attempts {
				break;
			}

			match self.refine_query(&state.query).await {
				Ok(refined) if !refined.trim().is_empty() => {
					tracing::debug!(refined = %refined.trim(), "Query refined for retry.");

					state.query = refined.trim().to_string();
				},
				Ok(_) => {
					tracing::warn!("Refinement returned an empty query; retrying unchanged.");
				},
				Err(err) => {
					tracing::warn!(error = %err, "Refinement failed; retrying with the previous query.");
				},
			}

			state.query_analysis = query::decompose(&state.query, max_sub_queries);
		}

		state.final_response = state.llm_response.clone();

		AnswerOutcome {
			response: state.final_response,
			sources: state.sources,
			attempts: state.attempts,
			analysis: QueryAnalysis::from(&state.query_analysis),
		}
	}

	async fn refine_query(&self, query: &str) -> color_eyre::Result<String> {
		let prompt = format!(
			"The previous answer to this query wasn't satisfactory:\n\"{query}\"\n\nSuggest an \
improved query that might get better results. Respond with just the refined query.",
		);

		self.providers
			.generator
			.generate(
				&self.cfg.providers.generator,
				&prompt,
				REFINE_SYSTEM_PROMPT,
				self.cfg.providers.generator.refine_temperature,
			)
			.await
	}
}
