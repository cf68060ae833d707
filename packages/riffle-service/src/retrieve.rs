use std::{
	cmp::Ordering,
	collections::{BTreeSet, HashMap, hash_map::Entry},
};

use riffle_storage::models::{ChunkMeta, RetrievedChunk};

use crate::RiffleService;

/// Per-sub-query positional penalty added to the raw distance. Prefers hits
/// surfaced by earlier, more specific sub-queries when distances tie or
/// nearly tie. An explicit tie-break, not noise.
const SEARCH_POSITION_PENALTY: f32 = 0.01;

/// A chunk merged across sub-query searches. Keyed by
/// `{doc_id}_{section_path_str}`, which is stable for the same passage
/// across searches within one retrieval pass.
#[derive(Debug, Clone)]
pub struct AggregatedHit {
	pub text: String,
	pub meta: ChunkMeta,
	pub distance: f32,
	pub combined_score: f32,
	pub found_in_searches: BTreeSet<usize>,
	pub rerank_score: Option<f32>,
}

impl AggregatedHit {
	pub fn identity(&self) -> String {
		hit_identity(&self.meta)
	}
}

pub(crate) fn hit_identity(meta: &ChunkMeta) -> String {
	format!("{}_{}", meta.doc_id, meta.section_path_str)
}

impl RiffleService {
	/// Runs one similarity search per sub-query, sequentially and in
	/// decomposition order, then merges, ranks, and truncates. A failed
	/// sub-query contributes nothing; a fully failed pass yields an empty
	/// list, never an error.
	pub(crate) async fn retrieve_hits(
		&self,
		search_queries: &[String],
		k: u32,
		final_k: usize,
	) -> Vec<AggregatedHit> {
		let mut per_search = Vec::with_capacity(search_queries.len());

		for sub_query in search_queries {
			let chunks = match self.search_one(sub_query, k).await {
				Ok(chunks) => chunks,
				Err(err) => {
					tracing::warn!(
						sub_query = %sub_query,
						error = %err,
						"Sub-query retrieval failed; continuing without it."
					);

					Vec::new()
				},
			};

			per_search.push(chunks);
		}

		let merged = merge_search_results(per_search);

		rank_hits(merged, final_k)
	}

	async fn search_one(
		&self,
		sub_query: &str,
		k: u32,
	) -> color_eyre::Result<Vec<RetrievedChunk>> {
		let texts = [sub_query.to_string()];
		let vectors =
			self.providers.embedding.embed(&self.cfg.providers.embedding, &texts).await?;
		let Some(vector) = vectors.into_iter().next() else {
			return Err(color_eyre::eyre::eyre!("Embedding response was empty."));
		};

		self.index.search(vector, k).await
	}

	/// Second-pass relevance scoring. Quality enhancement only: a missing or
	/// misbehaving scorer degrades to truncation in retrieval order.
	pub(crate) async fn rerank_hits(
		&self,
		query: &str,
		hits: Vec<AggregatedHit>,
		top_k: usize,
	) -> Vec<AggregatedHit> {
		if hits.is_empty() {
			return hits;
		}
		if !self.cfg.providers.rerank.enabled {
			return truncated(hits, top_k);
		}

		let docs: Vec<String> = hits.iter().map(|hit| hit.text.clone()).collect();

		match self.providers.rerank.rerank(&self.cfg.providers.rerank, query, &docs).await {
			Ok(scores) if scores.len() == hits.len() => apply_rerank_scores(hits, &scores, top_k),
			Ok(_) => {
				tracing::warn!("Rerank scores misaligned with candidates; keeping retrieval order.");

				truncated(hits, top_k)
			},
			Err(err) => {
				tracing::warn!(error = %err, "Rerank call failed; keeping retrieval order.");

				truncated(hits, top_k)
			},
		}
	}
}

/// Merges per-search results into one deduplicated hit set. On the first
/// sighting of an identity the hit is stored as-is; repeats keep the lower
/// combined score but always union the search index set.
pub(crate) fn merge_search_results(per_search: Vec<Vec<RetrievedChunk>>) -> Vec<AggregatedHit> {
	let mut merged: HashMap<String, AggregatedHit> = HashMap::new();

	for (search_index, chunks) in per_search.into_iter().enumerate() {
		for chunk in chunks {
			let combined_score = chunk.distance + search_index as f32 * SEARCH_POSITION_PENALTY;
			let key = hit_identity(&chunk.meta);

			match merged.entry(key) {
				Entry::Vacant(entry) => {
					entry.insert(AggregatedHit {
						text: chunk.text,
						meta: chunk.meta,
						distance: chunk.distance,
						combined_score,
						found_in_searches: BTreeSet::from([search_index]),
						rerank_score: None,
					});
				},
				Entry::Occupied(mut entry) => {
					let existing = entry.get_mut();

					if combined_score < existing.combined_score {
						existing.text = chunk.text;
						existing.distance = chunk.distance;
						existing.combined_score = combined_score;
					}

					existing.found_in_searches.insert(search_index);
				},
			}
		}
	}

	merged.into_values().collect()
}

/// Ascending combined score; equal scores fall back to the identity key, so
/// the ordering is a strict total order and sorts are reproducible.
pub(crate) fn rank_hits(mut hits: Vec<AggregatedHit>, final_k: usize) -> Vec<AggregatedHit> {
	hits.sort_by(|a, b| {
		a.combined_score
			.partial_cmp(&b.combined_score)
			.unwrap_or(Ordering::Equal)
			.then_with(|| a.identity().cmp(&b.identity()))
	});
	hits.truncate(final_k);

	hits
}

/// Descending rerank score; prior retrieval order breaks ties. Note the
/// polarity flip: rerank scores are higher-is-better, combined scores are
/// lower-is-better.
pub(crate) fn apply_rerank_scores(
	hits: Vec<AggregatedHit>,
	scores: &[f32],
	top_k: usize,
) -> Vec<AggregatedHit> {
	let mut scored: Vec<(usize, AggregatedHit)> = hits.into_iter().enumerate().collect();

	for (index, hit) in scored.iter_mut() {
		hit.rerank_score = Some(scores[*index]);
	}

	scored.sort_by(|(a_index, a), (b_index, b)| {
		let a_score = a.rerank_score.unwrap_or(f32::MIN);
		let b_score = b.rerank_score.unwrap_or(f32::MIN);

		b_score.partial_cmp(&a_score).unwrap_or(Ordering::Equal).then_with(|| a_index.cmp(b_index))
	});

	scored.into_iter().map(|(_, hit)| hit).take(top_k).collect()
}

fn truncated(mut hits: Vec<AggregatedHit>, top_k: usize) -> Vec<AggregatedHit> {
	hits.truncate(top_k);

	hits
}
