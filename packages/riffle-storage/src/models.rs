/// Structural metadata attached to every ingested chunk. The ingestion
/// pipeline guarantees a non-empty `doc_id`; everything else may be empty
/// for root-level content.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ChunkMeta {
	pub doc_id: String,
	pub section_path: Vec<String>,
	pub section_path_str: String,
	pub kind: String,
	pub has_code: bool,
	pub commands: Vec<String>,
	pub start_line: i64,
	pub end_line: i64,
	pub step_no: Option<i64>,
}

/// One nearest-neighbor hit. `distance` is a similarity cost: 0 = identical.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RetrievedChunk {
	pub text: String,
	pub meta: ChunkMeta,
	pub distance: f32,
}
