use std::{collections::HashMap, time::Duration};

use qdrant_client::qdrant::{Query, QueryPointsBuilder, ScoredPoint, Value, value::Kind};

use crate::{
	Result,
	models::{ChunkMeta, RetrievedChunk},
};

pub struct QdrantIndex {
	pub client: qdrant_client::Qdrant,
	pub collection: String,
	pub vector_dim: u32,
}
impl QdrantIndex {
	pub fn new(cfg: &riffle_config::Qdrant) -> Result<Self> {
		let client = qdrant_client::Qdrant::from_url(&cfg.url)
			.timeout(Duration::from_millis(cfg.timeout_ms))
			.build()?;

		Ok(Self { client, collection: cfg.collection.clone(), vector_dim: cfg.vector_dim })
	}

	/// One nearest-neighbor query. The collection scores with cosine
	/// similarity (higher = closer); hits come back converted to a distance
	/// cost (lower = closer) so downstream ranking has a single polarity.
	pub async fn search(&self, vector: Vec<f32>, k: u32) -> Result<Vec<RetrievedChunk>> {
		let request = QueryPointsBuilder::new(self.collection.clone())
			.query(Query::new_nearest(vector))
			.with_payload(true)
			.limit(k as u64);
		let response = self.client.query(request).await?;

		Ok(response.result.iter().filter_map(decode_point).collect())
	}
}

/// Decodes a scored point into a chunk, including the JSON-string-encoded
/// list fields some ingesters write for scalar-only metadata stores. Points
/// missing required payload are skipped with a warning, never fatal.
fn decode_point(point: &ScoredPoint) -> Option<RetrievedChunk> {
	let payload = &point.payload;
	let Some(text) = payload_string(payload, "text") else {
		tracing::warn!("Chunk point missing text payload.");

		return None;
	};
	let Some(doc_id) = payload_string(payload, "doc_id") else {
		tracing::warn!("Chunk point missing doc_id payload.");

		return None;
	};
	let section_path = payload_string_list(payload, "section_path")
		.or_else(|| payload_json_list(payload, "section_path_json"))
		.unwrap_or_default();
	let section_path_str = payload_string(payload, "section_path_str")
		.unwrap_or_else(|| section_path.join(" > "));
	let commands = payload_string_list(payload, "commands")
		.or_else(|| payload_json_list(payload, "commands_json"))
		.unwrap_or_default();
	let meta = ChunkMeta {
		doc_id,
		section_path,
		section_path_str,
		kind: payload_string(payload, "kind").unwrap_or_default(),
		has_code: payload_bool(payload, "has_code").unwrap_or(false),
		commands,
		start_line: payload_i64(payload, "start_line").unwrap_or(0),
		end_line: payload_i64(payload, "end_line").unwrap_or(0),
		step_no: payload_i64(payload, "step_no"),
	};

	Some(RetrievedChunk { text, meta, distance: 1.0 - point.score })
}

fn payload_string(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
	let value = payload.get(key)?;

	match &value.kind {
		Some(Kind::StringValue(text)) => Some(text.to_string()),
		_ => None,
	}
}

fn payload_bool(payload: &HashMap<String, Value>, key: &str) -> Option<bool> {
	let value = payload.get(key)?;

	match &value.kind {
		Some(Kind::BoolValue(value)) => Some(*value),
		_ => None,
	}
}

fn payload_i64(payload: &HashMap<String, Value>, key: &str) -> Option<i64> {
	let value = payload.get(key)?;

	match &value.kind {
		Some(Kind::IntegerValue(value)) => Some(*value),
		Some(Kind::DoubleValue(value)) =>
			if value.fract() == 0.0 {
				Some(*value as i64)
			} else {
				None
			},
		_ => None,
	}
}

fn payload_string_list(payload: &HashMap<String, Value>, key: &str) -> Option<Vec<String>> {
	let value = payload.get(key)?;

	match &value.kind {
		Some(Kind::ListValue(list)) => Some(
			list.values
				.iter()
				.filter_map(|item| match &item.kind {
					Some(Kind::StringValue(text)) => Some(text.to_string()),
					_ => None,
				})
				.collect(),
		),
		_ => None,
	}
}

fn payload_json_list(payload: &HashMap<String, Value>, key: &str) -> Option<Vec<String>> {
	let text = payload_string(payload, key)?;

	serde_json::from_str::<Vec<String>>(&text).ok()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn string_value(text: &str) -> Value {
		Value { kind: Some(Kind::StringValue(text.to_string())) }
	}

	fn bool_value(value: bool) -> Value {
		Value { kind: Some(Kind::BoolValue(value)) }
	}

	fn int_value(value: i64) -> Value {
		Value { kind: Some(Kind::IntegerValue(value)) }
	}

	fn sample_point() -> ScoredPoint {
		let mut payload = HashMap::new();
		payload.insert("text".to_string(), string_value("Run the installer."));
		payload.insert("doc_id".to_string(), string_value("setup.md"));
		payload.insert(
			"section_path_json".to_string(),
			string_value(r#"["Install", "Linux"]"#),
		);
		payload.insert("commands_json".to_string(), string_value(r#"["apt install agent"]"#));
		payload.insert("kind".to_string(), string_value("step"));
		payload.insert("has_code".to_string(), bool_value(true));
		payload.insert("start_line".to_string(), int_value(10));
		payload.insert("end_line".to_string(), int_value(14));
		payload.insert("step_no".to_string(), int_value(2));

		ScoredPoint { payload, score: 0.92, ..Default::default() }
	}

	#[test]
	fn decodes_json_encoded_list_fields() {
		let chunk = decode_point(&sample_point()).expect("decode failed");

		assert_eq!(chunk.meta.section_path, vec!["Install", "Linux"]);
		assert_eq!(chunk.meta.commands, vec!["apt install agent"]);
		assert_eq!(chunk.meta.step_no, Some(2));
		assert!((chunk.distance - 0.08).abs() < 1e-6);
	}

	#[test]
	fn skips_points_without_doc_id() {
		let mut point = sample_point();
		point.payload.remove("doc_id");

		assert!(decode_point(&point).is_none());
	}
}
