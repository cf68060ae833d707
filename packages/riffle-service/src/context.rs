use crate::retrieve::AggregatedHit;

/// Citation descriptor for one context block. Carries the stable doc id and
/// line range only; raw filesystem paths never leave the ingestion layer.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SourceRef {
	pub source: String,
	pub section: String,
	pub kind: String,
	pub step_no: Option<i64>,
	pub has_code: bool,
}

#[derive(Debug, Clone)]
pub struct BuiltContext {
	pub context_text: String,
	pub sources: Vec<SourceRef>,
}

/// Renders ranked hits into one prompt-ready text block with a parallel
/// source list. Chunks that carry commands get them appended as a fenced
/// block so the model can quote them verbatim.
pub fn build_context(hits: &[AggregatedHit]) -> BuiltContext {
	let mut blocks = Vec::with_capacity(hits.len());
	let mut sources = Vec::with_capacity(hits.len());

	for hit in hits {
		let meta = &hit.meta;
		let source = format!("{}:{}-{}", meta.doc_id, meta.start_line, meta.end_line);
		let mut block =
			format!("Source: {source}\nSection: {}\n{}", meta.section_path_str, hit.text);

		if meta.has_code && !meta.commands.is_empty() {
			block.push_str("\n\n```bash\n");
			block.push_str(&meta.commands.join("\n"));
			block.push_str("\n```");
		}

		blocks.push(block);
		sources.push(SourceRef {
			source,
			section: meta.section_path_str.clone(),
			kind: meta.kind.clone(),
			step_no: meta.step_no,
			has_code: meta.has_code,
		});
	}

	BuiltContext { context_text: blocks.join("\n\n---\n\n"), sources }
}

#[cfg(test)]
mod tests {
	use std::collections::BTreeSet;

	use riffle_storage::models::ChunkMeta;

	use super::*;

	fn hit(doc_id: &str, commands: Vec<String>) -> AggregatedHit {
		AggregatedHit {
			text: "Install the agent.".to_string(),
			meta: ChunkMeta {
				doc_id: doc_id.to_string(),
				section_path: vec!["Install".to_string()],
				section_path_str: "Install".to_string(),
				kind: "step".to_string(),
				has_code: !commands.is_empty(),
				commands,
				start_line: 10,
				end_line: 14,
				step_no: Some(1),
			},
			distance: 0.1,
			combined_score: 0.1,
			found_in_searches: BTreeSet::from([0]),
			rerank_score: None,
		}
	}

	#[test]
	fn renders_source_and_section_headers() {
		let built = build_context(&[hit("setup.md", Vec::new())]);

		assert!(built.context_text.starts_with("Source: setup.md:10-14\nSection: Install\n"));
		assert_eq!(built.sources.len(), 1);
		assert_eq!(built.sources[0].source, "setup.md:10-14");
		assert_eq!(built.sources[0].section, "Install");
	}

	#[test]
	fn fences_commands_when_present() {
		let built = build_context(&[hit("setup.md", vec!["apt install agent".to_string()])]);

		assert!(built.context_text.contains("```bash\napt install agent\n```"));
		assert!(built.sources[0].has_code);
	}

	#[test]
	fn separates_blocks_with_rules() {
		let built = build_context(&[hit("a.md", Vec::new()), hit("b.md", Vec::new())]);

		assert_eq!(built.context_text.matches("\n\n---\n\n").count(), 1);
		assert_eq!(built.sources.len(), 2);
	}
}
