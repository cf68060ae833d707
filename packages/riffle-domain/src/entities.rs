use std::collections::HashSet;

use regex::Regex;

/// Only the head of a turn is scanned; long responses bury no new entities
/// past this point often enough to matter.
const SCAN_CHARS: usize = 500;

/// Extracts key entities from conversation text for context compaction.
/// Capitalized phrases (likely proper nouns) and double-quoted terms,
/// deduplicated case-insensitively, first-seen order, capped at
/// `max_entities`.
pub fn extract_key_entities(text: &str, max_entities: usize) -> Vec<String> {
	let head: String = text.chars().take(SCAN_CHARS).collect();
	let Ok(capitalized_re) = Regex::new(r"\b[A-Z][A-Za-z]*(?:\s+[A-Z][A-Za-z]*)*\b") else {
		return Vec::new();
	};
	let Ok(quoted_re) = Regex::new(r#""([^"]+)""#) else {
		return Vec::new();
	};
	let candidates = capitalized_re
		.find_iter(&head)
		.map(|found| found.as_str().to_string())
		.chain(
			quoted_re
				.captures_iter(&head)
				.filter_map(|capture| capture.get(1))
				.map(|found| found.as_str().to_string()),
		);
	let mut seen = HashSet::new();
	let mut out = Vec::new();

	for candidate in candidates {
		if out.len() >= max_entities {
			break;
		}
		if candidate.chars().count() <= 2 {
			continue;
		}
		if seen.insert(candidate.to_lowercase()) {
			out.push(candidate);
		}
	}

	out
}
