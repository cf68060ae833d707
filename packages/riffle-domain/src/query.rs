use std::collections::HashSet;

use regex::Regex;

/// Patterns whose presence marks a query as asking for exhaustive results.
const COMPREHENSIVE_PATTERNS: &[&str] =
	&[r"\ball\b", r"\blist\b", r"\bshow\b", r"\benumerate\b", r"\bwhat are\b"];
const PROCEDURAL_PATTERNS: &[&str] = &[r"\bhow to\b", r"\bsteps\b"];
const EXPLANATORY_PATTERNS: &[&str] = &[r"\bwhy\b", r"\bexplain\b", r"\bwhat (is|are)\b"];
const SPECIFIC_PATTERNS: &[&str] = &[r"\bfind\b", r"\bget\b", r"\bfetch\b"];

/// Universal stop words only. Domain vocabulary must never be listed here;
/// term extraction has to work for any corpus.
const STOP_WORDS: &[&str] = &[
	"a", "about", "after", "against", "all", "an", "and", "any", "are", "at", "be", "been",
	"before", "being", "between", "by", "can", "could", "did", "do", "does", "during", "for",
	"from", "had", "has", "have", "he", "her", "him", "his", "how", "i", "in", "into", "is", "it",
	"its", "may", "me", "might", "must", "my", "no", "not", "of", "on", "or", "our", "out", "over",
	"please", "shall", "she", "should", "that", "the", "their", "them", "these", "they", "this",
	"those", "to", "us", "was", "we", "were", "what", "when", "where", "which", "who", "whom",
	"why", "will", "with", "without", "would", "you", "your",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
	Procedural,
	Comprehensive,
	Explanatory,
	Specific,
	General,
}

/// A user query decomposed into an ordered list of search strings.
///
/// Produced fresh for every orchestrator iteration and never mutated.
/// `decomposed[0]` is always the cleaned original query.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SearchQuery {
	pub original: String,
	pub decomposed: Vec<String>,
	pub intent: Intent,
	pub is_comprehensive: bool,
}

/// Strips an operator-injected conversation-context suffix before analysis.
pub fn clean_query(query: &str) -> &str {
	query.split("\n\nContext:").next().unwrap_or(query).trim()
}

pub fn detect_intent(query: &str) -> Intent {
	let lowered = query.to_lowercase();

	// First match wins; procedural outranks comprehensive so "steps to list
	// all users" stays procedural.
	if matches_any(&lowered, PROCEDURAL_PATTERNS) {
		return Intent::Procedural;
	}
	if matches_any(&lowered, COMPREHENSIVE_PATTERNS) {
		return Intent::Comprehensive;
	}
	if matches_any(&lowered, EXPLANATORY_PATTERNS) {
		return Intent::Explanatory;
	}
	if matches_any(&lowered, SPECIFIC_PATTERNS) {
		return Intent::Specific;
	}

	Intent::General
}

pub fn is_comprehensive_query(query: &str) -> bool {
	matches_any(&query.to_lowercase(), COMPREHENSIVE_PATTERNS)
}

/// Tokenizes a query into content terms: case-folded, word-boundary split,
/// double-quoted phrases preserved as single terms, stop words dropped,
/// deduplicated preserving first-seen order.
pub fn key_terms(query: &str) -> Vec<String> {
	let Ok(token_re) = Regex::new(r#""([^"]+)"|[A-Za-z0-9][A-Za-z0-9_./-]*"#) else {
		return Vec::new();
	};
	let mut seen = HashSet::new();
	let mut terms = Vec::new();

	for capture in token_re.captures_iter(query) {
		let raw = capture
			.get(1)
			.or_else(|| capture.get(0))
			.map(|found| found.as_str())
			.unwrap_or_default();
		let folded = raw.to_lowercase();

		if folded.is_empty() || STOP_WORDS.contains(&folded.as_str()) {
			continue;
		}
		if seen.insert(folded.clone()) {
			terms.push(folded);
		}
	}

	terms
}

/// Decomposes a query into at most `max_sub_queries` complementary search
/// strings. Same input always yields the same output.
pub fn decompose(query: &str, max_sub_queries: usize) -> SearchQuery {
	let clean = clean_query(query);
	let intent = detect_intent(clean);
	let is_comprehensive = is_comprehensive_query(clean);
	let terms = key_terms(clean);
	let expand = is_comprehensive
		|| matches!(intent, Intent::Comprehensive | Intent::Procedural | Intent::Explanatory);
	let mut candidates = Vec::new();

	candidates.extend(terms.iter().cloned());

	for pair in terms.windows(2) {
		candidates.push(pair.join(" "));
	}

	if expand {
		candidates.push(terms.join(" "));

		for index in 0..terms.len().saturating_sub(2) {
			candidates.push(format!("{} {}", terms[index], terms[index + 2]));
		}
		for window in terms.windows(3) {
			candidates.push(window.join(" "));
		}
	}

	let decomposed = normalize_sub_queries(candidates, clean, max_sub_queries);

	SearchQuery { original: clean.to_string(), decomposed, intent, is_comprehensive }
}

fn normalize_sub_queries(
	candidates: Vec<String>,
	original: &str,
	max_sub_queries: usize,
) -> Vec<String> {
	let mut out = Vec::new();
	let mut seen = HashSet::new();

	push_sub_query(&mut out, &mut seen, original);

	for candidate in candidates {
		if out.len() >= max_sub_queries {
			break;
		}

		push_sub_query(&mut out, &mut seen, &candidate);
	}

	out.truncate(max_sub_queries);

	out
}

fn push_sub_query(out: &mut Vec<String>, seen: &mut HashSet<String>, value: &str) {
	let trimmed = value.trim();

	if trimmed.is_empty() {
		return;
	}

	if seen.insert(trimmed.to_lowercase()) {
		out.push(trimmed.to_string());
	}
}

fn matches_any(lowered: &str, patterns: &[&str]) -> bool {
	patterns
		.iter()
		.any(|pattern| Regex::new(pattern).map(|re| re.is_match(lowered)).unwrap_or(false))
}
