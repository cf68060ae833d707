/// Fixed indicators of a non-answer. Substring match over the lowercased
/// response; extending this list changes refinement behavior, not safety.
const NEGATIVE_PHRASES: &[&str] = &[
	"could not find",
	"not found",
	"don't have",
	"do not have",
	"not available",
	"no information",
	"unable to",
	"sorry",
	"apologize",
];

pub fn is_negative_response(response: &str) -> bool {
	let lowered = response.to_lowercase();

	NEGATIVE_PHRASES.iter().any(|phrase| lowered.contains(phrase))
}

/// Heuristic acceptance test for a generated response.
///
/// Comprehensive queries are held to the strict rule (confident answer AND
/// retrieved evidence); narrow queries only need a confident answer. Hitting
/// the attempt cap forces acceptance so the workflow always terminates.
pub fn evaluate_response(
	response: &str,
	has_docs: bool,
	attempts: u32,
	max_attempts: u32,
	is_comprehensive: bool,
) -> bool {
	if attempts >= max_attempts {
		return true;
	}

	let negative = is_negative_response(response);

	if is_comprehensive { !negative && has_docs } else { !negative }
}
