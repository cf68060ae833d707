use riffle_domain::{entities, evaluate, query};

use query::Intent;

#[test]
fn strips_context_suffix() {
	let cleaned = query::clean_query("list all endpoints\n\nContext: User: hi\nAssistant: hello");

	assert_eq!(cleaned, "list all endpoints");
}

#[test]
fn detects_procedural_before_comprehensive() {
	assert_eq!(query::detect_intent("how to list all users"), Intent::Procedural);
	assert_eq!(query::detect_intent("steps to install the agent"), Intent::Procedural);
}

#[test]
fn detects_intents_in_rule_order() {
	assert_eq!(query::detect_intent("list all api endpoints"), Intent::Comprehensive);
	assert_eq!(query::detect_intent("why does the import fail"), Intent::Explanatory);
	assert_eq!(query::detect_intent("explain the retry policy"), Intent::Explanatory);
	assert_eq!(query::detect_intent("fetch the latest report"), Intent::Specific);
	assert_eq!(query::detect_intent("database connection pooling"), Intent::General);
}

#[test]
fn comprehensive_boundary() {
	assert!(query::is_comprehensive_query("list all api endpoints"));
	assert!(!query::is_comprehensive_query("get user 42"));
}

#[test]
fn key_terms_drop_stop_words_and_preserve_order() {
	let terms = query::key_terms("What are all the API endpoints for the billing service");

	assert_eq!(terms, vec!["api", "endpoints", "billing", "service"]);
}

#[test]
fn key_terms_keep_quoted_phrases_whole() {
	let terms = query::key_terms(r#"find "connection timeout" errors"#);

	assert_eq!(terms, vec!["find", "connection timeout", "errors"]);
}

#[test]
fn key_terms_deduplicate_case_insensitively() {
	let terms = query::key_terms("API api Api endpoints");

	assert_eq!(terms, vec!["api", "endpoints"]);
}

#[test]
fn decompose_puts_original_first() {
	let decomposed = query::decompose("list all api endpoints", 8);

	assert_eq!(decomposed.decomposed[0], "list all api endpoints");
	assert_eq!(decomposed.intent, Intent::Comprehensive);
	assert!(decomposed.is_comprehensive);
}

#[test]
fn decompose_expands_comprehensive_queries() {
	let decomposed = query::decompose("list all api endpoint methods", 8);

	// Individual terms come right after the original, then adjacent pairs.
	assert_eq!(
		decomposed.decomposed,
		vec![
			"list all api endpoint methods",
			"list",
			"api",
			"endpoint",
			"methods",
			"list api",
			"api endpoint",
			"endpoint methods",
		]
	);
}

#[test]
fn decompose_keeps_specific_queries_narrow() {
	let decomposed = query::decompose("get user report", 8);

	assert_eq!(decomposed.intent, Intent::Specific);
	assert!(!decomposed.is_comprehensive);
	// Terms and adjacent pairs only, no skip pairs or triplet windows.
	assert_eq!(
		decomposed.decomposed,
		vec!["get user report", "get", "user", "report", "get user", "user report"]
	);
}

#[test]
fn decompose_caps_sub_queries() {
	let decomposed =
		query::decompose("list all alpha beta gamma delta epsilon zeta eta theta entries", 8);

	assert_eq!(decomposed.decomposed.len(), 8);
	assert_eq!(decomposed.decomposed[0], "list all alpha beta gamma delta epsilon zeta eta theta entries");
}

#[test]
fn decompose_is_deterministic() {
	let first = query::decompose("how to configure all retry policies", 8);
	let second = query::decompose("how to configure all retry policies", 8);

	assert_eq!(first.decomposed, second.decomposed);
	assert_eq!(first.intent, second.intent);
	assert_eq!(first.is_comprehensive, second.is_comprehensive);
}

#[test]
fn negative_responses_are_detected() {
	assert!(evaluate::is_negative_response("I could not find that information."));
	assert!(evaluate::is_negative_response("Sorry, there is no information on this."));
	assert!(!evaluate::is_negative_response("The service exposes three endpoints."));
}

#[test]
fn comprehensive_negative_response_triggers_refinement() {
	let accepted =
		evaluate::evaluate_response("I could not find that information", true, 1, 3, true);

	assert!(!accepted);
}

#[test]
fn attempt_cap_forces_acceptance() {
	let accepted =
		evaluate::evaluate_response("I could not find that information", true, 3, 3, true);

	assert!(accepted);
}

#[test]
fn comprehensive_needs_evidence() {
	assert!(!evaluate::evaluate_response("Here are the endpoints.", false, 0, 3, true));
	assert!(evaluate::evaluate_response("Here are the endpoints.", true, 0, 3, true));
}

#[test]
fn narrow_queries_tolerate_missing_evidence() {
	assert!(evaluate::evaluate_response("Port 8080 by default.", false, 0, 3, false));
}

#[test]
fn extracts_capitalized_and_quoted_entities() {
	let found = entities::extract_key_entities(
		r#"The Billing Service talks to "payment gateway" over HTTPS."#,
		5,
	);

	assert!(found.contains(&"Billing Service".to_string()));
	assert!(found.contains(&"payment gateway".to_string()));
}

#[test]
fn entity_extraction_caps_and_dedupes() {
	let found = entities::extract_key_entities(
		"Alpha Beta. Alpha Beta. Gamma Delta Epsilon Zeta Eta Theta Iota Kappa",
		3,
	);

	assert_eq!(found.len(), 3);
}
