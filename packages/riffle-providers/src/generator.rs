use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde_json::Value;

/// One text-generation call. Retries are the orchestrator's responsibility,
/// never this function's.
pub async fn generate(
	cfg: &riffle_config::GeneratorProviderConfig,
	prompt: &str,
	system: &str,
	temperature: f32,
) -> Result<String> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": temperature,
		"stream": false,
		"messages": [
			{ "role": "system", "content": system },
			{ "role": "user", "content": prompt },
		],
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_generate_response(json)
}

fn parse_generate_response(json: Value) -> Result<String> {
	// OpenAI-style chat completions.
	if let Some(content) = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
	{
		return Ok(content.to_string());
	}

	// Ollama chat shape.
	if let Some(content) =
		json.get("message").and_then(|msg| msg.get("content")).and_then(|c| c.as_str())
	{
		return Ok(content.to_string());
	}

	// Ollama generate shape.
	if let Some(content) = json.get("response").and_then(|c| c.as_str()) {
		return Ok(content.to_string());
	}

	Err(eyre::eyre!("Generation response is missing text content."))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_chat_completion_content() {
		let json = serde_json::json!({
			"choices": [
				{ "message": { "content": "The port is 8080." } }
			]
		});
		let parsed = parse_generate_response(json).expect("parse failed");
		assert_eq!(parsed, "The port is 8080.");
	}

	#[test]
	fn falls_back_to_response_field() {
		let json = serde_json::json!({ "response": "The port is 8080." });
		let parsed = parse_generate_response(json).expect("parse failed");
		assert_eq!(parsed, "The port is 8080.");
	}

	#[test]
	fn rejects_payload_without_text() {
		let json = serde_json::json!({ "usage": { "total_tokens": 12 } });
		assert!(parse_generate_response(json).is_err());
	}
}
