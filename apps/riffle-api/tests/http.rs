use std::sync::Arc;

use axum::{
	body::{self, Body},
	http::{Request, StatusCode},
};
use tower::util::ServiceExt;

use riffle_api::{routes, state::AppState};
use riffle_service::{Providers, RiffleService};
use riffle_testkit::{
	FixtureIndex, FlatRerank, HashEmbedding, ScriptedGenerator, chunk, test_config,
};

fn app_state(generator: Arc<ScriptedGenerator>) -> AppState {
	let providers = Providers::new(Arc::new(HashEmbedding), Arc::new(FlatRerank), generator);
	let index = Arc::new(FixtureIndex::new(vec![chunk(
		"api.md",
		"Endpoints",
		"GET /users lists users.",
		0.10,
	)]));
	let service = RiffleService::with_providers(test_config(), index, providers);

	AppState { service: Arc::new(service) }
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
	let bytes = body::to_bytes(response.into_body(), usize::MAX)
		.await
		.expect("Failed to read response body.");

	serde_json::from_slice(&bytes).expect("Response body is not JSON.")
}

#[tokio::test]
async fn health_endpoint_responds() {
	let app = routes::router(app_state(Arc::new(ScriptedGenerator::always("ok"))));
	let response = app
		.oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request"))
		.await
		.expect("request failed");

	assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn answer_endpoint_returns_grounded_response() {
	let app = routes::router(app_state(Arc::new(ScriptedGenerator::always(
		"The service exposes /users.",
	))));
	let request = Request::builder()
		.method("POST")
		.uri("/v1/answer")
		.header("content-type", "application/json")
		.body(Body::from(r#"{"message": "list all api endpoints"}"#))
		.expect("request");
	let response = app.oneshot(request).await.expect("request failed");

	assert_eq!(response.status(), StatusCode::OK);

	let json = json_body(response).await;

	assert_eq!(json["response"], "The service exposes /users.");
	assert_eq!(json["attempts"], 1);
	assert!(json["sources"].as_array().is_some_and(|sources| !sources.is_empty()));
	assert!(json["conversation_id"].as_str().is_some_and(|id| !id.is_empty()));
}

#[tokio::test]
async fn conversation_round_trip() {
	let state = app_state(Arc::new(ScriptedGenerator::always("ok")));
	let app = routes::router(state);
	let create = Request::builder()
		.method("POST")
		.uri("/v1/conversations")
		.header("content-type", "application/json")
		.body(Body::from("{}"))
		.expect("request");
	let response = app.clone().oneshot(create).await.expect("request failed");

	assert_eq!(response.status(), StatusCode::OK);

	let created = json_body(response).await;
	let id = created["conversation_id"].as_str().expect("missing conversation_id").to_string();

	let add_turn = Request::builder()
		.method("POST")
		.uri(format!("/v1/conversations/{id}/turns"))
		.header("content-type", "application/json")
		.body(Body::from(r#"{"role": "user", "content": "hello"}"#))
		.expect("request");
	let response = app.clone().oneshot(add_turn).await.expect("request failed");

	assert_eq!(response.status(), StatusCode::OK);

	let context = Request::builder()
		.uri(format!("/v1/conversations/{id}/context?compact=true"))
		.body(Body::empty())
		.expect("request");
	let response = app.clone().oneshot(context).await.expect("request failed");

	assert_eq!(response.status(), StatusCode::OK);

	let json = json_body(response).await;

	assert_eq!(json["turn_count"], 1);
	assert!(json["full_context"].as_str().is_some_and(|text| text.contains("hello")));

	let list = Request::builder().uri("/v1/conversations").body(Body::empty()).expect("request");
	let response = app.clone().oneshot(list).await.expect("request failed");
	let json = json_body(response).await;

	assert_eq!(json["conversations"].as_array().map(Vec::len), Some(1));

	let remove = Request::builder()
		.method("DELETE")
		.uri(format!("/v1/conversations/{id}"))
		.body(Body::empty())
		.expect("request");
	let response = app.oneshot(remove).await.expect("request failed");
	let json = json_body(response).await;

	assert_eq!(json["deleted"], true);
}

#[tokio::test]
async fn context_for_unknown_conversation_is_not_found() {
	let app = routes::router(app_state(Arc::new(ScriptedGenerator::always("ok"))));
	let request = Request::builder()
		.uri("/v1/conversations/missing/context")
		.body(Body::empty())
		.expect("request");
	let response = app.oneshot(request).await.expect("request failed");

	assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
