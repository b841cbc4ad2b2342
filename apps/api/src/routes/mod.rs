pub mod health;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::generation::handlers as generation;
use crate::prompt_config::handlers as prompt_config;
use crate::records::handlers as records;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Records API
        .route(
            "/api/v1/records",
            get(records::handle_list_records).post(records::handle_add_entries),
        )
        .route(
            "/api/v1/records/pending",
            get(generation::handle_list_pending),
        )
        // Letters API
        .route(
            "/api/v1/letters/generate",
            post(generation::handle_generate),
        )
        // Prompt config API
        .route("/api/v1/config", get(prompt_config::handle_get_config))
        .route(
            "/api/v1/config/fields",
            patch(prompt_config::handle_set_field),
        )
        .route(
            "/api/v1/config/save",
            post(prompt_config::handle_save_config),
        )
        .with_state(state)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    use crate::generation::coordinator::{GenerationCoordinator, GenerationSettings};
    use crate::llm_client::{Completion, GenerationClient, GenerationRequest, LlmError};
    use crate::prompt_config::store::ConfigStore;
    use crate::prompt_config::tokens::WordTokenEstimator;
    use crate::records::schema::Schema;
    use crate::records::store::RecordStore;

    struct EchoClient;

    #[async_trait]
    impl GenerationClient for EchoClient {
        async fn complete(&self, request: &GenerationRequest) -> Result<Completion, LlmError> {
            Ok(Completion {
                total_tokens: 300,
                model: "gpt-3.5-turbo-0613".to_string(),
                text: format!("Re: {}", request.messages[5].content),
                created: 1_700_000_000,
            })
        }
    }

    fn test_app() -> (TempDir, Router) {
        let dir = tempfile::tempdir().unwrap();
        let pinfo = dir.path().join("pinfo.txt");
        let template = dir.path().join("template.txt");
        std::fs::write(&pinfo, "Ten years of backend work.").unwrap();
        std::fs::write(&template, "Dear hiring team,").unwrap();

        let config_path = dir.path().join("config.json");
        let doc = json!({
            "key": "sk-secret",
            "current_cost": 0.0,
            "total_tokens": 0,
            "configs": [{
                "name": "default",
                "system_message": "You write cover letters.",
                "instructions": "Keep it short.",
                "first_message": "Tell me about you.",
                "pinfo": pinfo.to_string_lossy(),
                "template": template.to_string_lossy(),
                "token_count": 0
            }]
        });
        std::fs::write(&config_path, doc.to_string()).unwrap();

        let records = RecordStore::load(dir.path().join("job_data.json"), Schema::record_schema())
            .unwrap();
        let configs =
            ConfigStore::load(&config_path, Some("default"), Arc::new(WordTokenEstimator))
                .unwrap();

        let records = Arc::new(Mutex::new(records));
        let configs = Arc::new(Mutex::new(configs));
        let coordinator = GenerationCoordinator::new(
            Arc::new(EchoClient),
            records.clone(),
            configs.clone(),
            GenerationSettings::default(),
        );
        let state = AppState {
            records,
            configs,
            coordinator,
        };
        (dir, build_router(state))
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn seed(app: &Router) {
        let (status, body) = send(
            app,
            "POST",
            "/api/v1/records",
            Some(json!({"entries": [
                {"company": "Acme", "job_title": "Engineer", "job_description": "Rockets"},
                {"company": "Globex", "job_title": "SRE", "job_description": "Uptime"}
            ]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["inserted"], json!([0, 1]));
    }

    #[tokio::test]
    async fn test_health() {
        let (_dir, app) = test_app();
        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "letter-api");
    }

    #[tokio::test]
    async fn test_pending_on_empty_store_is_not_found() {
        let (_dir, app) = test_app();
        let (status, body) = send(&app, "GET", "/api/v1/records/pending", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_add_then_list_pending() {
        let (_dir, app) = test_app();
        seed(&app).await;

        let (status, body) = send(&app, "GET", "/api/v1/records/pending", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 2);

        let (status, body) = send(&app, "GET", "/api/v1/records/pending?indices=1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["records"][0]["company"], "Globex");
    }

    #[tokio::test]
    async fn test_duplicate_add_is_reported_not_inserted() {
        let (_dir, app) = test_app();
        seed(&app).await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/records",
            Some(json!({"entries": [{"company": "  ACME "}]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["inserted"], json!([]));
        assert_eq!(body["duplicates"], json!(["  ACME "]));
    }

    #[tokio::test]
    async fn test_add_rejects_invalid_batches() {
        let (_dir, app) = test_app();

        let (status, _) = send(&app, "POST", "/api/v1/records", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/records",
            Some(json!({"entries": [{"company": "Acme", "salary": 100}]})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("Unknown key 'salary'"));
    }

    #[tokio::test]
    async fn test_generate_response_shape_depends_on_count() {
        let (_dir, app) = test_app();
        seed(&app).await;

        let (status, single) = send(
            &app,
            "POST",
            "/api/v1/letters/generate",
            Some(json!({"indices": [0]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(single["outcome"], "succeeded");
        assert_eq!(single["index"], 0);
        assert_eq!(single["num_tokens"], 300);

        let (status, batch) = send(
            &app,
            "POST",
            "/api/v1/letters/generate",
            Some(json!({"include_generated": true})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(batch["response"], "Successfully created the cover letters");
        assert_eq!(batch["succeeded"], 2);

        let (_, config) = send(&app, "GET", "/api/v1/config", None).await;
        assert_eq!(config["totals"]["total_tokens"], 900);
    }

    #[tokio::test]
    async fn test_generate_with_nothing_pending_is_not_found() {
        let (_dir, app) = test_app();
        let (status, _) = send(
            &app,
            "POST",
            "/api/v1/letters/generate",
            Some(json!({"include_generated": false})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_config_never_exposes_key() {
        let (_dir, app) = test_app();
        let (status, body) = send(&app, "GET", "/api/v1/config", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["config"]["name"], "default");
        assert!(!body.to_string().contains("sk-secret"));
    }

    #[tokio::test]
    async fn test_set_field_validation() {
        let (_dir, app) = test_app();

        let (status, _) = send(
            &app,
            "PATCH",
            "/api/v1/config/fields",
            Some(json!({"field": "instructions", "value": "  "})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            "PATCH",
            "/api/v1/config/fields",
            Some(json!({"field": "key", "value": "sk-other"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &app,
            "PATCH",
            "/api/v1/config/fields",
            Some(json!({"field": "instructions", "value": "Be formal."})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["instructions"], "Be formal.");
    }

    #[tokio::test]
    async fn test_save_config_adds_named_config() {
        let (_dir, app) = test_app();
        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/config/save",
            Some(json!({"name": "formal"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["config"]["name"], "formal");
        assert!(body["config"]["token_count"].as_u64().unwrap() > 0);

        let (_, config) = send(&app, "GET", "/api/v1/config", None).await;
        assert_eq!(config["available"], json!(["default", "formal"]));
    }
}
