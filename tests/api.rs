//! End-to-end tests of the HTTP surface with scripted AI providers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use code_sensei::gateway::{Acceptance, GenerationOptions, ProviderError};
use code_sensei::rules::{AnalysisKind, Dimension, Matcher, Rule, RuleSet, Severity};
use code_sensei::{router, AppState, Gateway, Gateways, Scorer, SenseiConfig, TextGenerator};

const MUTABLE_DEFAULT: &str = "def add(item, items=[]):\n    items.append(item)\n    return items\n";

/// Provider that always returns the same text and counts its calls.
struct Canned {
    id: &'static str,
    text: Option<String>,
    calls: AtomicUsize,
}

impl Canned {
    fn answering(id: &'static str, text: &str) -> Arc<Self> {
        Arc::new(Self {
            id,
            text: Some(text.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    fn failing(id: &'static str) -> Arc<Self> {
        Arc::new(Self {
            id,
            text: None,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for Canned {
    fn id(&self) -> &str {
        self.id
    }

    async fn generate(
        &self,
        _prompt: &str,
        _options: &GenerationOptions,
    ) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.text {
            Some(text) => Ok(text.clone()),
            None => Err(ProviderError::Status {
                status: 503,
                body: "unavailable".into(),
            }),
        }
    }
}

fn gateway(providers: &[Arc<Canned>]) -> Gateway {
    Gateway::new(
        providers
            .iter()
            .map(|p| Arc::clone(p) as Arc<dyn TextGenerator>)
            .collect(),
        GenerationOptions::default(),
        Duration::from_secs(5),
        Acceptance::default(),
    )
}

fn offline_app() -> axum::Router {
    router(Arc::new(AppState::new(
        Scorer::new(),
        Gateways::disabled(),
        SenseiConfig::default(),
    )))
}

fn app_with(gateways: Gateways) -> axum::Router {
    router(Arc::new(AppState::new(
        Scorer::new(),
        gateways,
        SenseiConfig::default(),
    )))
}

/// Config with no provider token whose bug and learn chains point at a local
/// listener, so any outbound request would show up as a pending connection.
fn tokenless_config(listener: &std::net::TcpListener) -> SenseiConfig {
    let endpoint = format!("http://{}/models/codebert-base", listener.local_addr().unwrap());
    let mut config = SenseiConfig::default();
    config.ai.token = None;
    for chain in [&mut config.gateway.bugs, &mut config.gateway.learn] {
        chain.providers = vec![endpoint.clone()];
        chain.timeout_secs = 1;
    }
    config
}

fn local_listener() -> std::net::TcpListener {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    listener
}

fn assert_no_connection(listener: &std::net::TcpListener) {
    match listener.accept() {
        Err(err) => assert_eq!(err.kind(), std::io::ErrorKind::WouldBlock),
        Ok((_, peer)) => panic!("unexpected provider connection from {peer}"),
    }
}

fn panicking_matcher(_code: &str) -> bool {
    panic!("matcher blew up")
}

async fn post(app: axum::Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn health_reports_ok() {
    let request = Request::builder()
        .uri("/api/health")
        .body(Body::empty())
        .unwrap();
    let response = offline_app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "OK");
}

#[tokio::test]
async fn bugtest_falls_back_to_heuristics() {
    let (status, body) = post(
        offline_app(),
        "/api/bugtest",
        json!({ "code": MUTABLE_DEFAULT, "language": "python" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "heuristic_fallback");
    assert_eq!(body["model"], "pattern_matcher");
    assert_eq!(body["confidence"], "medium");
    assert!(body["metrics"]["critical"].as_u64().unwrap() >= 1);
    assert_eq!(body["metrics"]["overall_risk"], "HIGH");

    let patterns: Vec<&str> = body["patterns_found"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert!(patterns.contains(&"mutable_default_argument"));
    assert!(body["analysis"]
        .as_str()
        .unwrap()
        .contains("Mutable Default Argument"));
}

#[tokio::test]
async fn missing_fields_are_rejected() {
    let (status, body) = post(offline_app(), "/api/review", json!({ "code": "x = 1" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Code and language are required.");
    assert_eq!(body["code"], "MISSING_FIELD");

    let (status, body) = post(offline_app(), "/api/learn", json!({ "language": "go" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Language and topic are required.");
}

#[tokio::test]
async fn oversized_code_never_reaches_providers() {
    let provider = Canned::answering("codereviewer-base", &"tip ".repeat(60));
    let mut gateways = Gateways::disabled();
    gateways.optimize = gateway(&[Arc::clone(&provider)]);

    let code = "x".repeat(10_001);
    let (status, body) = post(
        app_with(gateways),
        "/api/optimize",
        json!({ "code": code, "language": "python" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "CODE_TOO_LONG");
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn review_uses_first_healthy_provider() {
    let broken = Canned::failing("codebert-base");
    let healthy = Canned::answering("codeparrot", &"Consider splitting this function. ".repeat(8));
    let mut gateways = Gateways::disabled();
    gateways.review = gateway(&[Arc::clone(&broken), Arc::clone(&healthy)]);

    let (status, body) = post(
        app_with(gateways),
        "/api/review",
        json!({ "code": "def f():\n    return 1\n", "language": "python" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ai_success");
    assert_eq!(body["model"], "codeparrot");
    assert_eq!(body["confidence"], "high");
    assert_eq!(broken.calls(), 1);
    assert_eq!(healthy.calls(), 1);
    assert!(body.get("patterns_found").is_none());
}

#[tokio::test]
async fn review_reports_quality_scores() {
    let (status, body) = post(
        offline_app(),
        "/api/review",
        json!({ "code": "def f():\n    return 1\n", "language": "python" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let scores = &body["metrics"]["scores"];
    assert_eq!(scores["overall"], 100);
    assert_eq!(scores["grade"], "A");
    assert_eq!(body["metrics"]["function_count"], 1);
}

#[tokio::test]
async fn optimize_omits_quality_scores() {
    let (status, body) = post(
        offline_app(),
        "/api/optimize",
        json!({ "code": "for i in a:\n    for j in b:\n        print(i, j)\n", "language": "python" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model"], "static_analyzer");
    assert!(body["metrics"].get("scores").is_none());
    assert!(body["analysis"].as_str().unwrap().contains("Nested Loops"));
}

#[tokio::test]
async fn learn_classifies_topic_without_ai() {
    let (status, body) = post(
        offline_app(),
        "/api/learn",
        json!({ "language": "go", "topic": "goroutines" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["category"], "concepts");
    assert_eq!(body["status"], "heuristic_fallback");
    assert!(body["explanation"]
        .as_str()
        .unwrap()
        .to_lowercase()
        .contains("goroutines"));
}

#[tokio::test]
async fn bugtest_without_token_never_calls_providers() {
    let listener = local_listener();
    let state = AppState::from_config(tokenless_config(&listener)).unwrap();
    assert_eq!(state.gateways.bugs.provider_ids(), vec!["codebert-base"]);

    let (status, body) = post(
        router(Arc::new(state)),
        "/api/bugtest",
        json!({ "code": MUTABLE_DEFAULT, "language": "python" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "heuristic_fallback");
    assert!(body["metrics"]["critical"].as_u64().unwrap() >= 1);
    assert!(body["patterns_found"]
        .as_array()
        .unwrap()
        .iter()
        .any(|p| p == "mutable_default_argument"));
    assert_no_connection(&listener);
}

#[tokio::test]
async fn learn_without_token_never_calls_providers() {
    let listener = local_listener();
    let state = AppState::from_config(tokenless_config(&listener)).unwrap();

    let (status, body) = post(
        router(Arc::new(state)),
        "/api/learn",
        json!({ "language": "go", "topic": "goroutines" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "heuristic_fallback");
    assert_eq!(body["category"], "concepts");
    assert!(!body["explanation"].as_str().unwrap().is_empty());
    assert_no_connection(&listener);
}

#[tokio::test]
async fn heuristic_panic_degrades_to_basic_report() {
    let catalog = RuleSet {
        rules: vec![Rule {
            id: "exploding_rule",
            name: "Exploding Rule",
            languages: &["python"],
            kinds: &[AnalysisKind::Bugs],
            matcher: Matcher::Text(panicking_matcher),
            severity: Severity::High,
            dimension: Dimension::BestPractices,
            description: "Always panics",
            rationale: "Exercises the last-resort report",
            example: None,
        }],
    };
    let app = router(Arc::new(AppState::new(
        Scorer::from_rule_set(catalog),
        Gateways::disabled(),
        SenseiConfig::default(),
    )));

    let (status, body) = post(
        app,
        "/api/bugtest",
        json!({ "code": "x = 1\ny = 2", "language": "python" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "basic_fallback");
    assert_eq!(body["confidence"], "low");
    assert_eq!(body["model"], "fallback");
    assert_eq!(body["metrics"]["overall_risk"], "UNKNOWN");
    assert_eq!(body["metrics"]["line_count"], 2);
}
