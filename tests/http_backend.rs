//! Integration tests for the HTTP backend client.
//!
//! Each test spins up an Axum stub of the inference service on a random port
//! and exercises the real JSON contracts, first through `HttpBackend` alone and
//! then through a full engine session.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;

use symptom_intake::backend::http::{ADVANCE_PATH, ANALYZE_PATH};
use symptom_intake::backend::{FollowUpReply, HttpBackend, IntakeBackend, QuestionKind, Urgency};
use symptom_intake::engine::IntakeEngine;
use symptom_intake::error::BackendError;
use symptom_intake::results::AnalysisPanel;
use symptom_intake::session::{FollowUpAnswer, Gender, HistoryAnswer, HistoryKey, SessionState};
use symptom_intake::wizard::Step;
use symptom_intake::IntakeConfig;

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

const CATALOG: &[&str] = &["cough", "cold sweats", "sore throat", "headache", "fever"];

/// Request bodies the stub received, in order, tagged by path.
#[derive(Clone, Default)]
struct Recorded(Arc<Mutex<Vec<(&'static str, Value)>>>);

impl Recorded {
    fn push(&self, path: &'static str, body: Value) {
        self.0.lock().unwrap().push((path, body));
    }

    fn bodies(&self, path: &str) -> Vec<Value> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| *p == path)
            .map(|(_, body)| body.clone())
            .collect()
    }
}

async fn get_symptoms(State(rec): State<Recorded>, Json(body): Json<Value>) -> Json<Value> {
    rec.push("/get_symptoms", body.clone());
    let input = body["input"].as_str().unwrap_or_default().to_lowercase();
    let matches: Vec<&str> = CATALOG.iter().copied().filter(|s| s.contains(&input)).collect();
    Json(json!(matches))
}

/// Asks one slider question, then reports completion.
async fn submit_symptoms(State(rec): State<Recorded>, Json(body): Json<Value>) -> Json<Value> {
    rec.push("/submit_symptoms", body.clone());
    let answered = body["detailed_symptoms"].as_object().map_or(0, |m| m.len());
    if answered == 0 {
        Json(json!({ "question": { "question": "How severe is it?", "type": "slider" } }))
    } else {
        Json(json!({ "completed": true, "question": null }))
    }
}

async fn analyze(State(rec): State<Recorded>, Json(body): Json<Value>) -> Json<Value> {
    rec.push("/analyze", body);
    Json(json!({
        "conditions": [
            { "name": "Common cold", "confidence": 64.6, "explanation": "Cough with sore throat" }
        ],
        "tests": [
            { "name": "Throat swab", "confidence": 40, "explanation": "Rule out strep", "priority": "low" }
        ],
        "urgency": "routine"
    }))
}

/// Start the stub service on a random port, return (base url, recorder).
async fn start_server() -> (String, Recorded) {
    let rec = Recorded::default();
    let app = Router::new()
        .route("/get_symptoms", post(get_symptoms))
        .route("/submit_symptoms", post(submit_symptoms))
        .route("/analyze", post(analyze))
        .with_state(rec.clone());
    (serve(app).await, rec)
}

/// A service that fails every request.
async fn start_failing_server() -> String {
    let app = Router::new()
        .route("/get_symptoms", post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }))
        .route("/submit_symptoms", post(|| async { "not json" }))
        .route("/analyze", post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "overloaded") }));
    serve(app).await
}

async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    format!("http://127.0.0.1:{port}/")
}

fn sample_session() -> SessionState {
    let mut session = SessionState::new();
    session.set_gender(Gender::Male);
    session.set_age(34);
    session.answer_history(HistoryKey::Smoking, HistoryAnswer::No);
    session.add_symptom("cough");
    session
}

#[tokio::test]
async fn suggest_posts_input_and_decodes_list() {
    timeout(TEST_TIMEOUT, async {
        let (url, rec) = start_server().await;
        let backend = HttpBackend::new(url);

        let names = backend.suggest("co").await.unwrap();
        assert_eq!(names, vec!["cough", "cold sweats"]);
        assert!(backend.suggest("zzz").await.unwrap().is_empty());

        assert_eq!(rec.bodies("/get_symptoms")[0], json!({ "input": "co" }));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn advance_sends_full_session() {
    timeout(TEST_TIMEOUT, async {
        let (url, rec) = start_server().await;
        let backend = HttpBackend::new(url);
        let mut session = sample_session();

        let FollowUpReply::Question(question) = backend.advance_intake(&session).await.unwrap()
        else {
            panic!("Expected a question");
        };
        assert_eq!(question.question, "How severe is it?");
        assert_eq!(question.kind, QuestionKind::Scale);

        session.record_answer(question.question, FollowUpAnswer::Scale(4));
        assert_eq!(backend.advance_intake(&session).await.unwrap(), FollowUpReply::Completed);

        let bodies = rec.bodies(ADVANCE_PATH);
        assert_eq!(bodies.len(), 2);
        assert_eq!(bodies[0]["demographics"], json!({ "gender": "male", "age": 34 }));
        assert_eq!(bodies[0]["history"], json!({ "smoking": "No" }));
        assert_eq!(bodies[0]["symptoms"], json!(["cough"]));
        assert_eq!(bodies[1]["detailed_symptoms"], json!({ "How severe is it?": 4 }));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn analyze_decodes_every_section() {
    timeout(TEST_TIMEOUT, async {
        let (url, rec) = start_server().await;
        let backend = HttpBackend::new(url);

        let payload = backend.analyze(&sample_session()).await.unwrap();
        let conditions = payload.conditions.unwrap();
        assert_eq!(conditions[0].name, "Common cold");
        let tests = payload.tests.unwrap();
        assert_eq!(tests[0].priority.as_deref(), Some("low"));
        assert_eq!(payload.urgency, Some(Urgency::Routine));
        assert_eq!(rec.bodies(ANALYZE_PATH).len(), 1);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn error_status_and_bad_bodies_surface_as_errors() {
    timeout(TEST_TIMEOUT, async {
        let backend = HttpBackend::new(start_failing_server().await);

        match backend.suggest("cough").await {
            Err(BackendError::Status { endpoint, status, body }) => {
                assert_eq!(endpoint, "/get_symptoms");
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("Expected a status error, got {other:?}"),
        }
        assert!(matches!(
            backend.advance_intake(&sample_session()).await,
            Err(BackendError::InvalidResponse { .. })
        ));
        assert!(matches!(
            backend.analyze(&sample_session()).await,
            Err(BackendError::Status { status: 503, .. })
        ));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn full_session_over_http() {
    timeout(TEST_TIMEOUT, async {
        let (url, rec) = start_server().await;
        let config = IntakeConfig {
            backend_url: url,
            debounce: Duration::from_millis(10),
            ..IntakeConfig::default()
        };
        let backend: Arc<dyn IntakeBackend> = Arc::new(HttpBackend::from_config(&config));
        let mut engine = IntakeEngine::new(config, backend);

        engine.select_gender(Gender::Female);
        engine.enter_age(27);
        engine.advance().unwrap();
        engine.answer_history(HistoryKey::Allergies, HistoryAnswer::Unknown);
        engine.advance().unwrap();

        engine.type_query("Sore");
        engine.settle().await;
        assert_eq!(engine.suggestions(), ["sore throat"]);
        engine.add_symptom("sore throat");

        engine.advance().unwrap();
        engine.settle().await;
        assert_eq!(engine.current_step(), Step::FollowUp);
        engine.answer_follow_up(FollowUpAnswer::Scale(7));
        engine.settle().await;

        assert_eq!(engine.current_step(), Step::Results);
        let AnalysisPanel::Ready(display) = engine.analysis() else {
            panic!("Expected analysis, got {:?}", engine.analysis());
        };
        let cold = &display.conditions.as_ref().unwrap().entries[0];
        assert_eq!(cold.confidence_label(), "65% confidence");
        assert_eq!(display.urgency.as_ref().unwrap().label(), "Urgency Level: ROUTINE");

        let analyzed = &rec.bodies(ANALYZE_PATH)[0];
        assert_eq!(analyzed["symptoms"], json!(["sore throat"]));
        assert_eq!(analyzed["history"], json!({ "allergies": "Don't know" }));
        assert_eq!(analyzed["detailed_symptoms"], json!({ "How severe is it?": 7 }));
    })
    .await
    .expect("test timed out");
}
