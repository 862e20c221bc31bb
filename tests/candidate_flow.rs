// tests/candidate_flow.rs

use std::net::SocketAddr;
use std::sync::Arc;

use assess_backend::catalog::{self, CatalogRow, CatalogSection};
use assess_backend::config::Config;
use assess_backend::crypto::{EnvelopeCipher, PayloadCipher};
use assess_backend::models::candidate::Candidate;
use assess_backend::models::response::SubmittedResponse;
use assess_backend::routes;
use assess_backend::state::AppState;
use assess_backend::store::MemoryStore;
use assess_backend::token::SessionContext;
use serde_json::json;

const PAYLOAD_SECRET: &str = "integration-test-secret";
const TOKEN_KEY: [u8; 32] = [0x11; 32];
const TOKEN_IV: [u8; 16] = [0x22; 16];
const EXAM: &str = "backend-exam";

fn test_config() -> Config {
    Config {
        database_url: "postgres://unused".to_string(),
        payload_secret: PAYLOAD_SECRET.to_string(),
        token_key: TOKEN_KEY,
        token_iv: TOKEN_IV,
        sso_verify_url: None,
        rust_log: "error".to_string(),
    }
}

fn payload_cipher() -> PayloadCipher {
    PayloadCipher::from_passphrase(PAYLOAD_SECRET)
}

fn envelope_cipher() -> EnvelopeCipher {
    EnvelopeCipher::new(TOKEN_KEY, TOKEN_IV)
}

fn candidate(id: i64, roll_no: &str, sso_id: &str) -> Candidate {
    Candidate {
        id,
        roll_no: roll_no.to_string(),
        sso_id: sso_id.to_string(),
        exam_name: EXAM.to_string(),
        name: "Test Candidate".to_string(),
    }
}

fn catalog_row(
    section_id: i64,
    section_name: &str,
    question_id: i64,
    question_text: &str,
    option: Option<(i64, &str, i64)>,
) -> CatalogRow {
    CatalogRow {
        section_id,
        section_name: section_name.to_string(),
        question_id,
        question_text: question_text.to_string(),
        option_id: option.map(|(id, _, _)| id),
        option_text: option.map(|(_, text, _)| text.to_string()),
        rating: option.map(|(_, _, rating)| rating),
    }
}

fn seed_catalog() -> Vec<CatalogRow> {
    vec![
        catalog_row(1, "Work Style", 1, "How do you plan your day?", Some((1, "Strict schedule", 5))),
        catalog_row(1, "Work Style", 1, "How do you plan your day?", Some((2, "Loose priorities", 3))),
        catalog_row(1, "Work Style", 2, "Preferred team size?", Some((3, "Small", 4))),
        catalog_row(2, "Technical", 3, "Favourite paradigm?", Some((4, "Functional", 5))),
        catalog_row(2, "Technical", 3, "Favourite paradigm?", Some((5, "Imperative", 2))),
    ]
}

/// Spawns the full router on a random port, backed by the given store.
/// Returns the base URL.
async fn spawn_app(store: Arc<MemoryStore>) -> String {
    let state = AppState::new(store, test_config());
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    address
}

fn sso_token(sso_id: &str, name: &str, roll_no: &str, exam_name: &str) -> String {
    envelope_cipher()
        .encrypt_value(&json!({
            "value": format!("{sso_id}|{name}|{roll_no}|{exam_name}"),
            "expires": "2026-12-31T23:59:59Z",
            "session": "sess-1"
        }))
        .unwrap()
}

fn submission_payload(roll_no: &str, sso_id: &str) -> String {
    payload_cipher()
        .encrypt_value(&json!({
            "roll_no": roll_no,
            "sso_id": sso_id,
            "exam_name": EXAM,
            "session": "sess-1",
            "responses": [
                { "question_id": 1, "option_id": 2, "rating": 3 },
                { "question_id": 2, "option_id": 3, "rating": 4 }
            ]
        }))
        .unwrap()
}

#[tokio::test]
async fn test_api_liveness() {
    let address = spawn_app(Arc::new(MemoryStore::new())).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/test-api", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Server is working!");
}

#[tokio::test]
async fn full_candidate_journey() {
    let store = Arc::new(MemoryStore::seeded(
        vec![candidate(1, "CS2023001", "SSO123")],
        seed_catalog(),
    ));
    let address = spawn_app(store.clone()).await;
    let client = reqwest::Client::new();

    // 1. Establish a session from the SSO redirect token
    let response = client
        .post(format!("{}/api/v1/candidate/session", address))
        .json(&json!({ "token": sso_token("SSO123", "Jane Doe", "CS2023001", EXAM) }))
        .send()
        .await
        .expect("Session request failed");
    assert_eq!(response.status().as_u16(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    let blob = body["data"].as_str().expect("Session blob missing");
    let context: SessionContext = payload_cipher().decrypt_value(blob).unwrap();
    assert_eq!(context.roll_no, "CS2023001");
    assert_eq!(context.exam_name, EXAM);

    // 2. Fetch the catalog and decrypt it
    let response = client
        .get(format!("{}/api/v1/candidate/questions", address))
        .send()
        .await
        .expect("Catalog request failed");
    assert_eq!(response.status().as_u16(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    let encrypted = body["data"].as_str().expect("Catalog payload missing");
    let sections: Vec<CatalogSection> = payload_cipher().decrypt_value(encrypted).unwrap();
    assert_eq!(sections, catalog::assemble(&seed_catalog()));
    assert_eq!(sections.len(), 2);

    // 3. Submit responses (forwarded address wins over the socket peer)
    let response = client
        .post(format!("{}/api/v1/candidate/submit-responses", address))
        .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
        .json(&json!({ "data": submission_payload("CS2023001", "SSO123") }))
        .send()
        .await
        .expect("Submit request failed");
    assert_eq!(response.status().as_u16(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Responses submitted successfully");
    assert_eq!(store.response_count(1), 2);

    let (ip, _submitted_at) = store.submission_meta(1).unwrap();
    assert_eq!(ip, "203.0.113.9");

    // 4. Retrieve the persisted responses
    let response = client
        .post(format!("{}/api/v1/candidate/responses/fetch", address))
        .json(&json!({ "roll_no": "CS2023001" }))
        .send()
        .await
        .expect("Fetch request failed");
    assert_eq!(response.status().as_u16(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Data fetched successfully");
    assert_eq!(body["roll_no"], "CS2023001");
    let rows: Vec<SubmittedResponse> = payload_cipher()
        .decrypt_value(body["data"].as_str().unwrap())
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].question_id, 1);
    assert_eq!(rows[0].question_text, "How do you plan your day?");
}

#[tokio::test]
async fn second_submission_conflicts() {
    let store = Arc::new(MemoryStore::seeded(
        vec![candidate(1, "R100", "S100")],
        seed_catalog(),
    ));
    let address = spawn_app(store.clone()).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/v1/candidate/submit-responses", address))
        .json(&json!({ "data": submission_payload("R100", "S100") }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let response = client
        .post(format!("{}/api/v1/candidate/submit-responses", address))
        .json(&json!({ "data": submission_payload("R100", "S100") }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Responses already submitted");

    // Still exactly one batch on record
    assert_eq!(store.response_count(1), 2);
}

#[tokio::test]
async fn concurrent_submissions_have_one_winner() {
    let roll_no = format!("R_{}", &uuid::Uuid::new_v4().to_string()[..8]);
    let store = Arc::new(MemoryStore::seeded(
        vec![candidate(1, &roll_no, "S777")],
        seed_catalog(),
    ));
    let address = spawn_app(store.clone()).await;
    let client = reqwest::Client::new();

    let first = client
        .post(format!("{}/api/v1/candidate/submit-responses", address))
        .json(&json!({ "data": submission_payload(&roll_no, "S777") }))
        .send();
    let second = client
        .post(format!("{}/api/v1/candidate/submit-responses", address))
        .json(&json!({ "data": submission_payload(&roll_no, "S777") }))
        .send();

    let (first, second) = tokio::join!(first, second);
    let mut statuses = [
        first.unwrap().status().as_u16(),
        second.unwrap().status().as_u16(),
    ];
    statuses.sort_unstable();

    assert_eq!(statuses, [200, 409]);
    assert_eq!(store.response_count(1), 2);
}

#[tokio::test]
async fn mismatched_identity_persists_nothing() {
    let store = Arc::new(MemoryStore::seeded(
        vec![candidate(1, "RA", "SA"), candidate(2, "RB", "SB")],
        seed_catalog(),
    ));
    let address = spawn_app(store.clone()).await;
    let client = reqwest::Client::new();

    // Roll number of candidate A with the SSO id of candidate B
    let response = client
        .post(format!("{}/api/v1/candidate/submit-responses", address))
        .json(&json!({ "data": submission_payload("RA", "SB") }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Identity mismatch");
    assert_eq!(store.response_count(1), 0);
    assert_eq!(store.response_count(2), 0);
}

#[tokio::test]
async fn tampered_or_missing_payload_is_a_client_error() {
    let store = Arc::new(MemoryStore::seeded(
        vec![candidate(1, "R1", "S1")],
        seed_catalog(),
    ));
    let address = spawn_app(store.clone()).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/v1/candidate/submit-responses", address))
        .json(&json!({ "data": "definitely-not-ciphertext" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Invalid encrypted payload");

    let response = client
        .post(format!("{}/api/v1/candidate/submit-responses", address))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Missing encrypted payload");

    assert_eq!(store.response_count(1), 0);
}

#[tokio::test]
async fn session_rejects_bad_tokens_and_resubmission() {
    let store = Arc::new(MemoryStore::seeded(
        vec![candidate(1, "R9", "S9")],
        seed_catalog(),
    ));
    let address = spawn_app(store.clone()).await;
    let client = reqwest::Client::new();

    // Garbage token
    let response = client
        .post(format!("{}/api/v1/candidate/session", address))
        .json(&json!({ "token": "garbage" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    // Missing token
    let response = client
        .post(format!("{}/api/v1/candidate/session", address))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    // After a successful submission the token no longer opens a session
    let response = client
        .post(format!("{}/api/v1/candidate/submit-responses", address))
        .json(&json!({ "data": submission_payload("R9", "S9") }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let response = client
        .post(format!("{}/api/v1/candidate/session", address))
        .json(&json!({ "token": sso_token("S9", "Someone", "R9", EXAM) }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);
}

#[tokio::test]
async fn fetch_validates_roll_no_and_handles_absence() {
    let store = Arc::new(MemoryStore::seeded(
        vec![candidate(1, "R1", "S1")],
        seed_catalog(),
    ));
    let address = spawn_app(store).await;
    let client = reqwest::Client::new();

    // Nothing persisted yet
    let response = client
        .post(format!("{}/api/v1/candidate/responses/fetch", address))
        .json(&json!({ "roll_no": "R1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    // Roll number fails charset validation
    let response = client
        .post(format!("{}/api/v1/candidate/responses/fetch", address))
        .json(&json!({ "roll_no": "R1; DROP TABLE responses" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn audited_routes_record_entries() {
    let store = Arc::new(MemoryStore::seeded(
        vec![candidate(1, "R1", "S1")],
        seed_catalog(),
    ));
    let address = spawn_app(store.clone()).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/v1/candidate/submit-responses", address))
        .json(&json!({ "data": submission_payload("R1", "S1") }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    // The audit write happens off the response path; give it a moment.
    for _ in 0..50 {
        if store.api_log_count() > 0 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert!(store.api_log_count() > 0);
}
