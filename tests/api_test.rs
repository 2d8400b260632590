use job_tracker::auth::AuthConfig;
use job_tracker::config::AppConfig;
use job_tracker::web::{build_rocket, AppState};
use rocket::http::{ContentType, Header, Status};
use rocket::local::asynchronous::Client;
use serde_json::Value;

const SECRET: &str = "integration-test-secret";

fn config() -> AppConfig {
    let mut config = AppConfig::default();
    config.auth.admin_jwt_secret = Some(SECRET.to_string());
    config
}

async fn client() -> Client {
    let config = config();
    let state = AppState::from_config(&config).expect("app state");
    Client::tracked(build_rocket(state, &config.server))
        .await
        .expect("valid rocket instance")
}

fn admin_header() -> Header<'static> {
    let token = AuthConfig::new(&config().auth)
        .issue_admin_token("integration", None)
        .expect("token");
    Header::new("Authorization", format!("Bearer {}", token))
}

#[rocket::async_test]
async fn health_endpoint_responds() {
    let client = client().await;
    let response = client.get("/api/health").dispatch().await;
    assert_eq!(response.status(), Status::Ok);

    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["success"], true);
    assert!(body["message"].as_str().unwrap().contains("running"));
}

#[rocket::async_test]
async fn admin_routes_require_a_valid_token() {
    let client = client().await;

    let response = client
        .post("/api/recovery/breakers/linkedin_jobs/reset")
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Forbidden);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["error_code"], "ADMIN_REQUIRED");

    let response = client
        .post("/api/recovery/cache/clear")
        .header(Header::new("Authorization", "Bearer not-a-token"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Forbidden);

    let response = client.get("/api/recovery/config").dispatch().await;
    assert_eq!(response.status(), Status::Forbidden);
}

#[rocket::async_test]
async fn admin_can_open_a_breaker_and_see_it() {
    let client = client().await;

    let response = client
        .post("/api/recovery/breakers/linkedin_jobs/force-open")
        .header(admin_header())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let health: Value = client
        .get("/api/recovery/health")
        .dispatch()
        .await
        .into_json()
        .await
        .unwrap();
    assert_eq!(health["data"]["openCircuitBreakers"][0], "linkedin_jobs");
    assert_eq!(health["data"]["offlineMode"], true);

    let dashboard: Value = client
        .get("/api/recovery/dashboard?refresh=true")
        .dispatch()
        .await
        .into_json()
        .await
        .unwrap();
    assert_eq!(dashboard["data"]["tiles"][0]["status"], "Open");
    assert_eq!(dashboard["data"]["tiles"][0]["tone"], "critical");

    let status: Value = client
        .get("/api/recovery/status")
        .dispatch()
        .await
        .into_json()
        .await
        .unwrap();
    assert_eq!(status["data"]["open_breakers"], 1);
}

#[rocket::async_test]
async fn simulate_rejects_unknown_error_kinds() {
    let client = client().await;
    let response = client
        .post("/api/recovery/breakers/linkedin_jobs/simulate")
        .header(admin_header())
        .header(ContentType::JSON)
        .body(r#"{"kind":"meteor"}"#)
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);
}

#[rocket::async_test]
async fn malformed_config_import_is_refused() {
    let client = client().await;
    let response = client
        .post("/api/recovery/config")
        .header(admin_header())
        .header(ContentType::JSON)
        .body(r#"{"config":"{ nope"}"#)
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::UnprocessableEntity);

    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["error_code"], "IMPORT_FAILED");
}

#[rocket::async_test]
async fn text_intake_validates_and_parses() {
    let client = client().await;

    let response = client
        .post("/api/intake/text")
        .header(ContentType::JSON)
        .body(r#"{"text":"   "}"#)
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["error"], "Please enter some text to parse");

    let posting = "Senior Rust Engineer at Acme\nLocation: Berlin\n\nRequirements:\n- 5+ years of Rust\n- Experience with PostgreSQL";
    let response = client
        .post("/api/intake/text")
        .header(ContentType::JSON)
        .body(serde_json::json!({ "text": posting, "conversation_id": "c-1" }).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["conversation_id"], "c-1");
    assert!(body["data"]["job"]["skills"]
        .as_array()
        .unwrap()
        .iter()
        .any(|s| s == "Rust"));
}

#[rocket::async_test]
async fn url_intake_rejects_malformed_urls() {
    let client = client().await;
    let response = client
        .post("/api/intake/url")
        .header(ContentType::JSON)
        .body(r#"{"url":"www.example.com/jobs/1"}"#)
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);

    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["error_code"], "INVALID_URL");
}

#[rocket::async_test]
async fn json_upload_loads_first_application() {
    let client = client().await;
    let boundary = "X-JOBTRACK-BOUNDARY";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"app.json\"\r\nContent-Type: application/json\r\n\r\n{json}\r\n--{b}--\r\n",
        b = boundary,
        json = r#"{"applications":[{"position":"Engineer","company_name":"Acme"},{"position":"Other"}]}"#,
    );

    let response = client
        .post("/api/intake/file")
        .header(ContentType::new("multipart", "form-data").with_params(("boundary", boundary)))
        .body(body)
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let body: Value = response.into_json().await.unwrap();
    assert_eq!(
        body["message"],
        "Successfully loaded application data for Engineer at Acme"
    );
    assert_eq!(body["data"]["application"]["position"], "Engineer");
}

#[rocket::async_test]
async fn tips_are_capped() {
    let client = client().await;
    let body: Value = client
        .get("/api/intake/tips?url=https://www.linkedin.com/jobs/view/1")
        .dispatch()
        .await
        .into_json()
        .await
        .unwrap();
    let tips = body["data"].as_array().unwrap();
    assert!(!tips.is_empty());
    assert!(tips.len() <= 4);
}
