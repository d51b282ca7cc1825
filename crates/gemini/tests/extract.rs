use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::post,
};
use chrono::NaiveDate;
use serde_json::{Value, json};

use engine::{ExtractionError, ExtractionRequest, ReceiptExtractor};
use gemini::GeminiClient;

#[derive(Debug)]
struct Captured {
    path: String,
    api_key: Option<String>,
    body: Value,
}

type Requests = Arc<Mutex<Vec<Captured>>>;

#[derive(Clone)]
struct FakeState {
    requests: Requests,
    status: StatusCode,
    response: Value,
}

async fn generate(
    State(state): State<FakeState>,
    Path(rest): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let api_key = headers
        .get("x-goog-api-key")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    state.requests.lock().unwrap().push(Captured {
        path: rest,
        api_key,
        body,
    });
    (state.status, Json(state.response))
}

/// Starts a stand-in for the Gemini API and returns its base URL.
async fn fake_gemini(status: StatusCode, response: Value) -> (String, Requests) {
    let requests = Requests::default();
    let state = FakeState {
        requests: requests.clone(),
        status,
        response,
    };
    let app = Router::new()
        .route("/v1beta/models/{*rest}", post(generate))
        .with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), requests)
}

fn candidate(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }]
    })
}

fn client(base_url: &str) -> GeminiClient {
    GeminiClient::builder()
        .api_key("secret-key")
        .model("gemini-test")
        .base_url(Some(base_url))
        .build()
        .unwrap()
}

fn categories() -> Vec<String> {
    vec!["Groceries".to_string(), "Dining".to_string()]
}

fn request<'a>(
    image: &'a [u8],
    categories: &'a [String],
    payees: Option<&'a [String]>,
) -> ExtractionRequest<'a> {
    ExtractionRequest {
        image,
        mime_type: "image/png",
        allowed_categories: categories,
        known_payees: payees,
        today: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
    }
}

const IKEA: &str = r#"{"merchant":"Ikea","totalAmount":42.50,"transactionDate":"2024-03-01","category":"Groceries","memo":"home goods","lineItems":[]}"#;

#[tokio::test]
async fn sends_schema_image_and_prompt() {
    let (base_url, requests) = fake_gemini(StatusCode::OK, candidate(IKEA)).await;
    let categories = categories();
    let payees = vec!["IKEA".to_string()];

    let receipt = client(&base_url)
        .extract(request(b"png-bytes", &categories, Some(&payees)))
        .await
        .unwrap();

    assert_eq!(receipt.merchant, "Ikea");
    assert_eq!(receipt.total_amount, 42.50);

    let requests = requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let captured = &requests[0];
    assert_eq!(captured.path, "gemini-test:generateContent");
    assert_eq!(captured.api_key.as_deref(), Some("secret-key"));

    let body = &captured.body;
    let schema = &body["generationConfig"]["responseSchema"];
    assert_eq!(
        schema["properties"]["category"]["enum"],
        json!(["Groceries", "Dining"])
    );
    assert_eq!(
        schema["properties"]["lineItems"]["items"]["properties"]["category"]["enum"],
        json!(["Groceries", "Dining"])
    );
    assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");

    let parts = &body["contents"][0]["parts"];
    assert!(parts[0]["text"].as_str().unwrap().contains("- IKEA"));
    assert_eq!(parts[1]["inlineData"]["mimeType"], "image/png");
    assert_eq!(parts[1]["inlineData"]["data"], "cG5nLWJ5dGVz");
    assert!(
        body["systemInstruction"]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .contains("Tue Mar 05 2024")
    );
}

#[tokio::test]
async fn every_request_carries_its_own_categories() {
    let (base_url, requests) = fake_gemini(StatusCode::OK, candidate(IKEA)).await;
    let client = client(&base_url);

    let first = categories();
    client.extract(request(b"a", &first, None)).await.unwrap();
    let second = vec!["Groceries".to_string()];
    client.extract(request(b"b", &second, None)).await.unwrap();

    let requests = requests.lock().unwrap();
    let enums: Vec<&Value> = requests
        .iter()
        .map(|r| &r.body["generationConfig"]["responseSchema"]["properties"]["category"]["enum"])
        .collect();
    assert_eq!(enums, [&json!(["Groceries", "Dining"]), &json!(["Groceries"])]);
}

#[tokio::test]
async fn backend_error_is_reported() {
    let (base_url, _) = fake_gemini(
        StatusCode::BAD_REQUEST,
        json!({"error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}}),
    )
    .await;
    let categories = categories();

    let err = client(&base_url)
        .extract(request(b"a", &categories, None))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ExtractionError::Backend { status: 400, ref message } if message == "API key not valid"
    ));
}

#[tokio::test]
async fn out_of_list_category_is_rejected() {
    let text = r#"{"merchant":"Ikea","totalAmount":1,"transactionDate":"2024-03-01","category":"Furniture","memo":"chair"}"#;
    let (base_url, _) = fake_gemini(StatusCode::OK, candidate(text)).await;
    let categories = categories();

    let err = client(&base_url)
        .extract(request(b"a", &categories, None))
        .await
        .unwrap_err();

    assert!(matches!(err, ExtractionError::CategoryNotAllowed(_)));
}

#[tokio::test]
async fn malformed_or_empty_response_fails() {
    let (base_url, _) = fake_gemini(StatusCode::OK, candidate("not json")).await;
    let categories = categories();
    let err = client(&base_url)
        .extract(request(b"a", &categories, None))
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractionError::Json(_)));

    let (base_url, _) = fake_gemini(StatusCode::OK, json!({"candidates": []})).await;
    let err = client(&base_url)
        .extract(request(b"a", &categories, None))
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractionError::EmptyResponse));
}

#[tokio::test]
async fn invalid_input_never_reaches_the_backend() {
    let (base_url, requests) = fake_gemini(StatusCode::OK, candidate(IKEA)).await;
    let client = client(&base_url);

    let categories = categories();
    let err = client
        .extract(request(b"", &categories, None))
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractionError::InvalidInput(_)));

    let err = client.extract(request(b"a", &[], None)).await.unwrap_err();
    assert!(matches!(err, ExtractionError::InvalidInput(_)));

    assert!(requests.lock().unwrap().is_empty());
}
