use std::path::PathBuf;

use chrono::NaiveDate;
use uuid::Uuid;

use engine::{ExtractionError, ExtractionRequest, ReceiptExtractor};
use gemini::{DEFAULT_FIXTURE, FixtureExtractor, build_prompt};

fn fixtures_dir() -> PathBuf {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../target/test_fixtures")
        .join(Uuid::new_v4().to_string());
    std::fs::create_dir_all(&root).unwrap();
    root
}

fn request(categories: &[String]) -> ExtractionRequest<'_> {
    ExtractionRequest {
        image: b"jpeg",
        mime_type: "image/jpeg",
        allowed_categories: categories,
        known_payees: None,
        today: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
    }
}

#[tokio::test]
async fn reads_default_fixture() {
    let dir = fixtures_dir();
    std::fs::write(
        dir.join(DEFAULT_FIXTURE),
        r#"{"merchant":"IKEA","totalAmount":129.99,"transactionDate":"2024-02-17","category":"Home","memo":"shelf"}"#,
    )
    .unwrap();
    let extractor = FixtureExtractor::new(&dir, None);
    let categories = vec!["Home".to_string()];

    let receipt = extractor.extract(request(&categories)).await.unwrap();

    assert_eq!(receipt.merchant, "IKEA");
    assert_eq!(receipt.total_amount, 129.99);
    assert_eq!(extractor.prompt(None), build_prompt(None));
}

#[tokio::test]
async fn named_fixture_goes_through_category_check() {
    let dir = fixtures_dir();
    std::fs::write(
        dir.join("dinner.json"),
        r#"{"merchant":"Trattoria","totalAmount":55,"transactionDate":"2024-02-17","category":"Dining","memo":"dinner"}"#,
    )
    .unwrap();
    let extractor = FixtureExtractor::new(&dir, Some("dinner.json"));
    let categories = vec!["Groceries".to_string()];

    let err = extractor.extract(request(&categories)).await.unwrap_err();

    assert!(matches!(err, ExtractionError::CategoryNotAllowed(c) if c == "Dining"));
}

#[tokio::test]
async fn missing_fixture_is_an_error() {
    let dir = fixtures_dir();
    let extractor = FixtureExtractor::new(&dir, Some("missing.json"));
    let categories = vec!["Groceries".to_string()];

    let err = extractor.extract(request(&categories)).await.unwrap_err();

    assert!(matches!(err, ExtractionError::Io(_)));
}
