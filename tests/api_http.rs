// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - POST /analyze (happy path, validation, error envelope, body limit)
// - GET /benchmark (hit, miss, bad or missing query params)

use std::sync::Arc;

use serde_json::json;
use serde_json::Value as Json;
use shuttle_axum::axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt as _; // for `oneshot`

use listing_risk_analyzer::api::{self, AppState};
use listing_risk_analyzer::benchmark::{BenchmarkDataSource, BenchmarkStore};
use listing_risk_analyzer::providers::{DemoImageProvider, KeywordRuleSet, KeywordTextProvider};
use listing_risk_analyzer::{Aggregator, Analyzer, PriceScorer};

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

fn test_router() -> Router {
    let store: Arc<dyn BenchmarkDataSource> = Arc::new(
        BenchmarkStore::from_json_str(
            r#"{"Bangalore": {"Koramangala": {"2bhk": 35000, "1bhk": 22000, "std_dev_percent": 0.2}}}"#,
        )
        .expect("fixture parses"),
    );
    let analyzer = Analyzer::new(
        PriceScorer::new(store.clone()),
        Aggregator::default(),
        Arc::new(KeywordTextProvider::new(KeywordRuleSet::default_seed()).expect("seed compiles")),
        Arc::new(DemoImageProvider),
    );
    api::create_router(AppState::new(analyzer, store))
}

async fn send(req: Request<Body>) -> (StatusCode, Vec<u8>) {
    let resp = test_router().oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    (status, bytes)
}

async fn post_analyze(payload: Json) -> (StatusCode, Json) {
    let req = Request::builder()
        .method("POST")
        .uri("/analyze")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST /analyze");
    let (status, bytes) = send(req).await;
    let v = serde_json::from_slice(&bytes).unwrap_or(Json::Null);
    (status, v)
}

async fn get_json(uri: &str) -> (StatusCode, Json) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build GET");
    let (status, bytes) = send(req).await;
    (status, serde_json::from_slice(&bytes).unwrap_or(Json::Null))
}

fn scam_listing() -> Json {
    json!({
        "title": "URGENT!! 2BHK Koramangala",
        "description": "Owner going abroad so renting at very low price. Pay small token amount \
                        of Rs 5000 on WhatsApp to hold flat. 10 people already interested so \
                        jaldi karo. Contact only on WhatsApp.",
        "price": 7500,
        "locality": "Koramangala",
        "city": "Bangalore",
        "property_type": "2BHK",
        "contact_number": "9876543210"
    })
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .expect("build GET /health");
    let (status, bytes) = send(req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(String::from_utf8(bytes).expect("utf8"), "ok");
}

#[tokio::test]
async fn api_analyze_scores_the_classic_scam() {
    let (status, v) = post_analyze(scam_listing()).await;
    assert_eq!(status, StatusCode::OK, "{v}");

    // price 100, text 100, no image 20 → 0.4*100 + 0.4*100 + 0.2*20 = 84
    assert_eq!(v["risk_score"], 84);
    assert_eq!(v["verdict"], "High Scam Risk");
    assert!(v["listing_id"].as_str().is_some_and(|s| s.len() == 36));
    assert!(v["analyzed_at"].is_string());

    let price = &v["price_analysis"];
    assert_eq!(price["score"], 100);
    assert_eq!(price["market_median"], 35000.0);
    assert_eq!(price["percent_below_market"], 78.57);
    assert_eq!(price["flags"][0], "Price far below market median");

    assert_eq!(v["text_analysis"]["score"], 100);
    assert_eq!(v["text_analysis"]["verdict"], "High Scam Risk");
    assert_eq!(v["image_analysis"]["verdict"], "No image provided");
    assert_eq!(v["recommendations"][0], "Do not pay any advance");
}

#[tokio::test]
async fn api_analyze_with_image_uses_demo_provider() {
    let mut listing = scam_listing();
    listing["images"] = json!([{ "media_type": "image/png", "data_base64": "data:image/png;base64,aGVsbG8=" }]);
    let (status, v) = post_analyze(listing).await;
    assert_eq!(status, StatusCode::OK, "{v}");
    assert_eq!(v["image_analysis"]["score"], 30);
    assert_eq!(v["image_analysis"]["verdict"], "Unable to analyze (Demo Mode)");
    // 40 + 40 + 6
    assert_eq!(v["risk_score"], 86);
}

#[tokio::test]
async fn api_analyze_unknown_locality_is_still_scored() {
    let mut listing = scam_listing();
    listing["locality"] = json!("Jayanagar");
    let (status, v) = post_analyze(listing).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["price_analysis"]["score"], 30);
    assert_eq!(v["price_analysis"]["verdict"], "Unable to verify");
    assert!(v["price_analysis"]["market_median"].is_null());
}

#[tokio::test]
async fn api_analyze_rejects_zero_price() {
    let mut listing = scam_listing();
    listing["price"] = json!(0);
    let (status, v) = post_analyze(listing).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(v["success"], false);
    assert_eq!(v["error"], "price must be greater than 0");
}

#[tokio::test]
async fn api_analyze_rejects_blank_city() {
    let mut listing = scam_listing();
    listing["city"] = json!("   ");
    let (status, v) = post_analyze(listing).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(v["error"], "city must not be blank");
}

#[tokio::test]
async fn api_analyze_rejects_bad_base64() {
    let mut listing = scam_listing();
    listing["images"] = json!([{ "media_type": "image/jpeg", "data_base64": "%%%not-base64%%%" }]);
    let (status, v) = post_analyze(listing).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["success"], false);
    assert_eq!(v["error"], "image 0: invalid base64 data");
}

#[tokio::test]
async fn api_analyze_rejects_unknown_property_type() {
    let mut listing = scam_listing();
    listing["property_type"] = json!("4BHK");
    let (status, v) = post_analyze(listing).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(v["success"], false);
    assert!(
        v["error"].as_str().is_some_and(|e| e.contains("unknown property type '4BHK'")),
        "{v}"
    );
}

#[tokio::test]
async fn api_analyze_rejects_negative_price_with_envelope() {
    let mut listing = scam_listing();
    listing["price"] = json!(-5);
    let (status, v) = post_analyze(listing).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(v["success"], false);
    assert!(v["error"].is_string());
}

#[tokio::test]
async fn api_analyze_missing_field_uses_envelope() {
    let mut listing = scam_listing();
    listing.as_object_mut().unwrap().remove("city");
    let (status, v) = post_analyze(listing).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(v["success"], false);
}

#[tokio::test]
async fn api_analyze_malformed_json_uses_envelope() {
    let req = Request::builder()
        .method("POST")
        .uri("/analyze")
        .header("content-type", "application/json")
        .body(Body::from("{ \"title\": "))
        .expect("build POST /analyze");
    let (status, bytes) = send(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let v: Json = serde_json::from_slice(&bytes).expect("json envelope");
    assert_eq!(v["success"], false);
}

#[tokio::test]
async fn api_analyze_accepts_loosely_spelled_property_types() {
    for (raw, label) in [("Pg", "PG"), (" 2BHK ", "2BHK"), ("2Bhk", "2BHK")] {
        let mut listing = scam_listing();
        listing["property_type"] = json!(raw);
        let (status, v) = post_analyze(listing).await;
        assert_eq!(status, StatusCode::OK, "{raw}: {v}");
        if label == "2BHK" {
            assert_eq!(v["price_analysis"]["market_median"], 35000.0, "{raw}");
        } else {
            assert_eq!(v["price_analysis"]["verdict"], "Unable to verify");
        }
    }
}

#[tokio::test]
async fn api_analyze_accepts_photo_sized_images() {
    // ~3 MB of base64, above axum's 2 MB default body limit
    let photo = "AAAA".repeat(750_000);
    let mut listing = scam_listing();
    listing["images"] = json!([{ "media_type": "image/jpeg", "data_base64": photo }]);
    let (status, v) = post_analyze(listing).await;
    assert_eq!(status, StatusCode::OK, "{v}");
    assert_eq!(v["image_analysis"]["score"], 30);
}

#[tokio::test]
async fn api_benchmark_hit() {
    let (status, v) =
        get_json("/benchmark?city=bangalore&locality=KORAMANGALA&property_type=1bhk").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["median_price"], 22000.0);
    assert_eq!(v["std_dev_percent"], 0.2);
    assert_eq!(v["property_type"], "1BHK");
}

#[tokio::test]
async fn api_benchmark_miss_reports_reason() {
    let (status, v) =
        get_json("/benchmark?city=Bangalore&locality=Whitefield&property_type=2BHK").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(v["success"], false);
    assert_eq!(v["reason"], "locality");
}

#[tokio::test]
async fn api_benchmark_missing_param_uses_envelope() {
    let (status, v) = get_json("/benchmark?city=Bangalore&locality=Koramangala").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["success"], false);
    assert!(v["error"].as_str().is_some_and(|e| e.contains("property_type")), "{v}");
}

#[tokio::test]
async fn api_benchmark_bad_property_type_is_422() {
    let (status, v) = get_json("/benchmark?city=Bangalore&locality=Koramangala&property_type=villa").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(v["success"], false);
}
