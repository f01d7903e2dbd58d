use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use shuttle_axum::axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        DefaultBodyLimit, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tracing::debug;

use crate::aggregate::Aggregator;
use crate::analysis::{Analyzer, ListingReport, ListingSubmission};
use crate::benchmark::{BenchmarkDataSource, BenchmarkEntry, BenchmarkMiss};
use crate::config::Settings;
use crate::listing::{ListingAttributes, PropertyType, UnknownPropertyType};
use crate::price::PriceScorer;
use crate::providers::ImageInput;

/// Room for three phone photos as base64 plus the listing text.
pub const MAX_ANALYZE_BODY_BYTES: usize = 32 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<Analyzer>,
    pub benchmarks: Arc<dyn BenchmarkDataSource>,
}

impl AppState {
    pub fn new(analyzer: Analyzer, benchmarks: Arc<dyn BenchmarkDataSource>) -> Self {
        Self {
            analyzer: Arc::new(analyzer),
            benchmarks,
        }
    }

    /// Wire everything from loaded settings; the benchmark table is shared
    /// between the price scorer and the `/benchmark` endpoint.
    pub fn from_settings(settings: Settings) -> Self {
        let benchmarks: Arc<dyn BenchmarkDataSource> = Arc::new(settings.benchmarks);
        let analyzer = Analyzer::new(
            PriceScorer::new(benchmarks.clone()),
            Aggregator::new(settings.policy),
            settings.providers.build_text_provider(),
            settings.providers.build_image_provider(),
        )
        .with_timeout(settings.providers.timeout());
        Self::new(analyzer, benchmarks)
    }

    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self::from_settings(Settings::load()?))
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route(
            "/analyze",
            post(analyze).layer(DefaultBodyLimit::max(MAX_ANALYZE_BODY_BYTES)),
        )
        .route("/benchmark", get(benchmark))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("image {index}: invalid base64 data")]
    BadImage { index: usize },
    #[error(transparent)]
    UnknownPropertyType(#[from] UnknownPropertyType),
    #[error("no benchmark: {0}")]
    NotFound(#[from] BenchmarkMiss),
    /// Body or query string could not be extracted.
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },
}

impl From<JsonRejection> for ApiError {
    fn from(r: JsonRejection) -> Self {
        ApiError::Rejected {
            status: r.status(),
            message: r.body_text(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(r: QueryRejection) -> Self {
        ApiError::Rejected {
            status: r.status(),
            message: r.body_text(),
        }
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) | ApiError::UnknownPropertyType(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::BadImage { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Rejected { status, .. } => *status,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'static str>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let reason = match &self {
            ApiError::NotFound(miss) => Some(miss.reason()),
            _ => None,
        };
        let body = ErrorBody {
            success: false,
            error: self.to_string(),
            reason,
        };
        (self.status(), Json(body)).into_response()
    }
}

#[derive(Deserialize)]
struct ImageReq {
    #[serde(default = "default_media_type")]
    media_type: String,
    data_base64: String,
}

fn default_media_type() -> String {
    "image/jpeg".to_string()
}

#[derive(Deserialize)]
struct AnalyzeReq {
    title: String,
    description: String,
    price: u32,
    locality: String,
    city: String,
    property_type: PropertyType,
    #[serde(default)]
    contact_number: Option<String>,
    #[serde(default)]
    images: Vec<ImageReq>,
}

impl AnalyzeReq {
    fn into_submission(self) -> Result<ListingSubmission, ApiError> {
        if self.price == 0 {
            return Err(ApiError::InvalidInput("price must be greater than 0".into()));
        }
        for (field, value) in [
            ("title", &self.title),
            ("city", &self.city),
            ("locality", &self.locality),
        ] {
            if value.trim().is_empty() {
                return Err(ApiError::InvalidInput(format!("{field} must not be blank")));
            }
        }

        let images = self
            .images
            .into_iter()
            .enumerate()
            .map(|(index, img)| {
                STANDARD
                    .decode(strip_data_url(&img.data_base64))
                    .map(|bytes| ImageInput {
                        media_type: img.media_type,
                        bytes,
                    })
                    .map_err(|_| ApiError::BadImage { index })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ListingSubmission {
            listing: ListingAttributes::new(self.price, self.city, self.locality, self.property_type),
            title: self.title,
            description: self.description,
            contact_number: self.contact_number,
            images,
        })
    }
}

/// Accepts both bare base64 and `data:<type>;base64,<payload>`.
fn strip_data_url(s: &str) -> &str {
    let s = s.trim();
    match s.split_once(";base64,") {
        Some((prefix, payload)) if prefix.starts_with("data:") => payload,
        _ => s,
    }
}

async fn analyze(
    State(state): State<AppState>,
    body: Result<Json<AnalyzeReq>, JsonRejection>,
) -> Result<Json<ListingReport>, ApiError> {
    let Json(body) = body?;
    let submission = body.into_submission()?;
    Ok(Json(state.analyzer.analyze(&submission).await))
}

#[derive(Deserialize)]
struct BenchmarkQuery {
    city: String,
    locality: String,
    property_type: String,
}

#[derive(Serialize)]
struct BenchmarkOut {
    city: String,
    locality: String,
    property_type: PropertyType,
    #[serde(flatten)]
    entry: BenchmarkEntry,
}

async fn benchmark(
    State(state): State<AppState>,
    query: Result<Query<BenchmarkQuery>, QueryRejection>,
) -> Result<Json<BenchmarkOut>, ApiError> {
    let Query(q) = query?;
    let property_type: PropertyType = q.property_type.parse()?;
    let entry = state
        .benchmarks
        .lookup(&q.city, &q.locality, property_type)?;
    debug!(city = %q.city, locality = %q.locality, %property_type, "benchmark served");
    Ok(Json(BenchmarkOut {
        city: q.city,
        locality: q.locality,
        property_type,
        entry,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_prefix_is_stripped() {
        assert_eq!(strip_data_url("data:image/png;base64,AAAA"), "AAAA");
        assert_eq!(strip_data_url(" AAAA "), "AAAA");
    }

    #[test]
    fn miss_maps_to_404_with_reason() {
        let e = ApiError::from(BenchmarkMiss::City {
            city: "Pune".into(),
        });
        assert_eq!(e.status(), StatusCode::NOT_FOUND);
        assert_eq!(e.to_string(), "no benchmark: city 'Pune' not found");
    }
}
