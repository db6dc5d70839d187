//! HTTP surface: the transaction form and its JSON twin

pub mod error;
pub mod handlers;
pub mod render;

use crate::metrics::AnalysisMetrics;
use crate::models::inference::InferenceEngine;
use crate::models::loader::CachedModel;
use actix_web::{error::JsonPayloadError, web, Error, HttpRequest};
use std::sync::Arc;

/// Shared state handed to every request handler
pub struct AppState {
    pub engine: InferenceEngine,
}

impl AppState {
    pub fn new(model: Arc<CachedModel>, metrics: Arc<AnalysisMetrics>) -> Self {
        Self {
            engine: InferenceEngine::new(model, metrics),
        }
    }
}

/// JSON that decodes but does not form a record is a record error (422);
/// anything that is not parseable JSON stays a 400.
fn json_error(err: JsonPayloadError, req: &HttpRequest) -> Error {
    match err {
        JsonPayloadError::Deserialize(e) if e.is_data() => {
            if let Some(state) = req.app_data::<web::Data<AppState>>() {
                state.engine.metrics().record_invalid();
            }
            error::ApiError::InvalidRecord(e.to_string()).into()
        }
        other => error::ApiError::BadRequest(other.to_string()).into(),
    }
}

/// Register all routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
    .app_data(web::FormConfig::default().limit(16 * 1024))
    .route("/", web::get().to(handlers::index))
    .route("/analyze", web::post().to(handlers::analyze_form))
    .service(
        web::scope("/api/v1")
            .route("/analyze", web::post().to(handlers::analyze_json))
            .route("/status", web::get().to(handlers::status)),
    );
}
