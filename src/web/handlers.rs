//! Request handlers for the form page and the JSON API

use crate::error::{ModelError, RecordError};
use crate::types::transaction::{TransactionRecord, TransactionType};
use crate::types::verdict::Verdict;
use crate::web::error::ApiResult;
use crate::web::render::{render_page, FormValues, Outcome};
use crate::web::AppState;
use actix_web::http::{header::ContentType, StatusCode};
use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// Raw form submission. Every field is optional text so that bad input
/// can be reported next to the values the user typed.
#[derive(Debug, Default, Deserialize)]
pub struct AnalyzeForm {
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
    pub amount: Option<String>,
    #[serde(rename = "oldbalanceOrg")]
    pub sender_old_balance: Option<String>,
    #[serde(rename = "newbalanceOrig")]
    pub sender_new_balance: Option<String>,
    #[serde(rename = "oldbalanceDest")]
    pub receiver_old_balance: Option<String>,
    #[serde(rename = "newbalanceDest")]
    pub receiver_new_balance: Option<String>,
}

impl AnalyzeForm {
    /// Values to echo back into the form
    pub fn values(&self) -> FormValues {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        FormValues {
            transaction_type: text(&self.transaction_type),
            amount: text(&self.amount),
            sender_old_balance: text(&self.sender_old_balance),
            sender_new_balance: text(&self.sender_new_balance),
            receiver_old_balance: text(&self.receiver_old_balance),
            receiver_new_balance: text(&self.receiver_new_balance),
        }
    }

    /// Build a validated record from the submitted text
    pub fn to_record(&self) -> Result<TransactionRecord, RecordError> {
        let transaction_type: TransactionType = required("type", &self.transaction_type)?.parse()?;
        TransactionRecord::new(
            transaction_type,
            number("amount", &self.amount)?,
            number("oldbalanceOrg", &self.sender_old_balance)?,
            number("newbalanceOrig", &self.sender_new_balance)?,
            number("oldbalanceDest", &self.receiver_old_balance)?,
            number("newbalanceDest", &self.receiver_new_balance)?,
        )
    }
}

fn required<'a>(field: &'static str, raw: &'a Option<String>) -> Result<&'a str, RecordError> {
    raw.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(RecordError::Missing { field })
}

fn number(field: &'static str, raw: &Option<String>) -> Result<f64, RecordError> {
    let raw = required(field, raw)?;
    raw.parse().map_err(|_| RecordError::NotANumber {
        field,
        value: raw.to_string(),
    })
}

fn html(status: StatusCode, page: String) -> HttpResponse {
    HttpResponse::build(status)
        .content_type(ContentType::html())
        .body(page)
}

/// Render the empty form
pub async fn index(state: web::Data<AppState>) -> HttpResponse {
    let notice = state.engine.model().unavailable_notice();
    html(
        StatusCode::OK,
        render_page(&FormValues::default(), None, notice),
    )
}

/// Handle the form trigger and render one outcome
pub async fn analyze_form(
    state: web::Data<AppState>,
    form: web::Form<AnalyzeForm>,
) -> HttpResponse {
    let engine = &state.engine;
    let values = form.values();

    let record = match form.to_record() {
        Ok(record) => record,
        Err(e) => {
            engine.metrics().record_invalid();
            debug!(error = %e, "Rejected form submission");
            let notice = engine.model().unavailable_notice();
            return html(
                StatusCode::UNPROCESSABLE_ENTITY,
                render_page(&values, Some(&Outcome::Invalid(e.to_string())), notice),
            );
        }
    };

    // Re-render normalised values so the form shows what was analysed
    let values = FormValues::from(&record);

    match engine.analyze(&record) {
        Ok(analysis) => html(
            StatusCode::OK,
            render_page(&values, Some(&Outcome::Verdict(analysis.verdict)), None),
        ),
        Err(e @ ModelError::ResourceUnavailable { .. }) => html(
            StatusCode::SERVICE_UNAVAILABLE,
            render_page(&values, None, Some(e.to_string().as_str())),
        ),
        Err(e @ ModelError::Prediction(_)) => html(
            StatusCode::INTERNAL_SERVER_ERROR,
            render_page(&values, Some(&Outcome::Error(e.to_string())), None),
        ),
    }
}

/// JSON analysis reply
#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub request_id: Uuid,
    pub verdict: Verdict,
    pub label: i64,
    pub processing_time_us: u64,
    pub timestamp: DateTime<Utc>,
}

/// Classify a JSON record
pub async fn analyze_json(
    state: web::Data<AppState>,
    req: web::Json<TransactionRecord>,
) -> ApiResult<HttpResponse> {
    let record = req.into_inner();
    if let Err(e) = record.validate() {
        state.engine.metrics().record_invalid();
        return Err(e.into());
    }

    let analysis = state.engine.analyze(&record)?;

    Ok(HttpResponse::Ok().json(AnalyzeResponse {
        request_id: analysis.request_id,
        verdict: analysis.verdict,
        label: analysis.verdict.label(),
        processing_time_us: analysis.elapsed.as_micros() as u64,
        timestamp: Utc::now(),
    }))
}

#[derive(Debug, Serialize)]
struct ModelStatus<'a> {
    resource: &'a str,
    available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    notice: Option<&'a str>,
}

/// Model availability and request counters
pub async fn status(state: web::Data<AppState>) -> HttpResponse {
    let model = state.engine.model();
    let model_status = ModelStatus {
        resource: model.resource(),
        available: model.is_available(),
        notice: model.unavailable_notice(),
    };
    HttpResponse::Ok().json(serde_json::json!({
        "model": model_status,
        "metrics": state.engine.metrics().snapshot(),
    }))
}
