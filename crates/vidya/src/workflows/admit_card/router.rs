use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::Local;
use serde::Deserialize;
use serde_json::json;

use super::directory::SchoolDirectory;
use super::domain::{ClassId, ExamId, SchoolId, StudentId};
use super::fees::FeeLedger;
use super::service::{AdmitCardError, AdmitCardService, PaymentRequest};
use super::settings::{AdmitCardSettings, SettingsStore};
use super::store::AdmitCardStore;

/// Router builder exposing the admit card HTTP surface.
pub fn admit_card_router<S, D, L, C>(service: Arc<AdmitCardService<S, D, L, C>>) -> Router
where
    S: SettingsStore + 'static,
    D: SchoolDirectory + 'static,
    L: FeeLedger + 'static,
    C: AdmitCardStore + 'static,
{
    Router::new()
        .route(
            "/admit-card/student/:school_id/:student_id",
            get(overview_handler::<S, D, L, C>),
        )
        .route(
            "/admit-card/generate/:school_id/:exam_id/:student_id",
            get(generate_handler::<S, D, L, C>),
        )
        .route(
            "/admit-card/pay-and-download",
            post(pay_and_download_handler::<S, D, L, C>),
        )
        .route(
            "/admit-card/settings/:school_id",
            get(settings_handler::<S, D, L, C>),
        )
        .route(
            "/admit-card/settings",
            post(save_settings_handler::<S, D, L, C>),
        )
        .route("/admit-card/exams/:school_id", get(exams_handler::<S, D, L, C>))
        .route(
            "/admit-card/generate-bulk",
            post(bulk_handler::<S, D, L, C>),
        )
        .with_state(service)
}

/// Body for `POST /admit-card/settings`.
#[derive(Debug, Deserialize)]
pub struct SaveSettingsRequest {
    pub school_id: SchoolId,
    #[serde(flatten)]
    pub settings: AdmitCardSettings,
}

/// Body for `POST /admit-card/generate-bulk`.
#[derive(Debug, Deserialize)]
pub struct BulkGenerateRequest {
    pub school_id: SchoolId,
    pub exam_id: ExamId,
    pub class_id: ClassId,
    #[serde(default)]
    pub force: bool,
}

pub(crate) async fn overview_handler<S, D, L, C>(
    State(service): State<Arc<AdmitCardService<S, D, L, C>>>,
    Path((school_id, student_id)): Path<(String, String)>,
) -> Response
where
    S: SettingsStore + 'static,
    D: SchoolDirectory + 'static,
    L: FeeLedger + 'static,
    C: AdmitCardStore + 'static,
{
    let today = Local::now().date_naive();
    match service.student_overview(&SchoolId(school_id), &StudentId(student_id), today) {
        Ok(overview) => (StatusCode::OK, axum::Json(overview)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn generate_handler<S, D, L, C>(
    State(service): State<Arc<AdmitCardService<S, D, L, C>>>,
    Path((school_id, exam_id, student_id)): Path<(String, String, String)>,
) -> Response
where
    S: SettingsStore + 'static,
    D: SchoolDirectory + 'static,
    L: FeeLedger + 'static,
    C: AdmitCardStore + 'static,
{
    match service.generate(
        &SchoolId(school_id),
        &ExamId(exam_id),
        &StudentId(student_id),
    ) {
        Ok(record) => (StatusCode::OK, axum::Json(record.view())).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn pay_and_download_handler<S, D, L, C>(
    State(service): State<Arc<AdmitCardService<S, D, L, C>>>,
    axum::Json(request): axum::Json<PaymentRequest>,
) -> Response
where
    S: SettingsStore + 'static,
    D: SchoolDirectory + 'static,
    L: FeeLedger + 'static,
    C: AdmitCardStore + 'static,
{
    match service.pay_and_generate(request) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome.view())).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn settings_handler<S, D, L, C>(
    State(service): State<Arc<AdmitCardService<S, D, L, C>>>,
    Path(school_id): Path<String>,
) -> Response
where
    S: SettingsStore + 'static,
    D: SchoolDirectory + 'static,
    L: FeeLedger + 'static,
    C: AdmitCardStore + 'static,
{
    let settings = service.settings(&SchoolId(school_id));
    (StatusCode::OK, axum::Json(settings)).into_response()
}

pub(crate) async fn save_settings_handler<S, D, L, C>(
    State(service): State<Arc<AdmitCardService<S, D, L, C>>>,
    axum::Json(request): axum::Json<SaveSettingsRequest>,
) -> Response
where
    S: SettingsStore + 'static,
    D: SchoolDirectory + 'static,
    L: FeeLedger + 'static,
    C: AdmitCardStore + 'static,
{
    match service.save_settings(&request.school_id, request.settings) {
        Ok(saved) => (StatusCode::OK, axum::Json(saved)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn exams_handler<S, D, L, C>(
    State(service): State<Arc<AdmitCardService<S, D, L, C>>>,
    Path(school_id): Path<String>,
) -> Response
where
    S: SettingsStore + 'static,
    D: SchoolDirectory + 'static,
    L: FeeLedger + 'static,
    C: AdmitCardStore + 'static,
{
    let today = Local::now().date_naive();
    match service.exams(&SchoolId(school_id), today) {
        Ok(exams) => (StatusCode::OK, axum::Json(exams)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn bulk_handler<S, D, L, C>(
    State(service): State<Arc<AdmitCardService<S, D, L, C>>>,
    axum::Json(request): axum::Json<BulkGenerateRequest>,
) -> Response
where
    S: SettingsStore + 'static,
    D: SchoolDirectory + 'static,
    L: FeeLedger + 'static,
    C: AdmitCardStore + 'static,
{
    match service
        .bulk_generate(
            &request.school_id,
            &request.exam_id,
            &request.class_id,
            request.force,
        )
        .await
    {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(err) => err.into_response(),
    }
}

impl IntoResponse for AdmitCardError {
    fn into_response(self) -> Response {
        let status = match &self {
            AdmitCardError::InvalidSettings(_) | AdmitCardError::InvalidAmount => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AdmitCardError::SchoolNotFound(_)
            | AdmitCardError::ExamNotFound(_)
            | AdmitCardError::StudentNotFound(_)
            | AdmitCardError::ClassNotFound(_)
            | AdmitCardError::ExamNotForClass { .. } => StatusCode::NOT_FOUND,
            AdmitCardError::NotEligible {
                min_amount_required,
            } => {
                // Carries the exact shortfall so the client can route
                // straight into pay-and-download.
                let payload = json!({
                    "error": self.to_string(),
                    "is_generated": false,
                    "min_amount_required": min_amount_required,
                });
                return (StatusCode::PAYMENT_REQUIRED, axum::Json(payload)).into_response();
            }
            AdmitCardError::Payment(_) => StatusCode::BAD_GATEWAY,
            AdmitCardError::Ledger(_)
            | AdmitCardError::Directory(_)
            | AdmitCardError::SettingsStore(_) => StatusCode::SERVICE_UNAVAILABLE,
            AdmitCardError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let payload = json!({
            "error": self.to_string(),
        });
        (status, axum::Json(payload)).into_response()
    }
}
