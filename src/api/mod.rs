use axum::{
    Router,
    extract::{Json, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::core::{
    LoanParameters, RawScheduleRequest, ScheduleResult, SchedulerConfig, ValidationError,
    YearRecord, normalize, run_schedule,
};
use crate::history::{InMemoryUsageStore, NewUsageRecord, StoreError, UsageStore, UserId};

/// Header carrying the submitter's identity. Authentication happens upstream;
/// this service only keys usage history by it.
pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn UsageStore>,
    pub config: SchedulerConfig,
}

impl AppState {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            store: Arc::new(InMemoryUsageStore::new()),
            config,
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("x-user-id header is required")]
    MissingUser,

    #[error("x-user-id header must be a positive integer")]
    InvalidUser,

    #[error("usage history unavailable: {0}")]
    Store(#[from] StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::Validation(_) | ApiError::InvalidUser => StatusCode::BAD_REQUEST,
            ApiError::MissingUser => StatusCode::UNAUTHORIZED,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        error_response(status, &self.to_string())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyPayoutView {
    pub year: u32,
    pub monthly_amount: f64,
    pub months_in_year: u32,
    pub disbursed: f64,
    pub interest_accrued: f64,
    pub property_value: f64,
    pub property_appreciation: f64,
    pub ltv_percentage: f64,
}

/// Schedule as shown to a person: whole currency units, percentages to two
/// decimals.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleResponse {
    pub usage_record_id: Option<u64>,
    pub interest_rate: f64,
    pub ltv_ratio: f64,
    pub total_loan_amount: f64,
    pub max_loan_amount: f64,
    pub total_disbursed: f64,
    pub total_interest: f64,
    pub total_appreciation: f64,
    pub final_property_value: f64,
    pub months_possible: u32,
    pub tenure_years: u32,
    pub tenure_months: u32,
    pub yearly_payouts: Vec<YearlyPayoutView>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/api/schedule",
            get(schedule_get_handler).post(schedule_post_handler),
        )
        .route("/api/usage/history", get(history_handler))
        .fallback(not_found_handler)
        .with_state(state)
}

pub async fn run_http_server(port: u16, config: SchedulerConfig) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = router(AppState::new(config));

    let listener = TcpListener::bind(addr).await?;
    info!("payout HTTP API listening on http://{addr}");
    info!(
        ltv_tolerance_points = config.ltv_tolerance_points,
        max_tenure_months = config.max_tenure_months,
        "scheduler configuration"
    );

    axum::serve(listener, app).await
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, HealthResponse { status: "ok" })
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn schedule_get_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(payload): Query<RawScheduleRequest>,
) -> Result<Response, ApiError> {
    schedule_handler_impl(&state, &headers, &payload)
}

async fn schedule_post_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RawScheduleRequest>,
) -> Result<Response, ApiError> {
    schedule_handler_impl(&state, &headers, &payload)
}

fn schedule_handler_impl(
    state: &AppState,
    headers: &HeaderMap,
    payload: &RawScheduleRequest,
) -> Result<Response, ApiError> {
    let user_id = user_id_from_headers(headers)?;
    let params = normalize(payload).inspect_err(|e| warn!("rejected schedule request: {e}"))?;
    let result = run_schedule(&params, &state.config);
    info!(
        years = result.years.len(),
        months = result.total_months_possible,
        total_loan_amount = result.total_loan_amount,
        "schedule computed"
    );

    let usage_record_id = match user_id {
        Some(user_id) => Some(store_usage(state, user_id, &params, &result)?),
        None => None,
    };

    let response = build_schedule_response(&params, &result, usage_record_id);
    Ok(json_response(StatusCode::OK, response))
}

fn store_usage(
    state: &AppState,
    user_id: UserId,
    params: &LoanParameters,
    result: &ScheduleResult,
) -> Result<u64, ApiError> {
    let stored = state
        .store
        .store_usage_record(NewUsageRecord {
            user_id,
            parameters: params.clone(),
            result: result.clone(),
        })
        .inspect_err(|e| error!(user_id, "failed to store usage record: {e}"))?;
    info!(user_id, record_id = stored.id, "usage record stored");
    Ok(stored.id)
}

async fn history_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let user_id = user_id_from_headers(&headers)?.ok_or(ApiError::MissingUser)?;
    let records = state.store.list_usage_records(user_id)?;
    Ok(json_response(StatusCode::OK, records))
}

fn user_id_from_headers(headers: &HeaderMap) -> Result<Option<UserId>, ApiError> {
    let Some(value) = headers.get(USER_ID_HEADER) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse::<UserId>().ok())
        .filter(|&id| id > 0)
        .map(Some)
        .ok_or(ApiError::InvalidUser)
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

fn round_currency(value: f64) -> f64 {
    value.round()
}

fn round_percent(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn year_view(record: &YearRecord) -> YearlyPayoutView {
    YearlyPayoutView {
        year: record.year,
        monthly_amount: round_currency(record.monthly_amount),
        months_in_year: record.months_in_year,
        disbursed: round_currency(record.disbursed_this_year),
        interest_accrued: round_currency(record.interest_accrued_this_year),
        property_value: round_currency(record.property_value_at_year_start),
        property_appreciation: round_currency(record.appreciation_this_year),
        ltv_percentage: round_percent(record.ltv_percentage),
    }
}

pub fn build_schedule_response(
    params: &LoanParameters,
    result: &ScheduleResult,
    usage_record_id: Option<u64>,
) -> ScheduleResponse {
    ScheduleResponse {
        usage_record_id,
        interest_rate: round_percent(params.interest_rate * 100.0),
        ltv_ratio: round_percent(params.ltv_ratio * 100.0),
        total_loan_amount: round_currency(result.total_loan_amount),
        max_loan_amount: round_currency(result.max_loan_amount),
        total_disbursed: round_currency(result.total_disbursed),
        total_interest: round_currency(result.total_interest),
        total_appreciation: round_currency(result.total_appreciation),
        final_property_value: round_currency(result.final_property_value),
        months_possible: result.total_months_possible,
        tenure_years: result.total_months_possible / 12,
        tenure_months: result.total_months_possible % 12,
        yearly_payouts: result.years.iter().map(year_view).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    const SAMPLE_JSON: &str = r#"{
        "propertyValue": "1,50,00,000",
        "appreciationRate": "3",
        "requiredMonthlyAmount": "45,000",
        "payoutAdjustmentType": "annual",
        "annualIncreaseRate": "0",
        "ltvRatio": "60",
        "interestRate": "9.5",
        "tenureType": "maxLTV"
    }"#;

    fn sample_state() -> AppState {
        AppState::new(SchedulerConfig::default())
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.expect("router responds");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body readable");
        let json = serde_json::from_slice(&bytes).expect("json body");
        (status, json)
    }

    fn post_schedule(body: &str, user_id: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/schedule")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(id) = user_id {
            builder = builder.header(USER_ID_HEADER, id);
        }
        builder.body(Body::from(body.to_string())).expect("request")
    }

    fn get_history(user_id: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/api/usage/history");
        if let Some(id) = user_id {
            builder = builder.header(USER_ID_HEADER, id);
        }
        builder.body(Body::empty()).expect("request")
    }

    #[test]
    fn build_schedule_response_rounds_for_presentation() {
        let raw: RawScheduleRequest = serde_json::from_str(SAMPLE_JSON).expect("valid json");
        let params = normalize(&raw).expect("valid params");
        let result = run_schedule(&params, &SchedulerConfig::default());
        let response = build_schedule_response(&params, &result, None);

        assert_approx(response.interest_rate, 9.5);
        assert_approx(response.ltv_ratio, 60.0);
        assert_eq!(response.months_possible, 156);
        assert_eq!(response.tenure_years, 13);
        assert_eq!(response.tenure_months, 0);
        assert_eq!(response.yearly_payouts.len(), result.years.len());

        let first = &response.yearly_payouts[0];
        assert_approx(first.disbursed, 540_000.0);
        assert_approx(first.interest_accrued, 25_650.0);
        assert_approx(first.ltv_percentage, 3.77);
        assert_eq!(response.total_disbursed, result.total_disbursed.round());
        assert!(response.total_interest.fract() == 0.0);
    }

    #[test]
    fn api_error_maps_to_status_codes() {
        let validation: ApiError = ValidationError::NotPositive {
            field: "propertyValue",
        }
        .into();
        assert_eq!(
            validation.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::MissingUser.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Store(StoreError::Poisoned).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn user_id_header_is_optional_but_must_parse() {
        let mut headers = HeaderMap::new();
        assert!(matches!(user_id_from_headers(&headers), Ok(None)));

        headers.insert(USER_ID_HEADER, "42".parse().unwrap());
        assert!(matches!(user_id_from_headers(&headers), Ok(Some(42))));

        headers.insert(USER_ID_HEADER, "abc".parse().unwrap());
        assert!(matches!(
            user_id_from_headers(&headers),
            Err(ApiError::InvalidUser)
        ));

        headers.insert(USER_ID_HEADER, "0".parse().unwrap());
        assert!(user_id_from_headers(&headers).is_err());
    }

    #[tokio::test]
    async fn post_schedule_returns_rounded_schedule() {
        let (status, json) = send(router(sample_state()), post_schedule(SAMPLE_JSON, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["monthsPossible"], 156);
        assert_eq!(json["usageRecordId"], Value::Null);
        assert_eq!(json["yearlyPayouts"].as_array().map(Vec::len), Some(13));
        assert_eq!(json["yearlyPayouts"][0]["disbursed"], 540_000.0);
        assert_eq!(json["totalDisbursed"], 7_020_000.0);
    }

    #[tokio::test]
    async fn get_schedule_accepts_query_string() {
        let uri = "/api/schedule?propertyValue=1%2C00%2C00%2C000&appreciationRate=2\
                   &requiredMonthlyAmount=25000&payoutAdjustmentType=block&blockPeriod=5\
                   &blockIncreaseRate=10&ltvRatio=50&interestRate=10&tenureType=fixed\
                   &fixedTenureMonths=36";
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let (status, json) = send(router(sample_state()), request).await;
        assert_eq!(status, StatusCode::OK, "{json}");
        assert_eq!(json["monthsPossible"], 36);
        assert_eq!(json["tenureYears"], 3);
        assert_eq!(json["yearlyPayouts"][2]["monthlyAmount"], 25_000.0);
    }

    #[tokio::test]
    async fn invalid_input_returns_bad_request_with_field_name() {
        let body = SAMPLE_JSON.replace("\"9.5\"", "\"18\"");
        let (status, json) = send(router(sample_state()), post_schedule(&body, None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let message = json["error"].as_str().expect("error message");
        assert!(message.contains("interestRate"), "{message}");
    }

    #[tokio::test]
    async fn schedule_with_user_is_listed_in_history_newest_first() {
        let state = sample_state();

        let (status, first) =
            send(router(state.clone()), post_schedule(SAMPLE_JSON, Some("9"))).await;
        assert_eq!(status, StatusCode::OK);
        let second_body = SAMPLE_JSON.replace("\"45,000\"", "\"40,000\"");
        let (_, second) =
            send(router(state.clone()), post_schedule(&second_body, Some("9"))).await;
        send(router(state.clone()), post_schedule(SAMPLE_JSON, Some("10"))).await;

        let (status, history) = send(router(state), get_history(Some("9"))).await;
        assert_eq!(status, StatusCode::OK);
        let records = history.as_array().expect("array of records");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["id"], second["usageRecordId"]);
        assert_eq!(records[1]["id"], first["usageRecordId"]);
        assert_eq!(records[0]["parameters"]["monthlyPayoutBase"], 40_000.0);
        assert!(records[0]["result"]["years"].is_array());
    }

    #[tokio::test]
    async fn history_requires_user_header() {
        let (status, json) = send(router(sample_state()), get_history(None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(json["error"].as_str().is_some());
    }

    #[tokio::test]
    async fn unknown_route_is_json_not_found() {
        let request = Request::builder().uri("/nope").body(Body::empty()).unwrap();
        let (status, json) = send(router(sample_state()), request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "Not found");
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, json) = send(router(sample_state()), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
    }
}
