//! REST handlers for the dashboard, LTV, export, and operational
//! endpoints.
//!
//! Handlers resolve `today` once from the wall clock and thread it through
//! the pipeline; the core never reads the clock itself.

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{NaiveDate, Utc};
use pulse_core::types::{RenewalStatus, SourceKind, TrendGranularity};
use pulse_ingest::{refresh, RecordSource, SnapshotStore};
use pulse_pipeline::{apply, classify_all, normalize_all, ClassifiedRecord, DateRange, FilterState};
use pulse_reporting::export::export_csv;
use pulse_reporting::{
    accumulate, enrollment_overview, filter_customers, renewal_overview, CustomerValue,
    EnrollmentOverview, RenewalOverview,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Shared application state for REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SnapshotStore>,
    pub source: Arc<dyn RecordSource>,
    pub node_id: String,
    pub start_time: Instant,
}

/// Raw query parameters accepted by the view endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ViewQuery {
    pub range: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
    pub granularity: Option<String>,
    pub course: Option<String>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn bad_request(message: String) -> ApiError {
    metrics::counter!("api.validation_errors").increment(1);
    warn!(error = %message, "Query validation failed");
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: "invalid_query".to_string(),
            message,
        }),
    )
}

/// Empty and `All` select nothing, matching the upstream UI's sentinel
/// option values.
fn constraint(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
}

fn parse_bound(value: &Option<String>, name: &str) -> Result<Option<NaiveDate>, String> {
    match constraint(value) {
        None => Ok(None),
        Some(text) => text
            .parse::<NaiveDate>()
            .map(Some)
            .map_err(|_| format!("invalid {name} date: {text}")),
    }
}

/// Validate and resolve the date-range selection at the API boundary.
fn parse_range(query: &ViewQuery) -> Result<DateRange, String> {
    match constraint(&query.range) {
        None => Ok(DateRange::All),
        Some("today") => Ok(DateRange::Today),
        Some("yesterday") => Ok(DateRange::Yesterday),
        Some("last7") => Ok(DateRange::LastDays(7)),
        Some("last30") => Ok(DateRange::LastDays(30)),
        Some("this_month") => Ok(DateRange::ThisMonth),
        Some("last_month") => Ok(DateRange::LastMonth),
        Some("custom") => Ok(DateRange::Custom {
            start: parse_bound(&query.start, "start")?,
            end: parse_bound(&query.end, "end")?,
        }),
        Some(other) => Err(format!("unknown range: {other}")),
    }
}

fn parse_filter(query: &ViewQuery) -> Result<FilterState, String> {
    let status = match constraint(&query.status) {
        None => None,
        Some(text) => Some(text.parse::<RenewalStatus>()?),
    };

    Ok(FilterState {
        status,
        category: constraint(&query.category).map(str::to_string),
        range: parse_range(query)?,
    })
}

fn parse_granularity(query: &ViewQuery) -> Result<TrendGranularity, String> {
    match constraint(&query.granularity) {
        None => Ok(TrendGranularity::Daily),
        Some(text) => text.parse::<TrendGranularity>(),
    }
}

fn classified_view(
    state: &AppState,
    kind: SourceKind,
    today: NaiveDate,
) -> Vec<ClassifiedRecord> {
    let raws = state.store.records(kind);
    classify_all(normalize_all(&raws, kind), today)
}

/// GET /v1/enrollments/dashboard — filtered enrollment overview.
pub async fn enrollment_dashboard(
    State(state): State<AppState>,
    Query(query): Query<ViewQuery>,
) -> Result<Json<EnrollmentOverview>, ApiError> {
    let filter = parse_filter(&query).map_err(bad_request)?;
    let today = Utc::now().date_naive();

    let records = classified_view(&state, SourceKind::Enrollment, today);
    let filtered = apply(&records, &filter, today);

    metrics::counter!("api.enrollment_dashboard").increment(1);
    Ok(Json(enrollment_overview(&filtered)))
}

/// GET /v1/renewals/dashboard — filtered renewal overview with trends.
pub async fn renewal_dashboard(
    State(state): State<AppState>,
    Query(query): Query<ViewQuery>,
) -> Result<Json<RenewalOverview>, ApiError> {
    let filter = parse_filter(&query).map_err(bad_request)?;
    let granularity = parse_granularity(&query).map_err(bad_request)?;
    let today = Utc::now().date_naive();

    let records = classified_view(&state, SourceKind::Renewal, today);
    let filtered = apply(&records, &filter, today);

    metrics::counter!("api.renewal_dashboard").increment(1);
    Ok(Json(renewal_overview(&filtered, granularity)))
}

/// GET /v1/ltv — per-customer lifetime value rows.
pub async fn ltv_dashboard(
    State(state): State<AppState>,
    Query(query): Query<ViewQuery>,
) -> Result<Json<Vec<CustomerValue>>, ApiError> {
    let range = parse_range(&query).map_err(bad_request)?;
    let today = Utc::now().date_naive();

    let enrollments = normalize_all(
        &state.store.records(SourceKind::Enrollment),
        SourceKind::Enrollment,
    );
    let renewals = normalize_all(&state.store.records(SourceKind::Renewal), SourceKind::Renewal);

    let rows = accumulate(&enrollments, &renewals);
    let filtered = filter_customers(&rows, constraint(&query.course), &range, today);

    metrics::counter!("api.ltv_dashboard").increment(1);
    Ok(Json(filtered))
}

const EXPORT_COLUMNS: &[&str] = &["Name", "Course", "Start Date", "End Date", "Amount", "Status"];

/// GET /v1/renewals/export — CSV of the filtered renewal table.
pub async fn renewal_export(
    State(state): State<AppState>,
    Query(query): Query<ViewQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = parse_filter(&query).map_err(bad_request)?;
    let granularity = parse_granularity(&query).map_err(bad_request)?;
    let today = Utc::now().date_naive();

    let records = classified_view(&state, SourceKind::Renewal, today);
    let filtered = apply(&records, &filter, today);
    let overview = renewal_overview(&filtered, granularity);

    let rows: Vec<HashMap<String, serde_json::Value>> = overview
        .rows
        .iter()
        .map(|row| {
            HashMap::from([
                ("Name".to_string(), row.student.clone().into()),
                ("Course".to_string(), row.course.clone().into()),
                ("Start Date".to_string(), row.start_date.clone().into()),
                ("End Date".to_string(), row.end_date.clone().into()),
                ("Amount".to_string(), row.amount_paid.into()),
                ("Status".to_string(), row.status.label().into()),
            ])
        })
        .collect();

    metrics::counter!("api.renewal_export").increment(1);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"renewals.csv\"",
            ),
        ],
        export_csv(EXPORT_COLUMNS, &rows),
    ))
}

#[derive(Serialize)]
pub struct RefreshResponse {
    pub generation: u64,
    pub enrollments: usize,
    pub renewals: usize,
    pub stale: bool,
}

/// POST /v1/refresh — on-demand refetch of both sources. Superseded
/// responses are discarded by the snapshot store's generation guard.
pub async fn trigger_refresh(State(state): State<AppState>) -> Json<RefreshResponse> {
    let outcome = refresh(state.source.as_ref(), &state.store).await;
    info!(
        generation = outcome.generation,
        enrollments = outcome.enrollment_count,
        renewals = outcome.renewal_count,
        stale = outcome.stale,
        "Refresh complete"
    );
    metrics::counter!("api.refresh").increment(1);
    Json(RefreshResponse {
        generation: outcome.generation,
        enrollments: outcome.enrollment_count,
        renewals: outcome.renewal_count,
        stale: outcome.stale,
    })
}

/// GET /health — Health check endpoint.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        node_id: state.node_id.clone(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        last_refreshed: state.store.last_refreshed().map(|t| t.to_rfc3339()),
    })
}

/// GET /ready — Readiness probe. 200 only once at least one snapshot has
/// been installed, so a fresh node does not serve empty dashboards.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.store.last_refreshed().is_some() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /live — Liveness probe.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub node_id: String,
    pub uptime_secs: u64,
    pub last_refreshed: Option<String>,
}
