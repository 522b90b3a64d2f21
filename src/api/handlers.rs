//! REST API handlers for the cost dashboard
//!
//! Every endpoint accepts the filter query parameters `carrier`,
//! `product_category`, `warehouse_id`, `from` and `to`.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::service::DashboardService;
use crate::aggregate::{CostAggregates, Summary};
use crate::dashboard::{DataQuality, DashboardView, Filters, Section};
use crate::forecast::Forecast;
use crate::join::JoinedRow;
use crate::recommend::{Recommendation, Signals};

// ============================================================================
// Response Types (JSON-serializable versions)
// ============================================================================

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub order_id: String,
    pub order_date: NaiveDate,
    pub carrier: String,
    pub product_category: String,
    pub warehouse_id: String,
    pub route: String,
    pub order_value: Option<f64>,
    pub total_cost: Option<f64>,
    /// Percent of order value
    pub cost_to_value_pct: Option<f64>,
    pub delay_days: Option<f64>,
    pub customer_rating: Option<f64>,
}

impl From<JoinedRow> for OrderResponse {
    fn from(r: JoinedRow) -> Self {
        Self {
            order_id: r.order.order_id,
            order_date: r.order.order_date,
            carrier: r.order.carrier,
            product_category: r.order.product_category,
            warehouse_id: r.order.warehouse_id,
            route: r.route.name,
            order_value: r.order.order_value.map(round2),
            total_cost: r.total_cost.map(round2),
            cost_to_value_pct: r.cost_to_value.map(|v| (v * 1000.0).round() / 10.0),
            delay_days: r.delay_days,
            customer_rating: r.delivery.customer_rating,
        }
    }
}

#[derive(Serialize)]
pub struct OverviewResponse {
    pub summary: Section<Summary>,
    pub data_quality: DataQuality,
}

impl From<&DashboardView> for OverviewResponse {
    fn from(view: &DashboardView) -> Self {
        let summary = match &view.aggregates {
            Section::Ready(a) => Section::Ready(a.summary.clone()),
            Section::Unavailable { reason } => Section::unavailable(reason.clone()),
        };
        Self {
            summary,
            data_quality: view.data_quality.clone(),
        }
    }
}

#[derive(Serialize)]
pub struct RecommendationsResponse {
    pub signals: Signals,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Query Parameters
// ============================================================================

#[derive(Deserialize)]
pub struct FilterQuery {
    pub carrier: Option<String>,
    pub product_category: Option<String>,
    pub warehouse_id: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub limit: Option<usize>,
}

impl FilterQuery {
    fn filters(&self) -> Filters {
        // an empty parameter (`?carrier=`) selects everything
        let non_empty = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());
        Filters {
            carrier: non_empty(&self.carrier),
            product_category: non_empty(&self.product_category),
            warehouse_id: non_empty(&self.warehouse_id),
            from: self.from,
            to: self.to,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

pub type AppState = Arc<DashboardService>;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

fn internal_error(e: impl ToString) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

async fn view(
    service: &DashboardService,
    params: &FilterQuery,
) -> Result<Arc<DashboardView>, (StatusCode, Json<ErrorResponse>)> {
    service.get_view(params.filters()).await.map_err(internal_error)
}

/// GET /api/v1/health
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

/// GET /api/v1/dashboard
pub async fn get_dashboard(
    State(service): State<AppState>,
    Query(params): Query<FilterQuery>,
) -> ApiResult<DashboardView> {
    let view = view(&service, &params).await?;
    Ok(Json(view.as_ref().clone()))
}

/// GET /api/v1/overview
pub async fn get_overview(
    State(service): State<AppState>,
    Query(params): Query<FilterQuery>,
) -> ApiResult<OverviewResponse> {
    let view = view(&service, &params).await?;
    Ok(Json(OverviewResponse::from(view.as_ref())))
}

/// GET /api/v1/orders
pub async fn get_orders(
    State(service): State<AppState>,
    Query(params): Query<FilterQuery>,
) -> ApiResult<Vec<OrderResponse>> {
    let limit = params.limit.unwrap_or(100);
    match service.get_orders(params.filters(), limit).await {
        Ok(rows) => Ok(Json(rows.into_iter().map(OrderResponse::from).collect())),
        Err(e) => Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )),
    }
}

/// GET /api/v1/aggregates
pub async fn get_aggregates(
    State(service): State<AppState>,
    Query(params): Query<FilterQuery>,
) -> ApiResult<Section<CostAggregates>> {
    let view = view(&service, &params).await?;
    Ok(Json(view.aggregates.clone()))
}

/// GET /api/v1/forecast
pub async fn get_forecast(
    State(service): State<AppState>,
    Query(params): Query<FilterQuery>,
) -> ApiResult<Section<Forecast>> {
    let view = view(&service, &params).await?;
    Ok(Json(view.forecast.clone()))
}

/// GET /api/v1/recommendations
pub async fn get_recommendations(
    State(service): State<AppState>,
    Query(params): Query<FilterQuery>,
) -> ApiResult<RecommendationsResponse> {
    let view = view(&service, &params).await?;
    Ok(Json(RecommendationsResponse {
        signals: view.signals.clone(),
        recommendations: view.recommendations.clone(),
    }))
}
