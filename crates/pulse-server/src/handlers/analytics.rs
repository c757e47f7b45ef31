//! Dashboard and analytics handlers

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{AppError, AppState};
use pulse_core::{
    compute_kpis, forecast, forecast_alerts, monthly_series, synthesize, year_over_year,
    Aggregates, Alert, AlertPanel, Algorithm, Dashboard, DashboardRequest, Focus, Forecast,
    ForecastConfig, KpiSet, LoadedRecords, MonthlyPoint, PeriodSelection, PeriodWindow,
    SalesRecord, Widget, YearOverYear,
};

/// Query parameters shared by the analytics endpoints
#[derive(Debug, Default, Deserialize)]
pub struct AnalyticsQuery {
    /// Preset name (all, year-2021, q1-2021, last-6-months, extent)
    pub period: Option<String>,
    /// Custom window start (YYYY-MM-DD), requires `to`
    pub from: Option<String>,
    /// Custom window end (YYYY-MM-DD), requires `from`
    pub to: Option<String>,
    pub focus: Option<String>,
    /// Overrides the configured forecast algorithm
    pub algorithm: Option<String>,
}

impl AnalyticsQuery {
    fn to_request(&self, defaults: &ForecastConfig) -> Result<DashboardRequest, AppError> {
        let period = PeriodSelection::from_params(
            self.period.as_deref(),
            self.from.as_deref(),
            self.to.as_deref(),
        )
        .map_err(AppError::from_core)?;

        let focus = match &self.focus {
            Some(name) => name
                .parse::<Focus>()
                .map_err(|e| AppError::bad_request(&e))?,
            None => Focus::default(),
        };

        let mut forecast = defaults.clone();
        if let Some(name) = &self.algorithm {
            forecast.algorithm = name
                .parse::<Algorithm>()
                .map_err(|e| AppError::bad_request(&e))?;
        }

        Ok(DashboardRequest {
            period,
            focus,
            forecast,
        })
    }
}

/// The records of one resolved request
struct Selection {
    loaded: Arc<LoadedRecords>,
    request: DashboardRequest,
    window: PeriodWindow,
    filtered: Vec<SalesRecord>,
}

fn select(state: &AppState, params: &AnalyticsQuery) -> Result<Selection, AppError> {
    let request = params.to_request(&state.config.forecast)?;
    let loaded = state
        .cache
        .get_or_load(&state.config.source)
        .map_err(AppError::from_core)?;
    let window = request
        .period
        .resolve(&loaded.records)
        .map_err(AppError::from_core)?;
    let filtered = window.filter(&loaded.records);

    Ok(Selection {
        loaded,
        request,
        window,
        filtered,
    })
}

#[derive(Debug, Serialize)]
pub struct KpiResponse {
    pub period: PeriodWindow,
    pub records: usize,
    pub kpis: KpiSet,
    pub growth: Widget<YearOverYear>,
}

#[derive(Debug, Serialize)]
pub struct ForecastResponse {
    pub period: PeriodWindow,
    pub algorithm: Algorithm,
    pub monthly: Vec<MonthlyPoint>,
    pub forecast: Forecast,
    pub alerts: Vec<Alert>,
}

#[derive(Debug, Serialize)]
pub struct AlertsResponse {
    pub period: PeriodWindow,
    pub alerts: AlertPanel,
}

#[derive(Debug, Serialize)]
pub struct InsightsResponse {
    pub period: PeriodWindow,
    pub focus: Focus,
    pub insights: Vec<String>,
}

/// GET /api/dashboard - Every widget for one period
///
/// Widgets that cannot render are reported as unavailable rather than
/// failing the request; only malformed parameters are rejected.
pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AnalyticsQuery>,
) -> Result<Json<Dashboard>, AppError> {
    let request = params.to_request(&state.config.forecast)?;
    let loaded = state
        .cache
        .get_or_load(&state.config.source)
        .map_err(AppError::from_core)?;

    Ok(Json(Dashboard::build(&loaded, &request)))
}

/// GET /api/kpis - Period totals against the historical baseline
pub async fn get_kpis(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AnalyticsQuery>,
) -> Result<Json<KpiResponse>, AppError> {
    let selection = select(&state, &params)?;
    let full = &selection.loaded.records;
    let kpis = compute_kpis(&selection.filtered, full).map_err(AppError::from_core)?;

    Ok(Json(KpiResponse {
        period: selection.window,
        records: selection.filtered.len(),
        kpis,
        growth: Widget::from_result("growth", year_over_year(&selection.filtered, full)),
    }))
}

/// GET /api/forecast - Monthly series and next-month prediction
pub async fn get_forecast(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AnalyticsQuery>,
) -> Result<Json<ForecastResponse>, AppError> {
    let selection = select(&state, &params)?;
    let monthly = monthly_series(&selection.filtered);
    let config = &selection.request.forecast;
    let prediction = forecast(&monthly, config).map_err(AppError::from_core)?;

    Ok(Json(ForecastResponse {
        period: selection.window,
        algorithm: config.algorithm,
        alerts: forecast_alerts(&prediction),
        monthly,
        forecast: prediction,
    }))
}

/// GET /api/alerts - Every alert family for the period
pub async fn get_alerts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AnalyticsQuery>,
) -> Result<Json<AlertsResponse>, AppError> {
    let selection = select(&state, &params)?;
    let request = DashboardRequest {
        period: PeriodSelection::Custom {
            window: selection.window,
        },
        ..selection.request
    };
    let dashboard = Dashboard::build(&selection.loaded, &request);

    Ok(Json(AlertsResponse {
        period: selection.window,
        alerts: dashboard.alerts,
    }))
}

/// GET /api/insights - Narrative insights for the requested focus
pub async fn get_insights(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AnalyticsQuery>,
) -> Result<Json<InsightsResponse>, AppError> {
    let selection = select(&state, &params)?;
    let prediction = forecast(
        &monthly_series(&selection.filtered),
        &selection.request.forecast,
    )
    .map_err(AppError::from_core)?;
    let aggregates =
        Aggregates::compute(&selection.filtered, prediction).map_err(AppError::from_core)?;
    let focus = selection.request.focus;

    Ok(Json(InsightsResponse {
        period: selection.window,
        focus,
        insights: synthesize(focus, &aggregates),
    }))
}
