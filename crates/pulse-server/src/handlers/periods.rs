//! Health and period discovery handlers

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::{AppError, AppState};
use pulse_core::{DataOrigin, PeriodPreset, PeriodWindow};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// One selectable period preset
#[derive(Debug, Serialize)]
pub struct PeriodOption {
    pub id: &'static str,
    pub label: &'static str,
    /// Concrete dates, when the preset resolves against the loaded records
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<PeriodWindow>,
}

#[derive(Debug, Serialize)]
pub struct PeriodsResponse {
    pub presets: Vec<PeriodOption>,
    /// First and last invoice dates of the loaded records
    pub extent: Option<PeriodWindow>,
    pub origin: DataOrigin,
    pub fallback_used: bool,
}

/// GET /api/health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET /api/periods - Presets with their resolved windows
pub async fn list_periods(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PeriodsResponse>, AppError> {
    let loaded = state
        .cache
        .get_or_load(&state.config.source)
        .map_err(AppError::from_core)?;

    let presets = PeriodPreset::all()
        .iter()
        .map(|preset| PeriodOption {
            id: preset.as_str(),
            label: preset.label(),
            window: preset.resolve(&loaded.records).ok(),
        })
        .collect();

    Ok(Json(PeriodsResponse {
        presets,
        extent: PeriodWindow::extent(&loaded.records),
        origin: loaded.origin.clone(),
        fallback_used: loaded.fallback_used,
    }))
}
