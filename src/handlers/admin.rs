use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::AppointmentStatus;
use crate::services::settings::NIGHT_ENABLED_KEY;
use crate::state::AppState;

fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if token != expected_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

// GET /api/admin/appointments
#[derive(Deserialize)]
pub struct AppointmentsQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Serialize)]
pub struct AppointmentResponse {
    id: String,
    customer_name: String,
    customer_phone: String,
    service_id: Option<String>,
    staff_id: Option<String>,
    scheduled_at: String,
    duration_minutes: i32,
    status: String,
    notes: Option<String>,
    created_at: String,
    updated_at: String,
}

pub async fn get_appointments(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<AppointmentsQuery>,
) -> Result<Json<Vec<AppointmentResponse>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let limit = query.limit.unwrap_or(50);
    let status_filter = query.status.as_deref();

    let rows = {
        let db = state.db.lock().unwrap();
        queries::list_appointments(&db, status_filter, limit)
            .map_err(|e| AppError::Store(e.to_string()))?
    };

    let response: Vec<AppointmentResponse> = rows
        .into_iter()
        .map(|r| AppointmentResponse {
            id: r.appointment.id,
            customer_name: r.customer_name,
            customer_phone: r.customer_phone,
            service_id: r.appointment.service_id,
            staff_id: r.appointment.staff_id,
            scheduled_at: r
                .appointment
                .scheduled_at
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
            duration_minutes: r.appointment.duration_minutes,
            status: r.appointment.status.as_str().to_string(),
            notes: r.appointment.notes,
            created_at: r.appointment.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            updated_at: r.appointment.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        })
        .collect();

    Ok(Json(response))
}

// POST /api/admin/appointments/:id/confirm
pub async fn confirm_appointment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    set_status(&state, &id, AppointmentStatus::Confirmed)
}

// POST /api/admin/appointments/:id/cancel
pub async fn cancel_appointment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    set_status(&state, &id, AppointmentStatus::Cancelled)
}

fn set_status(
    state: &AppState,
    id: &str,
    status: AppointmentStatus,
) -> Result<Json<serde_json::Value>, AppError> {
    let updated = {
        let db = state.db.lock().unwrap();
        queries::update_appointment_status(&db, id, &status)
            .map_err(|e| AppError::Store(e.to_string()))?
    };

    if updated {
        Ok(Json(
            serde_json::json!({ "ok": true, "status": status.as_str() }),
        ))
    } else {
        Err(AppError::NotFound(format!("appointment {id}")))
    }
}

// GET /api/admin/settings
#[derive(Serialize)]
pub struct SettingsResponse {
    night_enabled: bool,
}

pub async fn get_settings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<SettingsResponse>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    Ok(Json(SettingsResponse {
        night_enabled: state.settings.night_enabled(),
    }))
}

// POST /api/admin/settings
#[derive(Deserialize)]
pub struct UpdateSettingsRequest {
    pub night_enabled: Option<bool>,
}

pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<UpdateSettingsRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    if let Some(enabled) = body.night_enabled {
        let db = state.db.lock().unwrap();
        queries::set_setting(&db, NIGHT_ENABLED_KEY, if enabled { "1" } else { "0" })
            .map_err(|e| AppError::Store(e.to_string()))?;
        tracing::info!(night_enabled = enabled, "night schedule toggled");
    }

    Ok(Json(serde_json::json!({
        "ok": true,
        "night_enabled": state.settings.night_enabled(),
    })))
}
