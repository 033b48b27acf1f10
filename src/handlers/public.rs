use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::slot::SLOT_CAPACITY;
use crate::services::scheduling::{self, BookingRequest, SlotAvailability};
use crate::state::AppState;

// GET /public/appointments/availability?date=YYYY-MM-DD
#[derive(Deserialize)]
pub struct AvailabilityQuery {
    pub date: Option<String>,
}

#[derive(Serialize)]
pub struct AvailabilityResponse {
    date: String,
    night: bool,
    capacity: i64,
    slots: Vec<SlotAvailability>,
}

pub async fn get_availability(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let raw = query
        .date
        .ok_or_else(|| AppError::Validation("date query parameter is required".into()))?;
    let date = scheduling::parse_date(&raw)?;

    let night = state.settings.night_enabled();
    let slots = {
        let db = state.db.lock().unwrap();
        scheduling::compute_availability(&db, date, night)?
    };

    Ok(Json(AvailabilityResponse {
        date: date.format("%Y-%m-%d").to_string(),
        night,
        capacity: SLOT_CAPACITY,
        slots,
    }))
}

// POST /public/appointments
#[derive(Deserialize)]
pub struct CreateAppointmentRequest {
    pub client_full_name: Option<String>,
    pub client_phone: Option<String>,
    pub service_id: Option<String>,
    pub date: Option<String>,
    pub slot_key: Option<String>,
    pub notes: Option<String>,
}

pub async fn create_appointment(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateAppointmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let req = BookingRequest {
        full_name: body.client_full_name.unwrap_or_default(),
        phone: body.client_phone.unwrap_or_default(),
        service_id: body.service_id,
        date: body.date.unwrap_or_default(),
        slot_key: body.slot_key.unwrap_or_default(),
        notes: body.notes,
    };

    let night = state.settings.night_enabled();
    let (appointment, client) = {
        let db = state.db.lock().unwrap();
        scheduling::create_booking(&db, &req, night)?
    };

    tracing::info!(
        appointment_id = %appointment.id,
        scheduled_at = %appointment.scheduled_at,
        "appointment booked"
    );

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "appointment": appointment, "client": client })),
    ))
}
