use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::customer::normalize_phone;
use crate::models::slot::{self, SLOT_CAPACITY};
use crate::models::{Appointment, AppointmentStatus, Customer};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SlotAvailability {
    pub key: &'static str,
    pub label: &'static str,
    pub duration: i32,
    pub booked: i64,
    pub capacity: i64,
    pub available: i64,
    pub start: String,
}

/// Accepts anything whose first 10 characters are a `YYYY-MM-DD` date.
/// Longer strings (e.g. full timestamps) are truncated, the rest must
/// parse strictly.
pub fn parse_date(raw: &str) -> Result<NaiveDate, AppError> {
    let head: String = raw.chars().take(10).collect();
    NaiveDate::parse_from_str(&head, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("invalid date: {raw}")))
}

/// Read-only availability for one date. A date with no candidate slots
/// (a weekend with night mode off) yields an empty list, not an error.
pub fn compute_availability(
    conn: &Connection,
    date: NaiveDate,
    night: bool,
) -> Result<Vec<SlotAvailability>, AppError> {
    let candidates = slot::candidate_slots(date, night);
    if candidates.is_empty() {
        return Ok(vec![]);
    }

    let day_start = date.and_hms_opt(0, 0, 0).expect("midnight is valid");
    let day_end = day_start + Duration::days(1);
    let appointments = queries::get_appointments_in_range(conn, &day_start, &day_end)
        .map_err(|e| AppError::Store(e.to_string()))?;

    let slots = candidates
        .into_iter()
        .map(|s| {
            let (start, end) = s.window(date);
            let booked = count_occupied(&appointments, &start, &end);
            SlotAvailability {
                key: s.key,
                label: s.label,
                duration: s.duration_minutes,
                booked,
                capacity: SLOT_CAPACITY,
                available: (SLOT_CAPACITY - booked).max(0),
                start: start.format("%Y-%m-%dT%H:%M:%S").to_string(),
            }
        })
        .collect();

    Ok(slots)
}

/// Non-cancelled appointments whose start falls in `[start, end)`.
fn count_occupied(appointments: &[Appointment], start: &NaiveDateTime, end: &NaiveDateTime) -> i64 {
    appointments
        .iter()
        .filter(|a| {
            a.status != AppointmentStatus::Cancelled
                && a.scheduled_at >= *start
                && a.scheduled_at < *end
        })
        .count() as i64
}

#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub full_name: String,
    pub phone: String,
    pub service_id: Option<String>,
    pub date: String,
    pub slot_key: String,
    pub notes: Option<String>,
}

pub fn create_booking(
    conn: &Connection,
    req: &BookingRequest,
    night: bool,
) -> Result<(Appointment, Customer), AppError> {
    let full_name = req.full_name.trim();
    if full_name.is_empty() {
        return Err(AppError::Validation("client_full_name is required".into()));
    }
    if req.phone.trim().is_empty() {
        return Err(AppError::Validation("client_phone is required".into()));
    }
    let phone = normalize_phone(&req.phone).ok_or(AppError::InvalidPhone)?;
    if req.date.trim().is_empty() {
        return Err(AppError::Validation("date is required".into()));
    }
    if req.slot_key.trim().is_empty() {
        return Err(AppError::Validation("slot_key is required".into()));
    }

    let date = parse_date(&req.date)?;
    // Candidates are recomputed under the current night setting, never
    // reused from an earlier availability call.
    let slot = slot::find_slot(date, night, &req.slot_key)
        .ok_or_else(|| AppError::InvalidSlot(req.slot_key.clone()))?;

    let (start, end) = slot.window(date);
    let existing = queries::get_appointments_in_range(conn, &start, &end)
        .map_err(|e| AppError::Store(e.to_string()))?;
    if count_occupied(&existing, &start, &end) >= SLOT_CAPACITY {
        return Err(AppError::NoCapacity);
    }

    let customer = find_or_create_customer(conn, full_name, &phone)?;

    let now = Utc::now().naive_utc();
    let appointment = Appointment {
        id: Uuid::new_v4().to_string(),
        customer_id: customer.id.clone(),
        service_id: req.service_id.clone(),
        staff_id: None,
        scheduled_at: start,
        duration_minutes: slot.duration_minutes,
        status: AppointmentStatus::Scheduled,
        notes: req.notes.clone(),
        created_at: now,
        updated_at: now,
    };
    queries::create_appointment(conn, &appointment)
        .map_err(|e| AppError::Store(e.to_string()))?;

    Ok((appointment, customer))
}

fn find_or_create_customer(
    conn: &Connection,
    full_name: &str,
    phone: &str,
) -> Result<Customer, AppError> {
    if let Some(customer) = queries::find_customer_by_phone(conn, phone)
        .map_err(|e| AppError::Store(e.to_string()))?
    {
        return Ok(customer);
    }

    let customer = Customer {
        id: Uuid::new_v4().to_string(),
        full_name: full_name.to_string(),
        phone: phone.to_string(),
        created_at: Utc::now().naive_utc(),
    };
    queries::create_customer(conn, &customer)
        .map_err(|e| AppError::Store(format!("failed to create customer: {e}")))?;
    Ok(customer)
}
