use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection};

use crate::models::{Appointment, AppointmentStatus, Customer};

const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

// ── Customers ──

pub fn find_customer_by_phone(conn: &Connection, phone: &str) -> anyhow::Result<Option<Customer>> {
    let result = conn.query_row(
        "SELECT id, full_name, phone, created_at FROM customers WHERE phone = ?1",
        params![phone],
        |row| Ok(parse_customer_row(row)),
    );

    match result {
        Ok(customer) => Ok(Some(customer?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn create_customer(conn: &Connection, customer: &Customer) -> anyhow::Result<()> {
    let created_at = customer.created_at.format(DATETIME_FMT).to_string();
    conn.execute(
        "INSERT INTO customers (id, full_name, phone, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![customer.id, customer.full_name, customer.phone, created_at],
    )?;
    Ok(())
}

fn parse_customer_row(row: &rusqlite::Row) -> anyhow::Result<Customer> {
    let id: String = row.get(0)?;
    let full_name: String = row.get(1)?;
    let phone: String = row.get(2)?;
    let created_at_str: String = row.get(3)?;

    Ok(Customer {
        id,
        full_name,
        phone,
        created_at: parse_datetime(&created_at_str),
    })
}

// ── Appointments ──

pub fn create_appointment(conn: &Connection, appt: &Appointment) -> anyhow::Result<()> {
    let scheduled_at = appt.scheduled_at.format(DATETIME_FMT).to_string();
    let created_at = appt.created_at.format(DATETIME_FMT).to_string();
    let updated_at = appt.updated_at.format(DATETIME_FMT).to_string();

    conn.execute(
        "INSERT INTO appointments (id, customer_id, service_id, staff_id, scheduled_at, duration_minutes, status, notes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            appt.id,
            appt.customer_id,
            appt.service_id,
            appt.staff_id,
            scheduled_at,
            appt.duration_minutes,
            appt.status.as_str(),
            appt.notes,
            created_at,
            updated_at,
        ],
    )?;
    Ok(())
}

/// All appointments with `scheduled_at` in `[start, end)`, cancelled ones
/// included — callers filter by status themselves.
pub fn get_appointments_in_range(
    conn: &Connection,
    start: &NaiveDateTime,
    end: &NaiveDateTime,
) -> anyhow::Result<Vec<Appointment>> {
    let start_str = start.format(DATETIME_FMT).to_string();
    let end_str = end.format(DATETIME_FMT).to_string();

    let mut stmt = conn.prepare(
        "SELECT id, customer_id, service_id, staff_id, scheduled_at, duration_minutes, status, notes, created_at, updated_at
         FROM appointments WHERE scheduled_at >= ?1 AND scheduled_at < ?2 ORDER BY scheduled_at ASC",
    )?;

    let rows = stmt.query_map(params![start_str, end_str], |row| {
        Ok(parse_appointment_row(row))
    })?;

    let mut appointments = vec![];
    for row in rows {
        appointments.push(row??);
    }
    Ok(appointments)
}

pub fn get_appointment_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Appointment>> {
    let result = conn.query_row(
        "SELECT id, customer_id, service_id, staff_id, scheduled_at, duration_minutes, status, notes, created_at, updated_at
         FROM appointments WHERE id = ?1",
        params![id],
        |row| Ok(parse_appointment_row(row)),
    );

    match result {
        Ok(appt) => Ok(Some(appt?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn update_appointment_status(
    conn: &Connection,
    id: &str,
    status: &AppointmentStatus,
) -> anyhow::Result<bool> {
    let now = Utc::now().naive_utc().format(DATETIME_FMT).to_string();
    let count = conn.execute(
        "UPDATE appointments SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), now, id],
    )?;
    Ok(count > 0)
}

pub struct AppointmentListRow {
    pub appointment: Appointment,
    pub customer_name: String,
    pub customer_phone: String,
}

pub fn list_appointments(
    conn: &Connection,
    status_filter: Option<&str>,
    limit: i64,
) -> anyhow::Result<Vec<AppointmentListRow>> {
    let (sql, params_vec): (String, Vec<Box<dyn rusqlite::types::ToSql>>) = match status_filter {
        Some(status) => (
            "SELECT a.id, a.customer_id, a.service_id, a.staff_id, a.scheduled_at, a.duration_minutes, a.status, a.notes, a.created_at, a.updated_at, c.full_name, c.phone \
             FROM appointments a INNER JOIN customers c ON c.id = a.customer_id \
             WHERE a.status = ?1 ORDER BY a.scheduled_at DESC LIMIT ?2"
                .to_string(),
            vec![
                Box::new(status.to_string()) as Box<dyn rusqlite::types::ToSql>,
                Box::new(limit),
            ],
        ),
        None => (
            "SELECT a.id, a.customer_id, a.service_id, a.staff_id, a.scheduled_at, a.duration_minutes, a.status, a.notes, a.created_at, a.updated_at, c.full_name, c.phone \
             FROM appointments a INNER JOIN customers c ON c.id = a.customer_id \
             ORDER BY a.scheduled_at DESC LIMIT ?1"
                .to_string(),
            vec![Box::new(limit) as Box<dyn rusqlite::types::ToSql>],
        ),
    };

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| {
        let customer_name: String = row.get(10)?;
        let customer_phone: String = row.get(11)?;
        Ok((parse_appointment_row(row), customer_name, customer_phone))
    })?;

    let mut appointments = vec![];
    for row in rows {
        let (appt, customer_name, customer_phone) = row?;
        appointments.push(AppointmentListRow {
            appointment: appt?,
            customer_name,
            customer_phone,
        });
    }
    Ok(appointments)
}

fn parse_appointment_row(row: &rusqlite::Row) -> anyhow::Result<Appointment> {
    let id: String = row.get(0)?;
    let customer_id: String = row.get(1)?;
    let service_id: Option<String> = row.get(2)?;
    let staff_id: Option<String> = row.get(3)?;
    let scheduled_at_str: String = row.get(4)?;
    let duration_minutes: i32 = row.get(5)?;
    let status_str: String = row.get(6)?;
    let notes: Option<String> = row.get(7)?;
    let created_at_str: String = row.get(8)?;
    let updated_at_str: String = row.get(9)?;

    Ok(Appointment {
        id,
        customer_id,
        service_id,
        staff_id,
        scheduled_at: parse_datetime(&scheduled_at_str),
        duration_minutes,
        status: AppointmentStatus::parse(&status_str),
        notes,
        created_at: parse_datetime(&created_at_str),
        updated_at: parse_datetime(&updated_at_str),
    })
}

fn parse_datetime(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, DATETIME_FMT).unwrap_or_else(|_| Utc::now().naive_utc())
}

// ── Settings ──

pub fn get_setting(conn: &Connection, key: &str) -> anyhow::Result<Option<String>> {
    let result = conn.query_row(
        "SELECT value FROM settings WHERE key = ?1",
        params![key],
        |row| row.get::<_, String>(0),
    );

    match result {
        Ok(value) => Ok(Some(value)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn set_setting(conn: &Connection, key: &str, value: &str) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO settings (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')",
        params![key, value],
    )?;
    Ok(())
}
