use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub full_name: String,
    pub phone: String,
    pub created_at: NaiveDateTime,
}

/// Strips everything but digits. Returns `None` unless the result is the
/// 11-digit local mobile format customers are identified by.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() == 11 {
        Some(digits)
    } else {
        None
    }
}
