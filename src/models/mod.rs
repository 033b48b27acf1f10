pub mod appointment;
pub mod customer;
pub mod slot;

pub use appointment::{Appointment, AppointmentStatus};
pub use customer::Customer;
pub use slot::{SlotDef, NIGHT_SLOTS, SLOT_CAPACITY, WEEKDAY_SLOTS};
