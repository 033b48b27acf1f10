use chrono::{Datelike, NaiveDate, NaiveDateTime};

/// Maximum number of non-cancelled appointments per slot window per date.
pub const SLOT_CAPACITY: i64 = 3;

/// A bookable time window. `start`/`end` are (hour, minute) offsets from
/// local midnight and define the occupancy window; `duration_minutes` is
/// what gets stored on the appointment. The two are configured
/// independently and are not required to agree.
#[derive(Debug, Clone, Copy)]
pub struct SlotDef {
    pub key: &'static str,
    pub label: &'static str,
    pub start: (u32, u32),
    pub end: (u32, u32),
    pub duration_minutes: i32,
}

pub static WEEKDAY_SLOTS: [SlotDef; 5] = [
    SlotDef {
        key: "08-10",
        label: "8:00 – 10:00",
        start: (8, 0),
        end: (10, 0),
        duration_minutes: 120,
    },
    SlotDef {
        key: "10-30_12",
        label: "10:30 – 12:00",
        start: (10, 30),
        end: (12, 0),
        duration_minutes: 90,
    },
    SlotDef {
        key: "12-30_14",
        label: "12:30 – 2:00",
        start: (12, 30),
        end: (14, 0),
        duration_minutes: 90,
    },
    SlotDef {
        key: "14-16",
        label: "2:00 – 4:00",
        start: (14, 0),
        end: (16, 0),
        duration_minutes: 120,
    },
    SlotDef {
        key: "16-30_18",
        label: "4:30 – 6:00",
        start: (16, 30),
        end: (18, 0),
        duration_minutes: 90,
    },
];

pub static NIGHT_SLOTS: [SlotDef; 2] = [
    SlotDef {
        key: "18-30_20",
        label: "6:30 – 8:00 pm",
        start: (18, 30),
        end: (20, 0),
        duration_minutes: 90,
    },
    SlotDef {
        key: "20-22",
        label: "8:00 – 10:00 pm",
        start: (20, 0),
        end: (22, 0),
        duration_minutes: 120,
    },
];

impl SlotDef {
    /// Absolute occupancy window for this slot on the given date.
    pub fn window(&self, date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
        let (sh, sm) = self.start;
        let (eh, em) = self.end;
        (at(date, sh, sm), at(date, eh, em))
    }
}

fn at(date: NaiveDate, hour: u32, minute: u32) -> NaiveDateTime {
    date.and_hms_opt(hour, minute, 0)
        .expect("slot schedule holds valid times")
}

pub fn is_weekday(date: NaiveDate) -> bool {
    date.weekday().number_from_monday() <= 5
}

/// Slots bookable on `date`: the weekday schedule Mon–Fri, with the night
/// schedule appended on any day when night mode is on. Weekends without
/// night mode have nothing bookable.
pub fn candidate_slots(date: NaiveDate, night: bool) -> Vec<&'static SlotDef> {
    let mut slots: Vec<&'static SlotDef> = Vec::new();
    if is_weekday(date) {
        slots.extend(WEEKDAY_SLOTS.iter());
    }
    if night {
        slots.extend(NIGHT_SLOTS.iter());
    }
    slots
}

pub fn find_slot(date: NaiveDate, night: bool, key: &str) -> Option<&'static SlotDef> {
    candidate_slots(date, night).into_iter().find(|s| s.key == key)
}
