use std::time::{SystemTime, UNIX_EPOCH};

use chrono::NaiveDate;

pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_millis() as u64
}

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}
