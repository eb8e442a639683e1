use chrono::{DateTime, TimeZone, Utc};

/// Strips trailing slashes so paths can be appended with a leading `/`.
pub fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

pub fn utc_now() -> DateTime<Utc> {
    Utc::now()
}

pub fn timestamp_to_utc(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}
