use chrono::{DateTime, Utc};

/// Hour bucket used to address the map tile overlay, `YYYYMMDDHH` in UTC
pub fn map_timestamp() -> String {
    map_timestamp_at(Utc::now())
}

pub fn map_timestamp_at(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d%H").to_string()
}
