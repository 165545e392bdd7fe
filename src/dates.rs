use chrono::NaiveDate;

/// Turn `2024-03-09` into `March 9, 2024`.
///
/// Anything that does not parse as an ISO calendar date comes back unchanged.
pub fn prettify(iso_date: &str) -> String {
    match NaiveDate::parse_from_str(iso_date, "%Y-%m-%d") {
        Ok(date) => date.format("%B %-d, %Y").to_string(),
        Err(_) => iso_date.to_string(),
    }
}
