//! Spanish date normalization helpers shared by the extractors.

use chrono::NaiveDate;

/// Month number from a Spanish month name or abbreviation.
///
/// Matches on the first three letters, case-insensitively, so "Ene",
/// "ene", "enero" and "Sept." all resolve. "set" is the Costa Rican
/// spelling of September.
pub fn spanish_month(name: &str) -> Option<u32> {
    let lowered = name.trim().trim_end_matches('.').to_lowercase();
    let key: String = lowered.chars().take(3).collect();
    let month = match key.as_str() {
        "ene" => 1,
        "feb" => 2,
        "mar" => 3,
        "abr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "ago" => 8,
        "sep" | "set" => 9,
        "oct" => 10,
        "nov" => 11,
        "dic" => 12,
        _ => return None,
    };
    Some(month)
}

/// Expand 2-digit years to 20xx.
pub fn year_from_str(s: &str) -> Option<i32> {
    let year: i32 = s.trim().parse().ok()?;
    Some(if year < 100 { 2000 + year } else { year })
}

/// Parse a day/month/year date.
///
/// Tries `%d/%m/%Y` first; bodies that use dashes or 2-digit years go
/// through the manual fallback.
pub fn parse_dmy(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%d/%m/%Y") {
        return Some(date);
    }

    let normalized = s.replace('-', "/");
    let parts: Vec<&str> = normalized.split('/').collect();
    if parts.len() != 3 {
        return None;
    }
    let day: u32 = parts[0].trim().parse().ok()?;
    let month: u32 = parts[1].trim().parse().ok()?;
    let year = year_from_str(parts[2])?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Build a date from textual Spanish parts (`"5"`, `"ene"`, `"2025"`).
pub fn from_spanish_parts(day: &str, month: &str, year: &str) -> Option<NaiveDate> {
    let day: u32 = day.trim().parse().ok()?;
    let month = spanish_month(month)?;
    let year = year_from_str(year)?;
    NaiveDate::from_ymd_opt(year, month, day)
}
