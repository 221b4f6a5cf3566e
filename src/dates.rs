//! Conversion of loosely formatted date text into the 1900-epoch serial-day
//! numbering used by the destination workbook, including the historical
//! leap-year-bug adjustment for dates on or after March 1900.

use chrono::NaiveDate;

/// Upper bound on the day offset the serial scheme is defined for. Offsets
/// beyond this are treated as out of range rather than wrapped.
const MAX_SERIAL_DAYS: i64 = 290 * 364;

fn epoch() -> NaiveDate {
    // Day before 1899-12-31 is serial 0; the literal is always valid.
    NaiveDate::from_ymd_opt(1899, 12, 31).expect("valid epoch literal")
}

fn leap_bug_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(1900, 3, 1).expect("valid literal")
}

/// Converts a calendar date to its serial-day number.
///
/// Dates before the epoch map to 0. Dates whose offset exceeds the scheme's
/// duration cap return `None` (out of range).
pub fn date_to_serial(date: NaiveDate) -> Option<i64> {
    let days = (date - epoch()).num_days();
    if days < 0 {
        return Some(0);
    }
    if days > MAX_SERIAL_DAYS {
        return None;
    }
    // Reproduce the legacy convention that counts the nonexistent
    // 1900-02-29 as a day.
    if date >= leap_bug_start() {
        Some(days + 1)
    } else {
        Some(days)
    }
}

/// Normalizes date text into a serial-day number.
///
/// Accepts `YYYY.MM.DD`, `YYYY/MM/DD`, and `YYYYMMDD`, with single-digit
/// month or day zero-padded. Returns `None` when the text does not match a
/// recognized shape, is not a real calendar date, or falls outside the
/// serial range; callers keep the original text in that case.
pub fn normalize_date(raw: &str) -> Option<i64> {
    let parts: Vec<&str> = raw
        .split(['.', '/'])
        .filter(|part| !part.is_empty())
        .collect();

    let digits = match parts.as_slice() {
        [single] if single.len() == 8 => (*single).to_string(),
        [year, month, day] if year.len() == 4 => {
            if month.is_empty() || month.len() > 2 || day.is_empty() || day.len() > 2 {
                return None;
            }
            format!("{year}{month:0>2}{day:0>2}")
        }
        _ => return None,
    };

    let date = NaiveDate::parse_from_str(&digits, "%Y%m%d").ok()?;
    date_to_serial(date)
}
