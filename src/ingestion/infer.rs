//! Schema inference and scalar parsing shared by the CSV and Excel loaders.
//!
//! A column's inferred type is the narrowest [`DataType`] that fits every non-missing value:
//! `Int64` widens to `Float64`, any other conflict widens to `Utf8`, and a column with no
//! non-missing values is `Utf8`.
//!
//! A text cell is missing when it is empty, whitespace-only, or one of [`MISSING_TOKENS`]
//! (matched exactly after trimming).

use chrono::{Days, NaiveDate, NaiveDateTime};

use crate::error::{PipelineError, PipelineResult};
use crate::types::{DataType, Field, Schema};

/// Text cells read as a missing value.
pub const MISSING_TOKENS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// True for empty / whitespace-only text and for [`MISSING_TOKENS`].
pub(crate) fn is_missing_str(raw: &str) -> bool {
    let s = raw.trim();
    s.is_empty() || MISSING_TOKENS.contains(&s)
}

/// Classify a raw text cell. Returns `None` for missing input.
pub(crate) fn classify_str(raw: &str) -> Option<DataType> {
    if is_missing_str(raw) {
        return None;
    }
    let s = raw.trim();
    if s.parse::<i64>().is_ok() {
        return Some(DataType::Int64);
    }
    // `f64::from_str` also accepts "nan"/"inf"; only treat digit-bearing text as numeric.
    if s.bytes().any(|b| b.is_ascii_digit()) && s.parse::<f64>().is_ok() {
        return Some(DataType::Float64);
    }
    if s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("false") {
        return Some(DataType::Bool);
    }
    if parse_date_str(s).is_some() {
        return Some(DataType::Date);
    }
    Some(DataType::Utf8)
}

/// Merge an observed type into a column's running type.
pub(crate) fn widen(current: Option<DataType>, observed: DataType) -> DataType {
    match current {
        None => observed,
        Some(cur) if cur == observed => cur,
        Some(cur) if cur.is_numeric() && observed.is_numeric() => DataType::Float64,
        Some(_) => DataType::Utf8,
    }
}

/// Header label for column `idx`; blank headers get a positional name.
pub(crate) fn header_name(raw: &str, idx: usize) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        format!("Unnamed: {idx}")
    } else {
        trimmed.to_owned()
    }
}

/// Build a schema from header labels and the per-column running types.
pub(crate) fn schema_from_observed(
    headers: Vec<String>,
    types: Vec<Option<DataType>>,
) -> PipelineResult<Schema> {
    let fields = headers
        .into_iter()
        .zip(types.into_iter().chain(std::iter::repeat(None)))
        .map(|(name, ty)| Field::new(name, ty.unwrap_or(DataType::Utf8)))
        .collect();
    let schema = Schema::new(fields);
    schema.validate()?;
    Ok(schema)
}

/// Parse `YYYY-MM-DD`, optionally followed by a time part (`T` or space separated).
pub(crate) fn parse_date_str(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.date())
}

/// Convert an Excel serial day number (1900 date system) to a date.
pub(crate) fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_days(Days::new(serial.floor() as u64))
}

pub(crate) fn parse_bool_str(s: &str) -> Result<bool, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "y" => Ok(true),
        "false" | "f" | "0" | "no" | "n" => Ok(false),
        _ => Err("expected bool (true/false/1/0/yes/no)".to_string()),
    }
}

pub(crate) fn empty_schema_error() -> PipelineError {
    PipelineError::SchemaMismatch {
        message: "input has no header row (no columns found)".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_str_picks_narrowest_type() {
        assert_eq!(classify_str(" 42 "), Some(DataType::Int64));
        assert_eq!(classify_str("4.5"), Some(DataType::Float64));
        assert_eq!(classify_str("TRUE"), Some(DataType::Bool));
        assert_eq!(classify_str("2024-01-02"), Some(DataType::Date));
        assert_eq!(classify_str("Nan"), Some(DataType::Utf8));
        assert_eq!(classify_str("   "), None);
    }

    #[test]
    fn missing_tokens_are_not_classified() {
        for token in ["NA", " N/A ", "NaN", "nan", "-NaN", "null", "NULL", "None", "#N/A", "<NA>"] {
            assert!(is_missing_str(token), "{token:?}");
            assert_eq!(classify_str(token), None, "{token:?}");
        }
        assert!(!is_missing_str("Nan"));
        assert!(!is_missing_str("NAME"));
    }

    #[test]
    fn widen_promotes_ints_and_falls_back_to_text() {
        assert_eq!(widen(None, DataType::Int64), DataType::Int64);
        assert_eq!(widen(Some(DataType::Int64), DataType::Float64), DataType::Float64);
        assert_eq!(widen(Some(DataType::Date), DataType::Int64), DataType::Utf8);
    }

    #[test]
    fn dates_parse_with_or_without_time() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert_eq!(parse_date_str("2024-01-02"), Some(d));
        assert_eq!(parse_date_str("2024-01-02 13:45:00"), Some(d));
        assert_eq!(parse_date_str("2024-01-02T13:45:00"), Some(d));
        assert_eq!(parse_date_str("01/02/2024"), None);
    }

    #[test]
    fn excel_serials_map_to_calendar_dates() {
        // 45293 is 2024-01-02 in the 1900 date system.
        assert_eq!(
            excel_serial_to_date(45293.0),
            NaiveDate::from_ymd_opt(2024, 1, 2)
        );
        assert_eq!(excel_serial_to_date(-1.0), None);
    }

    #[test]
    fn blank_headers_get_positional_names() {
        assert_eq!(header_name("  ", 3), "Unnamed: 3");
        assert_eq!(header_name(" Score ", 0), "Score");
    }
}
