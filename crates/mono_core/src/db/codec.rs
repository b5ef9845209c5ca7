//! Column codecs shared by SQLite repositories.
//!
//! # Invariants
//! - Dates persist as `YYYY-MM-DD`, times as `HH:MM:SS` (sub-second precision
//!   is dropped).
//! - String lists persist as a JSON array; an empty list is stored as `NULL`
//!   and both `NULL` and `[]` decode to an empty list.
//! - Booleans persist as `0`/`1`; anything else is rejected on read.

use chrono::{NaiveDate, NaiveTime, Timelike};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";

/// Encodes a reference list (attachments, recordings) for one TEXT column.
pub fn encode_string_list(values: &[String]) -> serde_json::Result<Option<String>> {
    if values.is_empty() {
        return Ok(None);
    }
    serde_json::to_string(values).map(Some)
}

/// Decodes a reference list column value.
pub fn decode_string_list(raw: Option<&str>) -> serde_json::Result<Vec<String>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(Vec::new()),
        Some(text) => serde_json::from_str(text),
    }
}

pub fn date_to_db(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).ok()
}

pub fn time_to_db(time: NaiveTime) -> String {
    time.with_nanosecond(0)
        .unwrap_or(time)
        .format(TIME_FORMAT)
        .to_string()
}

pub fn parse_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, TIME_FORMAT).ok()
}

pub fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

pub fn int_to_bool(value: i64) -> Option<bool> {
    match value {
        0 => Some(false),
        1 => Some(true),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        decode_string_list, encode_string_list, int_to_bool, parse_date, parse_time, time_to_db,
    };
    use chrono::NaiveTime;

    #[test]
    fn empty_list_is_stored_as_null_and_null_decodes_to_empty() {
        assert_eq!(encode_string_list(&[]).unwrap(), None);
        assert!(decode_string_list(None).unwrap().is_empty());
        assert!(decode_string_list(Some("[]")).unwrap().is_empty());
        assert!(decode_string_list(Some("  ")).unwrap().is_empty());
    }

    #[test]
    fn list_keeps_order_and_special_characters() {
        let values = vec![
            "content://media/1".to_string(),
            "rec \"two\".m4a".to_string(),
        ];
        let encoded = encode_string_list(&values).unwrap().unwrap();
        assert_eq!(decode_string_list(Some(encoded.as_str())).unwrap(), values);
    }

    #[test]
    fn malformed_list_is_an_error() {
        assert!(decode_string_list(Some("{not json")).is_err());
        assert!(decode_string_list(Some("[1, 2]")).is_err());
    }

    #[test]
    fn time_drops_sub_second_precision() {
        let time = NaiveTime::from_hms_milli_opt(9, 30, 15, 250).unwrap();
        assert_eq!(time_to_db(time), "09:30:15");
    }

    #[test]
    fn invalid_scalars_are_rejected() {
        assert!(parse_date("2024-02-30").is_none());
        assert!(parse_time("25:00:00").is_none());
        assert_eq!(int_to_bool(2), None);
    }
}
