//! Dynamically typed cell values at the API boundary
//!
//! `Worksheet::write` takes anything convertible into a [`Value`] and
//! dispatches on the variant; `Worksheet::read` returns one.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::rich_string::RichString;

const MS_PER_DAY: f64 = 86_400_000.0;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Text(String),
    Number(f64),
    Boolean(bool),
    DateTime(NaiveDateTime),
    Date(NaiveDate),
    Time(NaiveTime),
    Url(String),
    RichText(RichString),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) | Value::Url(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Text as a spreadsheet would roughly display it.
    pub fn display_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Text(s) | Value::Url(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Boolean(true) => "TRUE".to_string(),
            Value::Boolean(false) => "FALSE".to_string(),
            Value::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::Time(t) => t.format("%H:%M:%S").to_string(),
            Value::RichText(r) => r.to_plain_text(),
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Number(v as f64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Number(v as f64)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Number(v as f64)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        Value::Time(v)
    }
}

impl From<RichString> for Value {
    fn from(v: RichString) -> Self {
        Value::RichText(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

fn midnight(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Epoch for a serial day count. The 1900 system counts the nonexistent
/// 1900-02-29, so dates from March 1900 on are offset by one extra day.
fn epoch_for(date: NaiveDate, date1904: bool) -> NaiveDateTime {
    if date1904 {
        midnight(1904, 1, 1)
    } else if date < midnight(1900, 3, 1).date() {
        midnight(1899, 12, 31)
    } else {
        midnight(1899, 12, 30)
    }
}

/// Convert a date-time to a serial day count.
pub fn datetime_to_serial(dt: NaiveDateTime, date1904: bool) -> f64 {
    let epoch = epoch_for(dt.date(), date1904);
    (dt - epoch).num_milliseconds() as f64 / MS_PER_DAY
}

pub fn date_to_serial(date: NaiveDate, date1904: bool) -> f64 {
    datetime_to_serial(date.and_time(NaiveTime::MIN), date1904)
}

/// A time of day as a fraction of one day.
pub fn time_to_serial(time: NaiveTime) -> f64 {
    let ms = time.num_seconds_from_midnight() as f64 * 1000.0 + (time.nanosecond() / 1_000_000) as f64;
    ms / MS_PER_DAY
}

/// Convert a serial day count back to a date, time or date-time value.
///
/// Serials below one day are times; whole numbers are dates.
pub fn serial_to_value(serial: f64, date1904: bool) -> Option<Value> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let ms = (serial * MS_PER_DAY).round() as i64;
    if serial < 1.0 && !date1904 {
        let time = NaiveTime::MIN + Duration::milliseconds(ms);
        return Some(Value::Time(time));
    }
    let epoch = if date1904 {
        midnight(1904, 1, 1)
    } else if serial < 61.0 {
        midnight(1899, 12, 31)
    } else {
        midnight(1899, 12, 30)
    };
    let dt = epoch.checked_add_signed(Duration::milliseconds(ms))?;
    if dt.time() == NaiveTime::MIN {
        Some(Value::Date(dt.date()))
    } else {
        Some(Value::DateTime(dt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_date_serials() {
        assert_eq!(date_to_serial(date(1900, 1, 1), false), 1.0);
        assert_eq!(date_to_serial(date(1900, 2, 28), false), 59.0);
        assert_eq!(date_to_serial(date(1900, 3, 1), false), 61.0);
        assert_eq!(date_to_serial(date(2023, 8, 1), false), 45139.0);
        assert_eq!(date_to_serial(date(1904, 1, 2), true), 1.0);
    }

    #[test]
    fn test_serial_back_to_value() {
        assert_eq!(serial_to_value(45139.0, false), Some(Value::Date(date(2023, 8, 1))));
        assert_eq!(
            serial_to_value(45139.5, false),
            Some(Value::DateTime(date(2023, 8, 1).and_hms_opt(12, 0, 0).unwrap()))
        );
        assert_eq!(
            serial_to_value(0.25, false),
            Some(Value::Time(NaiveTime::from_hms_opt(6, 0, 0).unwrap()))
        );
        assert_eq!(serial_to_value(-1.0, false), None);
    }

    #[test]
    fn test_time_serial() {
        let t = NaiveTime::from_hms_opt(18, 0, 0).unwrap();
        assert_eq!(time_to_serial(t), 0.75);
    }

    #[test]
    fn test_conversions() {
        assert_eq!(Value::from("a"), Value::Text("a".to_string()));
        assert_eq!(Value::from(3), Value::Number(3.0));
        assert_eq!(Value::from(None::<f64>), Value::Null);
        assert_eq!(Value::Boolean(true).display_text(), "TRUE");
    }
}
