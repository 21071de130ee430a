//! Business rows as handled by list pages and import previews.
//!
//! A [`Record`] is an opaque bag of named fields. Nothing in the engine
//! knows about policy numbers or branch names; pages decide which fields
//! they filter, search and sort on.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::clock::Timestamp;

/// Stable identity of a record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(id) => write!(f, "{}", id),
            Self::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        Self::Int(id)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_string())
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        Self::Text(id)
    }
}

/// A single field value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    #[default]
    Null,
    Number(f64),
    Date(Timestamp),
    Text(String),
}

static NULL_VALUE: FieldValue = FieldValue::Null;

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) if !n.is_nan() => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Date view of the value. Text is parsed leniently; anything that
    /// does not parse is `None`.
    pub fn as_date(&self) -> Option<Timestamp> {
        match self {
            Self::Date(d) => Some(*d),
            Self::Text(s) => parse_date(s),
            _ => None,
        }
    }

    /// Canonical text used for exact-match filtering and search.
    ///
    /// Integral numbers render without a fractional part so that a filter
    /// value of `"3"` matches a stored `3.0`.
    pub fn display_text(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Number(n) if n.is_finite() && n.fract() == 0.0 => Some(format!("{}", *n as i64)),
            Self::Number(n) => Some(n.to_string()),
            Self::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
            Self::Text(s) => Some(s.clone()),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Timestamp> for FieldValue {
    fn from(d: Timestamp) -> Self {
        Self::Date(d)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Null)
    }
}

/// One business row: a policy, a branch, a performer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new(id: impl Into<RecordId>) -> Self {
        Self {
            id: id.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Value of `name`, or [`FieldValue::Null`] when the field is absent.
    pub fn get(&self, name: &str) -> &FieldValue {
        self.fields.get(name).unwrap_or(&NULL_VALUE)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Option<FieldValue> {
        self.fields.insert(name.into(), value.into())
    }
}

/// Parse the date formats the backend and spreadsheets emit.
pub fn parse_date(input: &str) -> Option<Timestamp> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    for format in ["%Y-%m-%d", "%d.%m.%Y", "%d/%m/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(input, format) {
            return date.and_hms_opt(0, 0, 0).map(|naive| Utc.from_utc_datetime(&naive));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_reads_as_null() {
        let record = Record::new(7).with_field("branch", "Kadikoy");
        assert!(record.get("producer").is_null());
        assert_eq!(record.get("branch").as_text(), Some("Kadikoy"));
    }

    #[test]
    fn integral_numbers_display_without_fraction() {
        assert_eq!(FieldValue::Number(3.0).display_text().as_deref(), Some("3"));
        assert_eq!(FieldValue::Number(2.5).display_text().as_deref(), Some("2.5"));
        assert_eq!(FieldValue::Null.display_text(), None);
    }

    #[test]
    fn parses_backend_and_spreadsheet_dates() {
        let iso = parse_date("2024-03-15").unwrap();
        let dotted = parse_date("15.03.2024").unwrap();
        let stamped = parse_date("2024-03-15T00:00:00Z").unwrap();
        assert_eq!(iso, dotted);
        assert_eq!(iso, stamped);
        assert!(parse_date("not a date").is_none());
        assert!(parse_date("").is_none());
    }

    #[test]
    fn untagged_values_deserialize_by_shape() {
        let record: Record = serde_json::from_value(serde_json::json!({
            "id": "POL-1",
            "fields": { "premium": 1250.5, "insured": "Ayse Yilmaz", "note": null }
        }))
        .unwrap();
        assert_eq!(record.id, RecordId::Text("POL-1".to_string()));
        assert_eq!(record.get("premium").as_number(), Some(1250.5));
        assert!(record.get("note").is_null());
    }

    #[test]
    fn nan_is_not_a_number() {
        assert_eq!(FieldValue::Number(f64::NAN).as_number(), None);
    }
}
