//! Raw list records to canonical [`Record`]s.
//!
//! A [`FieldMapping`] names, for each canonical field, the source names it
//! may arrive under. The first source holding a non-empty value wins and is
//! typed as text, number or date. Values that do not parse as their type are
//! kept as text so they still display. [`FieldMapping::pipeline`] declares
//! the same types to the list pipeline, which then sorts those leftovers
//! with the nulls.

use polisa_core::{parse_date, FieldValue, Record, RecordId, ValidationError};
use polisa_engine::pipeline::{FieldKind, FilterConfig, Pipeline};
use serde_json::{Map, Value};

use crate::wire;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Number,
    Date,
}

#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldType,
    pub sources: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct FieldMapping {
    id_sources: Vec<String>,
    fields: Vec<FieldSpec>,
}

impl FieldMapping {
    pub fn new(id_sources: &[&str]) -> Self {
        Self {
            id_sources: id_sources.iter().map(|s| s.to_string()).collect(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, name: &str, kind: FieldType, sources: &[&str]) -> Self {
        self.fields.push(FieldSpec {
            name: name.to_string(),
            kind,
            sources: sources.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// A list pipeline that sorts each mapped field as its declared type.
    pub fn pipeline(&self, filter: FilterConfig) -> Pipeline {
        self.fields
            .iter()
            .fold(Pipeline::new(filter), |pipeline, spec| {
                pipeline.with_kind(spec.name.clone(), spec.kind.into())
            })
    }

    /// Mapping for the "my policies" and captured-policy lists.
    pub fn policies() -> Self {
        Self::new(&["id", "policyId", "policeId"])
            .field("policyNo", FieldType::Text, &["policyNo", "policyNumber", "policeNo"])
            .field("customer", FieldType::Text, &["customerName", "insuredName", "musteriAdi", "sigortaliAdi"])
            .field("company", FieldType::Text, &["companyName", "sirketAdi", "insuranceCompany"])
            .field("branch", FieldType::Text, &["branchName", "bransAdi", "brans"])
            .field("producer", FieldType::Text, &["producerName", "producer", "uretici"])
            .field("plate", FieldType::Text, &["plate", "plaka"])
            .field("grossPremium", FieldType::Number, &["grossPremium", "brutPrim", "premium"])
            .field("netPremium", FieldType::Number, &["netPremium", "netPrim"])
            .field("commission", FieldType::Number, &["commission", "komisyon"])
            .field("amendmentNo", FieldType::Number, &["amendmentNo", "zeyilNo"])
            .field("issueDate", FieldType::Date, &["issueDate", "tanzimTarihi"])
            .field("startDate", FieldType::Date, &["startDate", "baslangicTarihi", "policyStartDate"])
            .field("endDate", FieldType::Date, &["endDate", "bitisTarihi", "policyEndDate"])
    }

    /// Mapping for the transfer pool list.
    pub fn pool() -> Self {
        Self::new(&["id", "poolId", "havuzId"])
            .field("policyNo", FieldType::Text, &["policyNo", "policyNumber", "policeNo"])
            .field("customer", FieldType::Text, &["customerName", "insuredName", "musteriAdi"])
            .field("identityNo", FieldType::Text, &["tcKimlikNo", "vergiNo", "identityNo"])
            .field("company", FieldType::Text, &["companyName", "sirketAdi"])
            .field("grossPremium", FieldType::Number, &["grossPremium", "brutPrim"])
            .field("status", FieldType::Text, &["status", "durum"])
            .field("capturedAt", FieldType::Date, &["capturedAt", "createdAt", "yakalanmaTarihi"])
    }

    /// Map one raw record. Only a missing id is an error.
    pub fn normalize(&self, raw: &Map<String, Value>) -> Result<Record, ValidationError> {
        let id = self
            .id_sources
            .iter()
            .find_map(|source| raw.get(source).and_then(record_id))
            .ok_or_else(|| ValidationError::RequiredField {
                field: self.id_sources.join("|"),
            })?;

        let mut record = Record::new(id);
        for spec in &self.fields {
            let value = spec
                .sources
                .iter()
                .filter_map(|source| raw.get(source))
                .find(|value| !is_empty(value))
                .map(|value| typed(value, spec.kind))
                .unwrap_or_default();
            record.set(spec.name.clone(), value);
        }
        Ok(record)
    }

    /// Map a list payload, skipping entries that are not objects or lack an id.
    pub fn normalize_all(&self, raws: &[Value]) -> (Vec<Record>, Vec<ValidationError>) {
        let mut records = Vec::with_capacity(raws.len());
        let mut rejected = Vec::new();
        for (index, raw) in raws.iter().enumerate() {
            let result = match raw {
                Value::Object(map) => self.normalize(map),
                other => Err(ValidationError::InvalidValue {
                    field: format!("[{}]", index),
                    reason: format!("expected an object, got {}", kind_name(other)),
                }),
            };
            match result {
                Ok(record) => records.push(record),
                Err(err) => rejected.push(err),
            }
        }
        if !rejected.is_empty() {
            tracing::warn!(
                rejected = rejected.len(),
                accepted = records.len(),
                "skipped malformed list entries"
            );
        }
        (records, rejected)
    }

    /// Decode a list body, bare or wrapped as `{"data": [...]}`, and map it.
    pub fn decode_list(
        &self,
        body: &str,
    ) -> Result<(Vec<Record>, Vec<ValidationError>), serde_json::Error> {
        let raws = wire::decode::<Vec<Value>, Vec<Value>>(body)?;
        Ok(self.normalize_all(&raws))
    }
}

impl From<FieldType> for FieldKind {
    fn from(kind: FieldType) -> Self {
        match kind {
            FieldType::Text => FieldKind::Text,
            FieldType::Number => FieldKind::Number,
            FieldType::Date => FieldKind::Date,
        }
    }
}

fn record_id(value: &Value) -> Option<RecordId> {
    match value {
        Value::Number(n) => n.as_i64().map(RecordId::Int),
        Value::String(s) if !s.trim().is_empty() => Some(RecordId::Text(s.trim().to_string())),
        _ => None,
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn typed(value: &Value, kind: FieldType) -> FieldValue {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) if kind != FieldType::Date => {
            return match n.as_f64() {
                Some(n) if kind == FieldType::Number => FieldValue::Number(n),
                _ => FieldValue::Text(n.to_string()),
            };
        }
        other => other.to_string(),
    };
    match kind {
        FieldType::Text => FieldValue::Text(text),
        FieldType::Number => parse_number(&text)
            .map(FieldValue::Number)
            .unwrap_or(FieldValue::Text(text)),
        FieldType::Date => parse_date(&text)
            .map(FieldValue::Date)
            .unwrap_or(FieldValue::Text(text)),
    }
}

/// Accepts `1234.56` as well as the local `1.234,56`.
fn parse_number(text: &str) -> Option<f64> {
    let parsed = if text.contains(',') {
        text.replace('.', "").replace(',', ".").parse::<f64>()
    } else {
        text.parse::<f64>()
    };
    parsed.ok().filter(|n| n.is_finite())
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
