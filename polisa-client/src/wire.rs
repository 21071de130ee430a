//! Backend payload shapes.
//!
//! The backend is not consistent about field names across endpoints and
//! versions. Every alternative name seen in the wild is accepted here, and
//! each raw type converts into its canonical `polisa_core` counterpart so
//! nothing past this module branches on source-specific names.

use polisa_core::{
    ApprovalResponse, ChunkResponse, FieldValue, Granularity, ImportSessionId, PeriodBucket,
    PreviewRow, RowError, SeriesPoint, SeriesResponse, UploadResponse,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Responses arrive either bare or wrapped as `{"data": ...}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    pub fn into_inner(self) -> T {
        match self {
            Self::Wrapped { data } => data,
            Self::Bare(value) => value,
        }
    }
}

/// Decode a response body into its canonical form.
pub fn decode<R, T>(body: &str) -> Result<T, serde_json::Error>
where
    R: DeserializeOwned + Into<T>,
{
    let envelope: Envelope<R> = serde_json::from_str(body)?;
    Ok(envelope.into_inner().into())
}

/// Human-readable message from an error body, falling back to the raw text.
pub fn error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        #[serde(alias = "error", alias = "detail", alias = "title")]
        message: String,
    }
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.message,
        Err(_) if body.trim().is_empty() => "empty response body".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

// ============================================================================
// SERIES
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSeriesResponse {
    #[serde(default)]
    pub granularity: Option<Granularity>,
    #[serde(alias = "items", alias = "series", alias = "data")]
    pub points: Vec<RawSeriesPoint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSeriesPoint {
    #[serde(alias = "yil")]
    pub year: i32,
    #[serde(alias = "ay")]
    pub month: u32,
    #[serde(default, alias = "gun")]
    pub day: Option<u32>,
    #[serde(default, alias = "period", alias = "name")]
    pub label: Option<String>,
    /// Everything else; numeric entries become metrics.
    #[serde(flatten)]
    pub rest: BTreeMap<String, serde_json::Value>,
}

impl From<RawSeriesResponse> for SeriesResponse {
    fn from(raw: RawSeriesResponse) -> Self {
        let points: Vec<SeriesPoint> = raw.points.into_iter().map(SeriesPoint::from).collect();
        let granularity = raw.granularity.unwrap_or_else(|| {
            if points.iter().any(|p| p.bucket.day.is_some()) {
                Granularity::Day
            } else {
                Granularity::Month
            }
        });
        Self {
            granularity,
            points,
        }
    }
}

impl From<RawSeriesPoint> for SeriesPoint {
    fn from(raw: RawSeriesPoint) -> Self {
        let bucket = match raw.day {
            Some(day) => PeriodBucket::day(raw.year, raw.month, day),
            None => PeriodBucket::month(raw.year, raw.month),
        };
        let label = raw.label.unwrap_or_else(|| match raw.day {
            Some(day) => format!("{}-{:02}-{:02}", raw.year, raw.month, day),
            None => format!("{}-{:02}", raw.year, raw.month),
        });
        let metrics = raw
            .rest
            .into_iter()
            .filter_map(|(name, value)| numeric(&value).map(|n| (name, n)))
            .collect();
        Self {
            bucket,
            label,
            metrics,
        }
    }
}

/// Numbers, and strings holding numbers (some endpoints send decimals as text).
fn numeric(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

// ============================================================================
// IMPORT
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawUploadResponse {
    #[serde(alias = "batchId", alias = "importId", alias = "id")]
    pub session_id: String,
    #[serde(default, alias = "previewRows", alias = "items")]
    pub rows: Vec<RawPreviewRow>,
    #[serde(default, alias = "totalCount", alias = "total")]
    pub total_rows: Option<u64>,
    #[serde(default, alias = "validCount")]
    pub valid_rows: Option<u64>,
    #[serde(default, alias = "invalidCount", alias = "errorRows")]
    pub invalid_rows: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPreviewRow {
    #[serde(alias = "rowNo", alias = "satirNo", alias = "row")]
    pub row_number: u32,
    #[serde(default = "default_true", alias = "valid")]
    pub is_valid: bool,
    #[serde(default, alias = "validationErrors", alias = "messages")]
    pub errors: Vec<String>,
    #[serde(default, alias = "data", alias = "values")]
    pub fields: BTreeMap<String, FieldValue>,
}

fn default_true() -> bool {
    true
}

impl From<RawPreviewRow> for PreviewRow {
    fn from(raw: RawPreviewRow) -> Self {
        Self {
            row_number: raw.row_number,
            is_valid: raw.is_valid && raw.errors.is_empty(),
            errors: raw.errors,
            fields: raw.fields,
        }
    }
}

impl From<RawUploadResponse> for UploadResponse {
    /// Reported counts win. The preview may be only its first page, so
    /// counting its rows is the last resort and `totalRows` beats it.
    fn from(raw: RawUploadResponse) -> Self {
        let rows: Vec<PreviewRow> = raw.rows.into_iter().map(PreviewRow::from).collect();
        let counted_valid = rows.iter().filter(|r| r.is_valid).count() as u64;
        let counted_invalid = rows.len() as u64 - counted_valid;
        let invalid_rows = raw.invalid_rows.unwrap_or(counted_invalid);
        let valid_rows = match (raw.valid_rows, raw.total_rows) {
            (Some(valid), _) => valid,
            (None, Some(total)) => total.saturating_sub(invalid_rows),
            (None, None) => counted_valid,
        };
        Self {
            session_id: ImportSessionId::new(raw.session_id),
            total_rows: raw.total_rows.unwrap_or(valid_rows + invalid_rows),
            valid_rows,
            invalid_rows,
            rows,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawChunkResponse {
    #[serde(default, alias = "imported", alias = "insertedCount")]
    pub success_count: u64,
    #[serde(default, alias = "duplicates", alias = "skippedCount")]
    pub duplicate_count: u64,
    #[serde(default, alias = "failed", alias = "errorCount")]
    pub failed_count: u64,
    #[serde(default)]
    pub errors: Vec<RawRowError>,
    #[serde(default, alias = "processed", alias = "processedCount")]
    pub processed_so_far: u64,
    #[serde(default, alias = "hasMore")]
    pub has_more_batches: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRowError {
    #[serde(default, alias = "rowNo", alias = "row")]
    pub row_number: u32,
    #[serde(alias = "error", alias = "errorMessage")]
    pub message: String,
}

impl From<RawChunkResponse> for ChunkResponse {
    fn from(raw: RawChunkResponse) -> Self {
        Self {
            success_count: raw.success_count,
            duplicate_count: raw.duplicate_count,
            failed_count: raw.failed_count,
            errors: raw
                .errors
                .into_iter()
                .map(|e| RowError {
                    row_number: e.row_number,
                    message: e.message,
                })
                .collect(),
            processed_so_far: raw.processed_so_far,
            has_more_batches: raw.has_more_batches,
        }
    }
}

// ============================================================================
// POOL
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawApprovalResponse {
    #[serde(default, alias = "approvedCount", alias = "approved")]
    pub success_count: u64,
    #[serde(default, alias = "failed", alias = "errorCount")]
    pub failed_count: u64,
    #[serde(default, alias = "messages")]
    pub errors: Vec<String>,
}

impl From<RawApprovalResponse> for ApprovalResponse {
    fn from(raw: RawApprovalResponse) -> Self {
        Self {
            success_count: raw.success_count,
            failed_count: raw.failed_count,
            errors: raw.errors,
        }
    }
}
