//! Spreadsheet import and pool approval payloads, in canonical form.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::record::{FieldValue, RecordId};

/// Server-assigned id of one upload/confirm session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImportSessionId(String);

impl ImportSessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImportSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// File picked for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ImportFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }
}

/// One parsed spreadsheet row as shown in the preview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRow {
    pub row_number: u32,
    pub is_valid: bool,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
}

/// Result of uploading a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub session_id: ImportSessionId,
    pub rows: Vec<PreviewRow>,
    pub total_rows: u64,
    pub valid_rows: u64,
    pub invalid_rows: u64,
}

/// A row the backend rejected during confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowError {
    pub row_number: u32,
    pub message: String,
}

/// Result of confirming one chunk of an import session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkResponse {
    pub success_count: u64,
    pub duplicate_count: u64,
    pub failed_count: u64,
    #[serde(default)]
    pub errors: Vec<RowError>,
    pub processed_so_far: u64,
    pub has_more_batches: bool,
}

/// Result of approving one or more pool records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalResponse {
    pub success_count: u64,
    pub failed_count: u64,
    #[serde(default)]
    pub errors: Vec<String>,
}

/// Pool records are addressed by record id.
pub type PoolRecordId = RecordId;
