//! Backend operations the engine depends on.
//!
//! Implementations live outside the engine (`polisa-client` talks HTTP,
//! `polisa-test-utils` scripts responses). All of them return canonical
//! types; any field-name normalization happens before a value gets here.

use async_trait::async_trait;
use polisa_core::{
    ApprovalResponse, ChunkResponse, ImportFile, ImportSessionId, NetworkError, PoolRecordId,
    SeriesQuery, SeriesResponse, UploadResponse,
};

/// Dashboard series provider.
#[async_trait]
pub trait SeriesSource: Send + Sync {
    async fn fetch_series(&self, query: &SeriesQuery) -> Result<SeriesResponse, NetworkError>;
}

/// Spreadsheet import endpoints.
#[async_trait]
pub trait ImportGateway: Send + Sync {
    /// Send the whole file once and get a session plus a parsed preview.
    async fn upload(
        &self,
        file: &ImportFile,
        company_id_hint: Option<i64>,
    ) -> Result<UploadResponse, NetworkError>;

    /// Persist rows `[skip, skip + take)` of the session's valid rows.
    async fn confirm_chunk(
        &self,
        session_id: &ImportSessionId,
        skip: u64,
        take: u64,
    ) -> Result<ChunkResponse, NetworkError>;
}

/// Transfer pool approval endpoints.
#[async_trait]
pub trait PoolGateway: Send + Sync {
    async fn approve(&self, id: &PoolRecordId) -> Result<ApprovalResponse, NetworkError>;

    async fn batch_approve(&self, ids: &[PoolRecordId]) -> Result<ApprovalResponse, NetworkError>;
}
