//! Polisa Core - Data Types
//!
//! Records, query descriptions and collaborator payloads shared by the
//! engine and the HTTP client. This crate holds data and small parsing
//! helpers only; all state machines live in `polisa-engine`.

pub mod clock;
pub mod error;
pub mod import;
pub mod range;
pub mod record;
pub mod series;

pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use error::{ConfigError, NetworkError, ValidationError};
pub use import::{
    ApprovalResponse, ChunkResponse, ImportFile, ImportSessionId, PoolRecordId, PreviewRow,
    RowError, UploadResponse,
};
pub use range::{DateRange, FilterSelection};
pub use record::{parse_date, FieldValue, Record, RecordId};
pub use series::{Granularity, PeriodBucket, SeriesPoint, SeriesQuery, SeriesResponse};
