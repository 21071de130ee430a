//! Polisa Engine
//!
//! Client-side data pipeline for the brokerage console:
//! - [`cache`]: TTL-bounded result cache with order-insensitive keys
//! - [`pipeline`]: filter → sort → paginate for list pages
//! - [`zoom`]: month → day drill-down with undo
//! - [`import`]: chunked import confirmation with accumulated progress
//!
//! Components are plain values constructed per page. None of them reach
//! into another except the zoom controller reading the series cache.

pub mod cache;
pub mod collaborators;
pub mod dashboard;
pub mod import;
pub mod notifications;
pub mod pipeline;
pub mod pool;
pub mod zoom;

pub use cache::{CacheConfig, CacheKey, CacheStats, TtlCache};
pub use collaborators::{ImportGateway, PoolGateway, SeriesSource};
pub use dashboard::Dashboard;
pub use import::{
    AbortReason, BatchImportRunner, CancelHandle, ImportBatchProgress, ImportOutcome, ImportPhase,
    ImportRunnerConfig, ImportSnapshot, PreviewFilter, PreviewSummary,
};
pub use notifications::{Notification, NotificationLevel};
pub use pipeline::{
    FieldKind, FilterConfig, ListView, PageResult, Pipeline, PipelineState, SortDirection,
    SortState,
};
pub use pool::{ApprovalRun, ApprovalTally, PoolApprover};
pub use zoom::{ZoomContext, ZoomController, ZoomFrame, ZoomLevel, ZoomOutcome, ZoomRejection};
