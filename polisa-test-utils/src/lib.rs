//! Polisa Test Utilities
//!
//! Shared test infrastructure for the Polisa workspace:
//! - A scripted in-memory backend implementing every collaborator trait
//! - Proptest generators for records, selections and ranges
//! - Fixtures for common dashboard and import scenarios
//! - Assertions for engine invariants

pub use polisa_core::{
    ApprovalResponse, ChunkResponse, DateRange, FieldValue, FilterSelection, Granularity,
    ImportFile, ImportSessionId, ManualClock, NetworkError, PeriodBucket, PoolRecordId,
    PreviewRow, Record, RecordId, RowError, SeriesPoint, SeriesQuery, SeriesResponse,
    UploadResponse,
};
pub use polisa_engine::{ImportGateway, PoolGateway, SeriesSource};

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn offline(endpoint: &str) -> NetworkError {
    NetworkError::Transport {
        endpoint: endpoint.to_string(),
        reason: "connection reset".to_string(),
    }
}

// ============================================================================
// SCRIPTED SERIES SOURCE
// ============================================================================

/// Series source that synthesizes one point per month or day of the range.
///
/// Each point carries a `premium` metric of `month * 1000` (monthly) or
/// `day * 10` (daily), which makes results easy to assert on.
#[derive(Debug, Default)]
pub struct ScriptedSeries {
    calls: Mutex<Vec<SeriesQuery>>,
    failures_remaining: AtomicUsize,
}

impl ScriptedSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` fetches fail.
    pub fn fail_next(&self, count: usize) {
        self.failures_remaining.store(count, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<SeriesQuery> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    pub fn synthesize(query: &SeriesQuery) -> SeriesResponse {
        let points = match query.granularity {
            Granularity::Month => query
                .range
                .months()
                .into_iter()
                .map(|(year, month)| SeriesPoint {
                    bucket: PeriodBucket::month(year, month),
                    label: format!("{}-{:02}", year, month),
                    metrics: BTreeMap::from([("premium".to_string(), month as f64 * 1000.0)]),
                })
                .collect(),
            Granularity::Day => query
                .range
                .start()
                .iter_days()
                .take_while(|day| *day <= query.range.end())
                .map(|day| SeriesPoint {
                    bucket: PeriodBucket::day(day.year(), day.month(), day.day()),
                    label: day.format("%Y-%m-%d").to_string(),
                    metrics: BTreeMap::from([("premium".to_string(), day.day() as f64 * 10.0)]),
                })
                .collect(),
        };
        SeriesResponse {
            granularity: query.granularity,
            points,
        }
    }
}

#[async_trait]
impl SeriesSource for ScriptedSeries {
    async fn fetch_series(&self, query: &SeriesQuery) -> Result<SeriesResponse, NetworkError> {
        lock(&self.calls).push(query.clone());
        let failing = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(offline("/api/dashboard/series"));
        }
        Ok(Self::synthesize(query))
    }
}

// ============================================================================
// SCRIPTED IMPORT BACKEND
// ============================================================================

/// Import backend holding `valid_rows` rows that deduplicates on confirm.
///
/// Rows listed in `failing_rows` (zero-based) come back as failures. Rows
/// confirmed once are reported as duplicates on any later confirm.
#[derive(Debug)]
pub struct ScriptedImport {
    valid_rows: u64,
    invalid_rows: u64,
    failing_rows: HashSet<u64>,
    reported_valid_rows: Option<u64>,
    imported: Mutex<HashSet<u64>>,
    chunk_calls: Mutex<Vec<(u64, u64)>>,
    fail_on_call: Mutex<Option<usize>>,
    fail_upload: bool,
}

impl ScriptedImport {
    pub fn new(valid_rows: u64) -> Self {
        Self {
            valid_rows,
            invalid_rows: 0,
            failing_rows: HashSet::new(),
            reported_valid_rows: None,
            imported: Mutex::new(HashSet::new()),
            chunk_calls: Mutex::new(Vec::new()),
            fail_on_call: Mutex::new(None),
            fail_upload: false,
        }
    }

    pub fn with_invalid_rows(mut self, invalid_rows: u64) -> Self {
        self.invalid_rows = invalid_rows;
        self
    }

    pub fn with_failing_rows(mut self, rows: impl IntoIterator<Item = u64>) -> Self {
        self.failing_rows = rows.into_iter().collect();
        self
    }

    /// Rows that were imported before this session (reported as duplicates).
    pub fn with_already_imported(self, rows: impl IntoIterator<Item = u64>) -> Self {
        lock(&self.imported).extend(rows);
        self
    }

    /// Make the upload under-report how many valid rows the session holds.
    pub fn with_reported_valid_rows(mut self, valid_rows: u64) -> Self {
        self.reported_valid_rows = Some(valid_rows);
        self
    }

    pub fn with_failing_upload(mut self) -> Self {
        self.fail_upload = true;
        self
    }

    /// Fail the confirm call with this zero-based index (counting all calls).
    pub fn fail_chunk_call(&self, index: usize) {
        *lock(&self.fail_on_call) = Some(index);
    }

    pub fn clear_failure(&self) {
        *lock(&self.fail_on_call) = None;
    }

    /// `(skip, take)` of every confirm call, failed ones included.
    pub fn chunk_calls(&self) -> Vec<(u64, u64)> {
        lock(&self.chunk_calls).clone()
    }

    pub fn preview_rows(&self) -> Vec<PreviewRow> {
        let valid = (0..self.valid_rows).map(|i| PreviewRow {
            row_number: i as u32 + 2,
            is_valid: true,
            errors: Vec::new(),
            fields: BTreeMap::from([
                ("policyNo".to_string(), FieldValue::Text(format!("POL-{:05}", i))),
                ("premium".to_string(), FieldValue::Number(1000.0 + i as f64)),
            ]),
        });
        let invalid = (0..self.invalid_rows).map(|i| PreviewRow {
            row_number: (self.valid_rows + i) as u32 + 2,
            is_valid: false,
            errors: vec!["policy number missing".to_string()],
            fields: BTreeMap::new(),
        });
        valid.chain(invalid).collect()
    }
}

#[async_trait]
impl ImportGateway for ScriptedImport {
    async fn upload(
        &self,
        _file: &ImportFile,
        _company_id_hint: Option<i64>,
    ) -> Result<UploadResponse, NetworkError> {
        if self.fail_upload {
            return Err(offline("/api/imports/upload"));
        }
        Ok(UploadResponse {
            session_id: ImportSessionId::new(uuid::Uuid::new_v4().to_string()),
            rows: self.preview_rows(),
            total_rows: self.valid_rows + self.invalid_rows,
            valid_rows: self.reported_valid_rows.unwrap_or(self.valid_rows),
            invalid_rows: self.invalid_rows,
        })
    }

    async fn confirm_chunk(
        &self,
        _session_id: &ImportSessionId,
        skip: u64,
        take: u64,
    ) -> Result<ChunkResponse, NetworkError> {
        let call_index = {
            let mut calls = lock(&self.chunk_calls);
            calls.push((skip, take));
            calls.len() - 1
        };
        if *lock(&self.fail_on_call) == Some(call_index) {
            return Err(offline("/api/imports/confirm"));
        }

        let end = (skip + take).min(self.valid_rows);
        let mut response = ChunkResponse {
            success_count: 0,
            duplicate_count: 0,
            failed_count: 0,
            errors: Vec::new(),
            processed_so_far: end,
            has_more_batches: skip + take < self.valid_rows,
        };
        let mut imported = lock(&self.imported);
        for row in skip.min(end)..end {
            if imported.contains(&row) {
                response.duplicate_count += 1;
            } else if self.failing_rows.contains(&row) {
                response.failed_count += 1;
                response.errors.push(RowError {
                    row_number: row as u32 + 2,
                    message: "customer could not be resolved".to_string(),
                });
            } else {
                imported.insert(row);
                response.success_count += 1;
            }
        }
        Ok(response)
    }
}

// ============================================================================
// SCRIPTED POOL BACKEND
// ============================================================================

/// Pool backend that rejects a fixed set of ids.
#[derive(Debug, Default)]
pub struct ScriptedPool {
    rejected: HashSet<PoolRecordId>,
    batches: Mutex<Vec<Vec<PoolRecordId>>>,
    fail_on_batch: Option<usize>,
}

impl ScriptedPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting(mut self, ids: impl IntoIterator<Item = PoolRecordId>) -> Self {
        self.rejected = ids.into_iter().collect();
        self
    }

    pub fn failing_batch(mut self, index: usize) -> Self {
        self.fail_on_batch = Some(index);
        self
    }

    pub fn batches(&self) -> Vec<Vec<PoolRecordId>> {
        lock(&self.batches).clone()
    }

    fn respond(&self, ids: &[PoolRecordId]) -> ApprovalResponse {
        let mut response = ApprovalResponse::default();
        for id in ids {
            if self.rejected.contains(id) {
                response.failed_count += 1;
                response.errors.push(format!("{}: no matching policy in ledger", id));
            } else {
                response.success_count += 1;
            }
        }
        response
    }
}

#[async_trait]
impl PoolGateway for ScriptedPool {
    async fn approve(&self, id: &PoolRecordId) -> Result<ApprovalResponse, NetworkError> {
        Ok(self.respond(std::slice::from_ref(id)))
    }

    async fn batch_approve(&self, ids: &[PoolRecordId]) -> Result<ApprovalResponse, NetworkError> {
        let index = {
            let mut batches = lock(&self.batches);
            batches.push(ids.to_vec());
            batches.len() - 1
        };
        if self.fail_on_batch == Some(index) {
            return Err(offline("/api/pool/batch-approve"));
        }
        Ok(self.respond(ids))
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for Polisa data types.

    use super::*;
    use proptest::prelude::*;

    /// Generate a field value, nulls included.
    pub fn arb_field_value() -> impl Strategy<Value = FieldValue> {
        prop_oneof![
            1 => Just(FieldValue::Null),
            3 => (-1_000_000i64..1_000_000).prop_map(|n| FieldValue::Number(n as f64 / 100.0)),
            3 => "[A-Za-zÇçĞğİıÖöŞşÜü]{0,6}( [0-9]{1,3})?".prop_map(FieldValue::Text),
        ]
    }

    /// Generate a date-ish text value; some do not parse.
    pub fn arb_date_text() -> impl Strategy<Value = FieldValue> {
        prop_oneof![
            (2020i32..2026, 1u32..=12, 1u32..=28)
                .prop_map(|(y, m, d)| FieldValue::Text(format!("{:04}-{:02}-{:02}", y, m, d))),
            (2020i32..2026, 1u32..=12, 1u32..=28)
                .prop_map(|(y, m, d)| FieldValue::Text(format!("{:02}.{:02}.{:04}", d, m, y))),
            Just(FieldValue::Text("unknown".to_string())),
            Just(FieldValue::Null),
        ]
    }

    /// Generate a policy-like record with `branch`, `insured`, `premium` and `issuedAt`.
    pub fn arb_record(id: i64) -> impl Strategy<Value = Record> {
        (
            prop::sample::select(vec!["Kadikoy", "Besiktas", "Cankaya", "Konak"]),
            arb_field_value(),
            arb_field_value(),
            arb_date_text(),
        )
            .prop_map(move |(branch, insured, premium, issued)| {
                Record::new(id)
                    .with_field("branch", branch)
                    .with_field("insured", insured)
                    .with_field("premium", premium)
                    .with_field("issuedAt", issued)
            })
    }

    /// Generate up to `max` records with distinct ids in insertion order.
    pub fn arb_records(max: usize) -> impl Strategy<Value = Vec<Record>> {
        (0..=max).prop_flat_map(|len| {
            (0..len)
                .map(|i| arb_record(i as i64))
                .collect::<Vec<_>>()
        })
    }

    /// Generate an inclusive date range between 2020 and 2026.
    pub fn arb_date_range() -> impl Strategy<Value = DateRange> {
        (0i64..2000, 0i64..400).prop_filter_map("valid range", |(offset, span)| {
            let start = NaiveDate::from_ymd_opt(2020, 1, 1)? + chrono::Duration::days(offset);
            let end = start + chrono::Duration::days(span);
            DateRange::new(start, end).ok()
        })
    }

    /// Generate a filter selection and a reordered copy of it.
    pub fn arb_selection_pair() -> impl Strategy<Value = (FilterSelection, FilterSelection)> {
        prop::collection::btree_map(
            prop::sample::select(vec!["branchIds", "companyIds", "employeeIds"]),
            prop::collection::vec(1i64..500, 0..8),
            0..3,
        )
        .prop_flat_map(|lists| {
            let shuffled: Vec<_> = lists
                .iter()
                .map(|(name, ids)| (Just(name.to_string()), Just(ids.clone()).prop_shuffle()))
                .collect();
            (Just(lists), shuffled)
        })
        .prop_map(|(lists, shuffled)| {
            let mut original = FilterSelection::new();
            for (name, ids) in lists {
                original.set(name, ids);
            }
            let mut reordered = FilterSelection::new();
            for (name, ids) in shuffled {
                reordered.set(name, ids);
            }
            (original, reordered)
        })
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built values for common scenarios.

    use super::*;

    pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("fixture date is valid")
    }

    pub fn range(start: (i32, u32, u32), end: (i32, u32, u32)) -> DateRange {
        DateRange::new(date(start.0, start.1, start.2), date(end.0, end.1, end.2))
            .expect("fixture range is ordered")
    }

    /// 2024-01-01..2024-06-30, opens at month level.
    pub fn first_half_2024() -> DateRange {
        range((2024, 1, 1), (2024, 6, 30))
    }

    /// 2024-01-01..2024-01-31, opens at day level.
    pub fn january_2024() -> DateRange {
        range((2024, 1, 1), (2024, 1, 31))
    }

    pub fn spreadsheet() -> ImportFile {
        ImportFile::new("kasko-2024-06.xlsx", vec![0x50, 0x4b, 0x03, 0x04])
    }

    /// A handful of captured policies.
    pub fn captured_policies() -> Vec<Record> {
        vec![
            Record::new(101)
                .with_field("policyNo", "TR-2024-0010")
                .with_field("insured", "Ayse Yilmaz")
                .with_field("branch", "Kadikoy")
                .with_field("premium", 1250.0)
                .with_field("issuedAt", "2024-03-02"),
            Record::new(102)
                .with_field("policyNo", "TR-2024-0002")
                .with_field("insured", "Mehmet Kaya")
                .with_field("branch", "Besiktas")
                .with_field("premium", 980.5)
                .with_field("issuedAt", "15.01.2024"),
            Record::new(103)
                .with_field("policyNo", "TR-2024-0100")
                .with_field("insured", "Şule Çelik")
                .with_field("branch", "Kadikoy")
                .with_field("premium", FieldValue::Null)
                .with_field("issuedAt", "not recorded"),
        ]
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for engine invariants.

    use polisa_engine::{ImportBatchProgress, PageResult};

    /// Counters add up to the processed count.
    #[track_caller]
    pub fn assert_progress_consistent(progress: &ImportBatchProgress) {
        assert_eq!(
            progress.success_count + progress.duplicate_count + progress.failed_count,
            progress.processed_so_far,
            "inconsistent progress: {:?}",
            progress
        );
    }

    /// Page bounds hold for the given page size.
    #[track_caller]
    pub fn assert_page_in_bounds<T: std::fmt::Debug>(page: &PageResult<T>, page_size: usize) {
        assert!(page.items.len() <= page_size.max(1), "page too large: {:?}", page);
        assert!(page.current_page >= 1 && page.current_page <= page.total_pages);
        assert!(page.total_pages >= 1);
    }
}
