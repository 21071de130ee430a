use chrono::Duration as ChronoDuration;
use polisa_engine::{CacheConfig, CacheKey, TtlCache};
use polisa_test_utils::generators::{arb_date_range, arb_selection_pair};
use polisa_test_utils::{fixtures, FilterSelection, Granularity, ManualClock, SeriesQuery};
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

fn cache_with_clock(ttl_secs: u64) -> (TtlCache<u32>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::default());
    let cache = TtlCache::with_clock(
        CacheConfig::new().with_ttl(Duration::from_secs(ttl_secs)),
        clock.clone(),
    );
    (cache, clock)
}

proptest! {
    #[test]
    fn key_ignores_id_order((original, reordered) in arb_selection_pair(), range in arb_date_range()) {
        let a = SeriesQuery::new("production", Granularity::Month, range).with_filters(original);
        let b = SeriesQuery::new("production", Granularity::Month, range).with_filters(reordered);
        prop_assert_eq!(CacheKey::for_query(&a), CacheKey::for_query(&b));
    }

    #[test]
    fn key_separates_ranges(range in arb_date_range(), shift in 1i64..30) {
        let shifted = polisa_test_utils::DateRange::new(
            range.start(),
            range.end() + ChronoDuration::days(shift),
        )
        .unwrap();
        let a = SeriesQuery::new("production", Granularity::Month, range);
        let b = SeriesQuery::new("production", Granularity::Month, shifted);
        prop_assert_ne!(CacheKey::for_query(&a), CacheKey::for_query(&b));
    }

    #[test]
    fn entries_live_exactly_ttl_seconds(ttl in 1u64..3600, elapsed in 0u64..7200) {
        let (cache, clock) = cache_with_clock(ttl);
        cache.set("k", 7);
        clock.advance(ChronoDuration::seconds(elapsed as i64));
        let expected = if elapsed <= ttl { Some(7) } else { None };
        prop_assert_eq!(cache.get("k"), expected);
    }

    #[test]
    fn writes_replace_and_restart_the_clock(ttl in 2u64..600) {
        let (cache, clock) = cache_with_clock(ttl);
        cache.set("k", 1);
        clock.advance(ChronoDuration::seconds(ttl as i64 - 1));
        cache.set("k", 2);
        clock.advance(ChronoDuration::seconds(ttl as i64 - 1));
        prop_assert_eq!(cache.get("k"), Some(2));
        prop_assert_eq!(cache.len(), 1);
    }
}

#[test]
fn list_names_are_part_of_the_key() {
    let range = fixtures::first_half_2024();
    let by_branch = SeriesQuery::new("production", Granularity::Month, range)
        .with_filters(FilterSelection::new().with("branchIds", [1]));
    let by_company = SeriesQuery::new("production", Granularity::Month, range)
        .with_filters(FilterSelection::new().with("companyIds", [1]));
    assert_ne!(
        CacheKey::for_query(&by_branch),
        CacheKey::for_query(&by_company)
    );
}

#[test]
fn expired_read_evicts_and_counts() {
    let (cache, clock) = cache_with_clock(300);
    cache.set("a", 1);
    cache.set("b", 2);
    clock.advance(ChronoDuration::seconds(301));

    assert_eq!(cache.get("a"), None);
    assert_eq!(cache.len(), 1);
    let stats = cache.stats();
    assert_eq!(stats.expired, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 0);
}

#[test]
fn shared_cache_is_visible_across_threads() {
    let cache = Arc::new(TtlCache::<String>::new(CacheConfig::default()));
    let writers: Vec<_> = (0..4)
        .map(|i| {
            let cache = cache.clone();
            std::thread::spawn(move || cache.set(format!("key-{}", i), format!("value-{}", i)))
        })
        .collect();
    for writer in writers {
        writer.join().unwrap();
    }
    for i in 0..4 {
        assert_eq!(cache.get(&format!("key-{}", i)), Some(format!("value-{}", i)));
    }
}
