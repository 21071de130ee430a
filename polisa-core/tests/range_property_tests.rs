use chrono::{Datelike, Duration, NaiveDate};
use polisa_core::{parse_date, DateRange, FieldValue, FilterSelection, RecordId};
use proptest::prelude::*;

fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (0i64..3650).prop_map(|offset| {
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + Duration::days(offset)
    })
}

proptest! {
    #[test]
    fn reversed_bounds_are_rejected(a in arb_date(), b in arb_date()) {
        let result = DateRange::new(a, b);
        prop_assert_eq!(result.is_ok(), a <= b);
    }

    #[test]
    fn span_counts_days_between_bounds(start in arb_date(), span in 0i64..400) {
        let range = DateRange::new(start, start + Duration::days(span)).unwrap();
        prop_assert_eq!(range.span_days(), span);
        prop_assert!(range.contains(start));
        prop_assert!(!range.contains(start - Duration::days(1)));
    }

    #[test]
    fn months_cover_the_range_in_order(start in arb_date(), span in 0i64..800) {
        let range = DateRange::new(start, start + Duration::days(span)).unwrap();
        let months = range.months();
        prop_assert_eq!(months.first().copied(), Some((start.year(), start.month())));
        prop_assert_eq!(
            months.last().copied(),
            Some((range.end().year(), range.end().month()))
        );
        prop_assert!(months.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn month_intersection_stays_inside_both(start in arb_date(), span in 0i64..400) {
        let range = DateRange::new(start, start + Duration::days(span)).unwrap();
        for (year, month) in range.months() {
            let month_range = DateRange::month(year, month).unwrap();
            let clipped = month_range.intersect(&range).unwrap();
            prop_assert!(range.contains(clipped.start()) && range.contains(clipped.end()));
            prop_assert!(month_range.contains(clipped.start()) && month_range.contains(clipped.end()));
        }
    }

    #[test]
    fn normalized_selection_ignores_order(mut ids in prop::collection::vec(0i64..50, 0..10)) {
        let original = FilterSelection::new().with("branchIds", ids.clone());
        ids.reverse();
        let reversed = FilterSelection::new().with("branchIds", ids);
        prop_assert_eq!(original.normalized(), reversed.normalized());
    }

    #[test]
    fn both_date_layouts_parse_to_the_same_day(date in arb_date()) {
        let iso = parse_date(&date.format("%Y-%m-%d").to_string()).unwrap();
        let local = parse_date(&date.format("%d.%m.%Y").to_string()).unwrap();
        prop_assert_eq!(iso, local);
        prop_assert_eq!(iso.date_naive(), date);
    }
}

#[test]
fn wire_values_decode_untagged() {
    let values: Vec<FieldValue> =
        serde_json::from_str(r#"[null, 12.5, "2024-03-01T00:00:00Z", "Kasko"]"#).unwrap();
    assert!(values[0].is_null());
    assert_eq!(values[1].as_number(), Some(12.5));
    assert!(matches!(values[2], FieldValue::Date(_)));
    assert_eq!(values[3].as_text(), Some("Kasko"));

    let ids: Vec<RecordId> = serde_json::from_str(r#"[42, "CAP-7"]"#).unwrap();
    assert_eq!(ids, vec![RecordId::Int(42), RecordId::from("CAP-7")]);
}
