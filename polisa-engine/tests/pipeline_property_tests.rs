use polisa_engine::pipeline::{
    FieldKind, FilterConfig, ListView, Pipeline, PipelineState, SortDirection, SortState,
};
use polisa_test_utils::assertions::assert_page_in_bounds;
use polisa_test_utils::fixtures;
use polisa_test_utils::generators::arb_records;
use polisa_test_utils::{FieldValue, Record, RecordId};
use proptest::prelude::*;
use std::collections::BTreeMap;

fn pipeline() -> Pipeline {
    Pipeline::new(FilterConfig::searching(["policyNo", "insured", "branch"]))
        .with_kind("premium", FieldKind::Number)
        .with_kind("issuedAt", FieldKind::Date)
        .with_kind("branch", FieldKind::Text)
}

/// Mirrors how a `Number` field is read for sorting.
fn numeric(value: &FieldValue) -> Option<f64> {
    match value {
        FieldValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| !n.is_nan()),
        other => other.as_number(),
    }
}

fn arb_direction() -> impl Strategy<Value = SortDirection> {
    prop_oneof![Just(SortDirection::Asc), Just(SortDirection::Desc)]
}

fn ids(records: &[Record]) -> Vec<RecordId> {
    records.iter().map(|r| r.id.clone()).collect()
}

proptest! {
    #[test]
    fn sorting_is_idempotent(
        records in arb_records(40),
        field in prop::sample::select(vec!["premium", "branch", "issuedAt"]),
        direction in arb_direction(),
    ) {
        let pipeline = pipeline();
        let sort = SortState::new(field, direction);
        let once = pipeline.sort(records, Some(&sort));
        let twice = pipeline.sort(once.clone(), Some(&sort));
        prop_assert_eq!(ids(&once), ids(&twice));
    }

    #[test]
    fn missing_values_sort_last_in_both_directions(
        records in arb_records(40),
        direction in arb_direction(),
    ) {
        let sorted = pipeline().sort(records, Some(&SortState::new("premium", direction)));
        let keys: Vec<Option<f64>> = sorted.iter().map(|r| numeric(r.get("premium"))).collect();
        if let Some(first_missing) = keys.iter().position(Option::is_none) {
            prop_assert!(keys[first_missing..].iter().all(Option::is_none));
        }
        let present: Vec<f64> = keys.into_iter().flatten().collect();
        for pair in present.windows(2) {
            match direction {
                SortDirection::Asc => prop_assert!(pair[0] <= pair[1]),
                SortDirection::Desc => prop_assert!(pair[0] >= pair[1]),
            }
        }
    }

    #[test]
    fn sort_is_stable_for_equal_keys(records in arb_records(40), direction in arb_direction()) {
        let sorted = pipeline().sort(records, Some(&SortState::new("branch", direction)));
        for pair in sorted.windows(2) {
            if pair[0].get("branch") == pair[1].get("branch") {
                prop_assert!(pair[0].id < pair[1].id);
            }
        }
    }

    #[test]
    fn pages_stay_in_bounds_and_cover_the_result(
        records in arb_records(60),
        page in 0usize..12,
        page_size in 0usize..15,
    ) {
        let pipeline = pipeline();
        let mut state = PipelineState::with_page_size(page_size);
        state.set_sort("premium", SortDirection::Desc);
        state.set_page(page);

        let result = pipeline.run(&records, &state);
        assert_page_in_bounds(&result, page_size);
        prop_assert_eq!(result.total_items, records.len());

        let mut collected = Vec::new();
        for n in 1..=result.total_pages {
            state.set_page(n);
            collected.extend(pipeline.run(&records, &state).items);
        }
        let sorted = pipeline.sort(records.clone(), state.sort.as_ref());
        prop_assert_eq!(ids(&collected), ids(&sorted));
    }

    #[test]
    fn exact_filter_keeps_only_matching_rows(
        records in arb_records(40),
        branch in prop::sample::select(vec!["Kadikoy", "Besiktas", "Cankaya", "Konak"]),
    ) {
        let filters = BTreeMap::from([("branch".to_string(), branch.to_string())]);
        let filtered = pipeline().filter(&records, &filters);
        let expected = records
            .iter()
            .filter(|r| r.get("branch").as_text() == Some(branch))
            .count();
        prop_assert_eq!(filtered.len(), expected);
        prop_assert!(filtered.iter().all(|r| r.get("branch").as_text() == Some(branch)));
    }

    #[test]
    fn blank_filters_match_everything(records in arb_records(30), blank in "[ ]{0,3}") {
        let filters = BTreeMap::from([
            ("branch".to_string(), blank.clone()),
            ("search".to_string(), blank),
        ]);
        prop_assert_eq!(pipeline().filter(&records, &filters).len(), records.len());
    }
}

#[test]
fn empty_result_is_page_one_of_one() {
    let mut state = PipelineState::default();
    state.set_page(5);
    let result = pipeline().run(&[], &state);
    assert!(result.items.is_empty());
    assert_eq!(result.current_page, 1);
    assert_eq!(result.total_pages, 1);
    assert_eq!(result.total_items, 0);
}

#[test]
fn search_is_case_insensitive_across_fields() {
    let mut state = PipelineState::default();
    state.set_filter("search", "ŞULE");
    let result = pipeline().run(&fixtures::captured_policies(), &state);
    assert_eq!(ids(&result.items), vec![RecordId::Int(103)]);
}

#[test]
fn date_sort_puts_unparsable_dates_last() {
    let mut state = PipelineState::default();
    state.set_sort("issuedAt", SortDirection::Desc);
    let result = pipeline().run(&fixtures::captured_policies(), &state);
    assert_eq!(
        ids(&result.items),
        vec![RecordId::Int(101), RecordId::Int(102), RecordId::Int(103)]
    );
}

#[test]
fn list_view_mutations_rerun_the_pipeline() {
    let mut view = ListView::new(pipeline(), PipelineState::with_page_size(2));
    let page = view.replace_all(fixtures::captured_policies());
    assert_eq!(page.total_pages, 2);

    let page = view.go_to_page(9);
    assert_eq!(page.current_page, 2);
    assert_eq!(view.state().pagination.page, 2);

    let page = view.remove(&RecordId::Int(103));
    assert_eq!(page.total_items, 2);
    assert_eq!(page.current_page, 1);

    let page = view.upsert(
        Record::new(102)
            .with_field("policyNo", "TR-2024-0002")
            .with_field("branch", "Konak")
            .with_field("premium", 15.0),
    );
    assert_eq!(page.total_items, 2);

    let page = view.set_filter("branch", "Konak");
    assert_eq!(ids(&page.items), vec![RecordId::Int(102)]);
    assert_eq!(view.state().pagination.page, 1);
    assert_eq!(
        view.records().iter().filter(|r| r.id == RecordId::Int(102)).count(),
        1
    );
}

#[test]
fn toggling_sort_flips_direction() {
    let mut view = ListView::new(pipeline(), PipelineState::default());
    view.replace_all(fixtures::captured_policies());

    let asc = view.toggle_sort("premium");
    assert_eq!(
        ids(&asc.items),
        vec![RecordId::Int(102), RecordId::Int(101), RecordId::Int(103)]
    );
    let desc = view.toggle_sort("premium");
    assert_eq!(
        ids(&desc.items),
        vec![RecordId::Int(101), RecordId::Int(102), RecordId::Int(103)]
    );
    assert_eq!(view.state().pagination.page, 1);
}
