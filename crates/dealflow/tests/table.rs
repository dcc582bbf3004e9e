mod common;

use common::*;
use dealflow::table::{derive_page, filter_and_sort, PageError};
use dealflow::{Record, RecordStore, SortDirection, SortKey, TableEngine, ViewState};

fn names(rows: &[&Record]) -> Vec<String> {
    rows.iter().map(|r| r.name.clone()).collect()
}

#[test]
fn test_twelve_records_paginate_into_two_pages() {
    let records = numbered_records(12);
    let mut view = ViewState::new(10);

    let page = derive_page(&records, &view);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.rows.len(), 10);
    assert_eq!(page.rows[0].name, "Company 01");
    assert_eq!(page.rows[9].name, "Company 10");
    assert!(page.has_next());
    assert!(!page.has_previous());

    view.go_to_page(2, page.total_pages).unwrap();
    let page = derive_page(&records, &view);
    assert_eq!(names(&page.rows), vec!["Company 11", "Company 12"]);
    assert!(!page.has_next());

    let err = view.go_to_page(3, page.total_pages).unwrap_err();
    assert_eq!(
        err,
        PageError::OutOfRange {
            requested: 3,
            total_pages: 2
        }
    );
    assert_eq!(view.page(), 2);
}

#[test]
fn test_min_interactions_filter_is_numeric() {
    let records = vec![
        record("Acme", 2),
        record("Bluth", 12),
        record("Cyberdyne", 5),
        record("Dunder", 4),
        record("Encom", 1),
        record("Futurama", 0),
        record("Globex", 9),
        record("Hooli", 3),
        record("Initech", 4),
        record("Jupiter", 1),
    ];
    let mut view = ViewState::new(10);
    view.set_min_interactions(Some(5));

    let rows = filter_and_sort(&records, &view);
    assert_eq!(names(&rows), vec!["Bluth", "Cyberdyne", "Globex"]);

    view.set_min_interactions(None);
    assert_eq!(filter_and_sort(&records, &view).len(), 10);
}

#[test]
fn test_sort_toggle_keeps_filter() {
    let records = vec![
        record("Globex", 7),
        record("Acme", 6),
        record("Hooli", 1),
        record("Initech", 9),
    ];
    let mut view = ViewState::new(10);
    view.set_min_interactions(Some(5));
    view.toggle_sort(SortKey::Name);
    // Name is the default column, so the first toggle flips it.
    view.toggle_sort(SortKey::Name);
    assert_eq!(view.sort_direction(), SortDirection::Asc);
    assert_eq!(
        names(&filter_and_sort(&records, &view)),
        vec!["Acme", "Globex", "Initech"]
    );

    view.toggle_sort(SortKey::Name);
    assert_eq!(view.sort_direction(), SortDirection::Desc);
    assert_eq!(view.min_interactions(), Some(5));
    assert_eq!(
        names(&filter_and_sort(&records, &view)),
        vec!["Initech", "Globex", "Acme"]
    );

    view.toggle_sort(SortKey::TotalInteractions);
    assert_eq!(view.sort_key(), SortKey::TotalInteractions);
    assert_eq!(view.sort_direction(), SortDirection::Asc);
    assert_eq!(
        names(&filter_and_sort(&records, &view)),
        vec!["Acme", "Globex", "Initech"]
    );
}

#[test]
fn test_date_columns_sort_chronologically() {
    let mut records = vec![record("Acme", 1), record("Globex", 1), record("Hooli", 1)];
    records[0].last_interaction = day(30);
    records[1].last_interaction = day(2);
    records[2].last_interaction = day(15);

    let mut view = ViewState::new(10);
    view.set_sort(SortKey::LastInteraction, SortDirection::Asc);
    assert_eq!(
        names(&filter_and_sort(&records, &view)),
        vec!["Globex", "Hooli", "Acme"]
    );
    view.set_sort(SortKey::LastInteraction, SortDirection::Desc);
    assert_eq!(
        names(&filter_and_sort(&records, &view)),
        vec!["Acme", "Hooli", "Globex"]
    );
}

#[test]
fn test_derivation_is_deterministic_for_any_input_order() {
    let records = numbered_records(15);
    let mut reversed = records.clone();
    reversed.reverse();

    for key in [
        SortKey::Name,
        SortKey::FirstInteraction,
        SortKey::LastInteraction,
        SortKey::TotalInteractions,
        SortKey::Contact,
        SortKey::AnalysisDate,
    ] {
        for direction in [SortDirection::Asc, SortDirection::Desc] {
            let mut view = ViewState::new(4);
            view.set_min_interactions(Some(3));
            view.set_sort(key, direction);
            view.go_to_page(2, 4).unwrap();

            let a = derive_page(&records, &view);
            let b = derive_page(&reversed, &view);
            assert_eq!(names(&a.rows), names(&b.rows), "{:?} {:?}", key, direction);
            assert_eq!(a.filtered_count, 13);
            assert_eq!(a.total_pages, 4);
        }
    }
}

#[test]
fn test_page_past_end_renders_empty() {
    let records = numbered_records(11);
    let mut view = ViewState::new(10);
    view.go_to_page(2, 2).unwrap();

    // One record deleted: the second page no longer exists.
    let remaining = &records[..10];
    let page = derive_page(remaining, &view);
    assert!(page.rows.is_empty());
    assert_eq!(page.total_pages, 1);
    assert!(!page.has_next());
}

#[tokio::test]
async fn test_confirmed_delete_is_reflected_in_derived_view() {
    let api = ScriptedApi::new();
    api.push_fetch(Ok(numbered_records(12)));
    let store = RecordStore::new(&api);
    store.load().await.unwrap();

    let view = ViewState::new(10);
    let mut engine = TableEngine::new();
    let before = store.snapshot();
    let page = engine.page(&before.records, before.generation, &view);
    assert_eq!(page.filtered_count, 12);

    store.delete("Company 03").await.unwrap();

    let after = store.snapshot();
    let page = engine.page(&after.records, after.generation, &view);
    assert_eq!(page.filtered_count, 11);
    assert!(page.rows.iter().all(|r| r.name != "Company 03"));
    assert_eq!(page.rows[2].name, "Company 04");
    assert_eq!(engine.recomputations(), 2);
}
