//! Behavioural tests for persisting book pages using rstest-bdd.

use super::super::{BookStore, PersistBooksError, PersistSummary};
use crate::test_support::book_wrapper_json;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::Value;
use std::cell::RefCell;

const BOOK_ID: &str = "b-42";

#[fixture]
pub fn store() -> RefCell<Option<BookStore>> {
    RefCell::new(None)
}

#[fixture]
pub fn page() -> RefCell<Vec<Value>> {
    RefCell::new(Vec::new())
}

#[fixture]
pub fn persist_result() -> RefCell<Option<Result<PersistSummary, PersistBooksError>>> {
    RefCell::new(None)
}

fn with_store<T>(store: &RefCell<Option<BookStore>>, action: impl FnOnce(&BookStore) -> T) -> T {
    let guard = store.borrow();
    let opened = guard
        .as_ref()
        .unwrap_or_else(|| panic!("store must be initialised"));
    action(opened)
}

fn expect_success(persist_result: &RefCell<Option<Result<PersistSummary, PersistBooksError>>>) {
    let binding = persist_result.borrow();
    let result = binding
        .as_ref()
        .unwrap_or_else(|| panic!("persistence result must be recorded"));
    if let Err(err) = result {
        panic!("expected success, got error: {err}");
    }
}

#[given("an empty library database")]
fn empty_database(store: &RefCell<Option<BookStore>>) {
    *store.borrow_mut() = Some(BookStore::open_in_memory().expect("open in-memory store"));
}

#[given("a book record without storygraph tags or review summary")]
fn record_without_optionals(page: &RefCell<Vec<Value>>) {
    let mut wrapper = book_wrapper_json(BOOK_ID);
    wrapper["book"]["storygraph_tags"] = Value::Null;
    wrapper["book"]["review_summary"] = Value::Null;
    page.borrow_mut().push(wrapper);
}

#[given("a book record with subject groups Fiction and Drama then Classics")]
fn record_with_subjects(page: &RefCell<Vec<Value>>) {
    page.borrow_mut().push(book_wrapper_json(BOOK_ID));
}

#[when("I persist the page")]
fn persist(
    store: &RefCell<Option<BookStore>>,
    page: &RefCell<Vec<Value>>,
    persist_result: &RefCell<Option<Result<PersistSummary, PersistBooksError>>>,
) {
    let results = page.borrow_mut().drain(..).collect();
    let mut guard = store.borrow_mut();
    let opened = guard
        .as_mut()
        .unwrap_or_else(|| panic!("store must be initialised"));
    *persist_result.borrow_mut() = Some(opened.persist_page(results));
}

#[then("the storygraph tag row holds empty strings")]
fn storygraph_empty(
    store: &RefCell<Option<BookStore>>,
    persist_result: &RefCell<Option<Result<PersistSummary, PersistBooksError>>>,
) {
    expect_success(persist_result);
    let rows: Vec<(String, String, String)> = with_store(store, |opened| {
        let mut statement = opened
            .connection()
            .prepare("SELECT moods, genres, content_warnings FROM storygraph_tag WHERE book_id = ?1")
            .expect("prepare select");
        statement
            .query_map([BOOK_ID], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
            .expect("query storygraph rows")
            .collect::<Result<_, _>>()
            .expect("collect storygraph rows")
    });
    assert_eq!(rows, vec![(String::new(), String::new(), String::new())]);
}

#[then("the review summary row holds empty strings")]
fn review_summary_empty(store: &RefCell<Option<BookStore>>) {
    let rows: Vec<(String, String, String)> = with_store(store, |opened| {
        let mut statement = opened
            .connection()
            .prepare("SELECT liked, disliked, disagreed FROM review_summary WHERE book_id = ?1")
            .expect("prepare select");
        statement
            .query_map([BOOK_ID], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
            .expect("query review rows")
            .collect::<Result<_, _>>()
            .expect("collect review rows")
    });
    assert_eq!(rows, vec![(String::new(), String::new(), String::new())]);
}

#[then("three subject rows reference the book")]
fn subjects_flattened(
    store: &RefCell<Option<BookStore>>,
    persist_result: &RefCell<Option<Result<PersistSummary, PersistBooksError>>>,
) {
    expect_success(persist_result);
    let categories: Vec<String> = with_store(store, |opened| {
        let mut statement = opened
            .connection()
            .prepare("SELECT category FROM subject WHERE book_id = ?1 ORDER BY rowid")
            .expect("prepare select");
        statement
            .query_map([BOOK_ID], |row| row.get(0))
            .expect("query subjects")
            .collect::<Result<_, _>>()
            .expect("collect subjects")
    });
    assert_eq!(categories, vec!["Fiction", "Drama", "Classics"]);
}

#[scenario(path = "tests/features/persist_books.feature", index = 0)]
fn persist_absent_optionals(
    store: RefCell<Option<BookStore>>,
    page: RefCell<Vec<Value>>,
    persist_result: RefCell<Option<Result<PersistSummary, PersistBooksError>>>,
) {
    let _ = (store, page, persist_result);
}

#[scenario(path = "tests/features/persist_books.feature", index = 1)]
fn persist_flattened_subjects(
    store: RefCell<Option<BookStore>>,
    page: RefCell<Vec<Value>>,
    persist_result: RefCell<Option<Result<PersistSummary, PersistBooksError>>>,
) {
    let _ = (store, page, persist_result);
}
