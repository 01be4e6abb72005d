//! Behavioural coverage for the end-to-end import pipeline.

use fable_core::RecordError;
use fable_data::test_support::{
    StubPageSource, block_on_for_tests, book_wrapper_json, book_wrapper_without, page_json,
};
use fable_data::{BookStore, ImportError, ImportReport, PageUrl, PersistBooksError, import_all};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;

const FIRST_PAGE: &str = "https://api.fable.test/v2/users/reader/book_lists/finished/books/";
const SECOND_PAGE: &str =
    "https://api.fable.test/v2/users/reader/book_lists/finished/books/?offset=10";

type ImportOutcome = RefCell<Option<Result<ImportReport, ImportError>>>;

#[fixture]
fn source() -> RefCell<Option<StubPageSource>> {
    RefCell::new(None)
}

#[fixture]
fn store() -> RefCell<Option<BookStore>> {
    RefCell::new(None)
}

#[fixture]
fn outcome() -> ImportOutcome {
    RefCell::new(None)
}

fn count(store: &RefCell<Option<BookStore>>, table: &str) -> i64 {
    let guard = store.borrow();
    let opened = guard
        .as_ref()
        .unwrap_or_else(|| panic!("store must be initialised"));
    opened
        .connection()
        .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
            row.get(0)
        })
        .unwrap_or_else(|err| panic!("failed to count {table}: {err}"))
}

// --- Given steps ---

#[given("an API with a single page holding one book")]
fn single_page(source: &RefCell<Option<StubPageSource>>) {
    *source.borrow_mut() = Some(
        StubPageSource::new()
            .with_json_page(FIRST_PAGE, &page_json(vec![book_wrapper_json("b1")], None)),
    );
}

#[given("an API with two pages holding one book each")]
fn two_pages(source: &RefCell<Option<StubPageSource>>) {
    *source.borrow_mut() = Some(
        StubPageSource::new()
            .with_json_page(
                FIRST_PAGE,
                &page_json(vec![book_wrapper_json("b1")], Some(SECOND_PAGE)),
            )
            .with_json_page(SECOND_PAGE, &page_json(vec![book_wrapper_json("b2")], None)),
    );
}

#[given("an API page whose second book has no title")]
fn page_missing_title(source: &RefCell<Option<StubPageSource>>) {
    let results = vec![
        book_wrapper_json("b1"),
        book_wrapper_without("b2", "title"),
        book_wrapper_json("b3"),
    ];
    *source.borrow_mut() = Some(
        StubPageSource::new()
            .with_json_page(FIRST_PAGE, &page_json(results, Some(SECOND_PAGE)))
            .with_json_page(SECOND_PAGE, &page_json(vec![book_wrapper_json("b4")], None)),
    );
}

#[given("an empty library database")]
fn empty_database(store: &RefCell<Option<BookStore>>) {
    *store.borrow_mut() = Some(BookStore::open_in_memory().expect("open in-memory store"));
}

// --- When steps ---

#[when("I import the collection")]
fn import(
    source: &RefCell<Option<StubPageSource>>,
    store: &RefCell<Option<BookStore>>,
    outcome: &ImportOutcome,
) {
    let source_guard = source.borrow();
    let stub = source_guard
        .as_ref()
        .unwrap_or_else(|| panic!("source must be initialised"));
    let mut store_guard = store.borrow_mut();
    let opened = store_guard
        .as_mut()
        .unwrap_or_else(|| panic!("store must be initialised"));
    let start = PageUrl::parse(FIRST_PAGE).expect("valid start URL");
    *outcome.borrow_mut() = Some(block_on_for_tests(import_all(stub, start, opened)));
}

// --- Then steps ---

#[then("the import succeeds after 1 request")]
fn succeeds_after_one(outcome: &ImportOutcome) {
    assert_success(outcome, 1);
}

#[then("the import succeeds after 2 requests")]
fn succeeds_after_two(
    outcome: &ImportOutcome,
    source: &RefCell<Option<StubPageSource>>,
) {
    assert_success(outcome, 2);
    let guard = source.borrow();
    let stub = guard
        .as_ref()
        .unwrap_or_else(|| panic!("source must be initialised"));
    assert_eq!(
        stub.requests(),
        vec![FIRST_PAGE.to_owned(), SECOND_PAGE.to_owned()]
    );
}

fn assert_success(outcome: &ImportOutcome, requests: usize) {
    let binding = outcome.borrow();
    match binding.as_ref() {
        Some(Ok(report)) => {
            assert_eq!(report.requests, requests);
            assert_eq!(report.pages, requests);
        }
        Some(Err(err)) => panic!("expected success, got error: {err}"),
        None => panic!("import outcome must be recorded"),
    }
}

#[then("the library holds 1 book with 2 authors and 3 subjects")]
fn one_book(store: &RefCell<Option<BookStore>>) {
    assert_eq!(count(store, "book"), 1);
    assert_eq!(count(store, "author"), 2);
    assert_eq!(count(store, "subject"), 3);
    assert_eq!(count(store, "genre"), 1);
    assert_eq!(count(store, "users"), 1);
}

#[then("the book has empty storygraph tags and a populated review summary")]
fn optional_rows(store: &RefCell<Option<BookStore>>) {
    let guard = store.borrow();
    let connection = guard
        .as_ref()
        .unwrap_or_else(|| panic!("store must be initialised"))
        .connection();
    let tags: (String, String, String) = connection
        .query_row(
            "SELECT moods, genres, content_warnings FROM storygraph_tag WHERE book_id = 'b1'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .expect("storygraph row");
    assert_eq!(tags, (String::new(), String::new(), String::new()));
    let summary: (String, String, String) = connection
        .query_row(
            "SELECT liked, disliked, disagreed FROM review_summary WHERE book_id = 'b1'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .expect("review summary row");
    assert_eq!(
        summary,
        ("Prose".to_owned(), "Pacing".to_owned(), "Ending".to_owned())
    );
}

#[then("the library holds 2 books with 4 authors and 6 subjects")]
fn two_books(store: &RefCell<Option<BookStore>>) {
    assert_eq!(count(store, "book"), 2);
    assert_eq!(count(store, "author"), 4);
    assert_eq!(count(store, "subject"), 6);
    assert_eq!(count(store, "storygraph_tag"), 2);
    assert_eq!(count(store, "review_summary"), 2);
}

#[then("the import fails on page 1 at result 1")]
fn fails_on_first_page(
    outcome: &ImportOutcome,
    source: &RefCell<Option<StubPageSource>>,
) {
    let binding = outcome.borrow();
    match binding.as_ref() {
        Some(Err(ImportError::Persist {
            page,
            source:
                PersistBooksError::Record {
                    index,
                    book_id,
                    source: RecordError::Decode { .. },
                },
            ..
        })) => {
            assert_eq!(*page, 1);
            assert_eq!(*index, 1);
            assert_eq!(book_id.as_deref(), Some("b2"));
        }
        Some(other) => panic!("expected a record error on page 1, got {other:?}"),
        None => panic!("import outcome must be recorded"),
    }
    let guard = source.borrow();
    let stub = guard
        .as_ref()
        .unwrap_or_else(|| panic!("source must be initialised"));
    assert_eq!(stub.requests().len(), 1, "later pages must not be fetched");
}

#[then("the library holds no books")]
fn no_books(store: &RefCell<Option<BookStore>>) {
    assert_eq!(count(store, "book"), 0);
    assert_eq!(count(store, "author"), 0);
    assert_eq!(count(store, "users"), 0);
}

#[then("the library holds 1 book with 4 authors and 6 subjects")]
fn duplicated_children(store: &RefCell<Option<BookStore>>) {
    assert_eq!(count(store, "book"), 1);
    assert_eq!(count(store, "author"), 4);
    assert_eq!(count(store, "subject"), 6);
    assert_eq!(count(store, "genre"), 2);
    assert_eq!(count(store, "storygraph_tag"), 2);
    assert_eq!(count(store, "review_summary"), 2);
    assert_eq!(count(store, "users"), 2);
}

// --- Scenarios ---

#[scenario(path = "tests/features/import_books.feature", index = 0)]
fn import_single_page(
    source: RefCell<Option<StubPageSource>>,
    store: RefCell<Option<BookStore>>,
    outcome: ImportOutcome,
) {
    let _ = (source, store, outcome);
}

#[scenario(path = "tests/features/import_books.feature", index = 1)]
fn import_follows_cursor(
    source: RefCell<Option<StubPageSource>>,
    store: RefCell<Option<BookStore>>,
    outcome: ImportOutcome,
) {
    let _ = (source, store, outcome);
}

#[scenario(path = "tests/features/import_books.feature", index = 2)]
fn import_aborts_on_missing_title(
    source: RefCell<Option<StubPageSource>>,
    store: RefCell<Option<BookStore>>,
    outcome: ImportOutcome,
) {
    let _ = (source, store, outcome);
}

#[scenario(path = "tests/features/import_books.feature", index = 3)]
fn import_twice_duplicates_children(
    source: RefCell<Option<StubPageSource>>,
    store: RefCell<Option<BookStore>>,
    outcome: ImportOutcome,
) {
    let _ = (source, store, outcome);
}
