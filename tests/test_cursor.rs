//! Integration tests for the cursor lifecycle and its state machine.

use futures::TryStreamExt;
use oracle_oci_rs::oci::constants::{TYPECODE_NUMBER, TYPECODE_VARCHAR2};
use oracle_oci_rs::oci::fake::{FakeCell, FakeColumn, FakeOci, Script};
use oracle_oci_rs::{Connection, Error, Table, Value};
use tokio_test::assert_ok;

fn people_api() -> FakeOci {
    let mut api = FakeOci::new();
    api.script(
        "SELECT id, name FROM people",
        Script::select(
            vec![
                FakeColumn::new("ID", TYPECODE_NUMBER, 22),
                FakeColumn::new("NAME", TYPECODE_VARCHAR2, 30).with_char_semantics(),
            ],
            vec![
                vec![FakeCell::Int(1), FakeCell::Text("Ada".to_string())],
                vec![FakeCell::Int(2), FakeCell::Text("Grace".to_string())],
            ],
        ),
    );
    api
}

#[tokio::test]
async fn test_cursor_fetches_row_by_row_then_auto_closes() {
    let mut conn = Connection::new(people_api());
    assert_ok!(conn.cursor_open("SELECT id, name FROM people", None).await);
    assert!(conn.has_open_cursor());

    let first = conn.cursor_fetch().await.unwrap().unwrap();
    assert_eq!(first.get_str("ID"), Some(&Value::Integer(1)));
    assert_eq!(first.get_str("NAME"), Some(&Value::from("Ada")));

    let second = conn.cursor_fetch().await.unwrap().unwrap();
    assert_eq!(second.get_str("NAME"), Some(&Value::from("Grace")));

    // Exhaustion reports "no row" exactly once and closes the cursor.
    assert!(conn.cursor_fetch().await.unwrap().is_none());
    assert!(!conn.has_open_cursor());
    assert_eq!(conn.native().live_handles(), 0);

    // Past exhaustion fetching is a state error, not a native call.
    let err = conn.cursor_fetch().await.unwrap_err();
    assert!(matches!(err, Error::NoOpenCursor));
}

#[tokio::test]
async fn test_cursor_open_rejects_non_select() {
    let mut api = FakeOci::new();
    api.script("DELETE FROM people", Script::dml());

    let mut conn = Connection::new(api);
    let err = conn.cursor_open("DELETE FROM people", None).await.unwrap_err();
    assert!(matches!(err, Error::InvalidStatementType));
    // The rejected statement did not leak its handle.
    assert!(!conn.has_open_cursor());
    assert_eq!(conn.native().live_handles(), 0);
}

#[tokio::test]
async fn test_second_open_while_cursor_is_live_is_rejected() {
    let mut conn = Connection::new(people_api());
    conn.cursor_open("SELECT id, name FROM people", None)
        .await
        .unwrap();

    let err = conn
        .cursor_open("SELECT id, name FROM people", None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::CursorAlreadyOpen));

    let err = conn
        .execute("SELECT id, name FROM people", None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::CursorAlreadyOpen));
}

#[tokio::test]
async fn test_cursor_close_releases_and_is_noop_without_cursor() {
    let mut conn = Connection::new(people_api());
    // No cursor open: nothing to do, not an error.
    assert_ok!(conn.cursor_close());

    conn.cursor_open("SELECT id, name FROM people", None)
        .await
        .unwrap();
    assert_ok!(conn.cursor_close());
    assert!(!conn.has_open_cursor());
    assert_eq!(conn.native().live_handles(), 0);

    let err = conn.cursor_fetch().await.unwrap_err();
    assert!(matches!(err, Error::NoOpenCursor));
}

#[tokio::test]
async fn test_cursor_with_bound_parameters() {
    let mut api = FakeOci::new();
    api.script(
        "SELECT name FROM people WHERE id = :id",
        Script::select(
            vec![FakeColumn::new("NAME", TYPECODE_VARCHAR2, 30)],
            vec![vec![FakeCell::Text("Ada".to_string())]],
        ),
    );

    let mut params = Table::new();
    params.set("id", 1i64);

    let mut conn = Connection::new(api);
    conn.cursor_open("SELECT name FROM people WHERE id = :id", Some(&params))
        .await
        .unwrap();

    assert_eq!(conn.native().captured().len(), 1);
    assert_eq!(conn.native().captured()[0].name, "id");

    let row = conn.cursor_fetch().await.unwrap().unwrap();
    assert_eq!(row.get_str("NAME"), Some(&Value::from("Ada")));
}

#[tokio::test]
async fn test_row_stream_drains_the_cursor() {
    let mut conn = Connection::new(people_api());
    conn.cursor_open("SELECT id, name FROM people", None)
        .await
        .unwrap();

    let names: Vec<String> = conn
        .row_stream()
        .map_ok(|row| row.get_str("NAME").unwrap().as_str().unwrap().to_string())
        .try_collect()
        .await
        .unwrap();
    assert_eq!(names, vec!["Ada", "Grace"]);
    assert!(!conn.has_open_cursor());
}

#[tokio::test]
async fn test_close_with_open_cursor_releases_everything() {
    let mut conn = Connection::new(people_api());
    conn.cursor_open("SELECT id, name FROM people", None)
        .await
        .unwrap();

    assert!(conn.close());
    assert_eq!(conn.native().live_handles(), 0);
    assert_eq!(conn.native().double_release_count(), 0);
    assert!(!conn.close());
}
