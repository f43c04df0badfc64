#![cfg(feature = "memory")]

use sql_aware::memory::MemoryConnection;
use sql_aware::prelude::*;

fn seeded_connection() -> Connection<MemoryConnection> {
    let conn = Connection::<MemoryConnection>::connect_default("memory:test", "", "")
        .expect("connect");
    conn.query(
        "CREATE TABLE inventory (id INT AUTO_INCREMENT NOT NULL PRIMARY KEY, something CHAR(50))",
    )
    .expect("create");
    conn.query(
        "INSERT INTO inventory (id, something) VALUES \
         (1, 'a'), (2, 'xyz'), (3, 'apple'), (4, 'banana'), (5, '96720')",
    )
    .expect("seed");
    conn
}

#[test]
fn immediate_select_is_stamped_and_counted() -> Result<(), AwareSqlError> {
    let conn = seeded_connection();
    let sql = "SELECT * FROM inventory";
    let mut stmt = conn.query(sql)?;

    assert_eq!(stmt.query_text(), sql);
    assert_eq!(stmt.row_count(), 5);

    let rows = stmt.fetch_all()?;
    assert_eq!(rows.len(), 5);
    assert_eq!(
        rows.results[2].get("something"),
        Some(&DbValue::Text("apple".into()))
    );
    Ok(())
}

#[test]
fn immediate_dml_reports_native_affected_count() -> Result<(), AwareSqlError> {
    let conn = seeded_connection();
    let stmt = conn.query("INSERT INTO inventory (id, something) VALUES (6, 'mango'), (7, 'kiwi')")?;
    assert_eq!(stmt.row_count(), 2);

    let stmt = conn.query("DELETE FROM inventory WHERE something = 'mango'")?;
    assert_eq!(stmt.row_count(), 1);
    Ok(())
}

#[test]
fn probe_text_is_never_stamped_or_probed() -> Result<(), AwareSqlError> {
    let conn = seeded_connection();
    conn.query("SELECT * FROM inventory")?;

    // The literal probe goes straight through: no stamped text, no row
    // count, no nested probe. Its scalar is still readable.
    let mut probe = conn.query("SELECT FOUND_ROWS()")?;
    assert_eq!(probe.query_text(), "");
    assert_eq!(probe.row_count(), 0);
    assert_eq!(probe.fetch_scalar()?, Some(DbValue::Int(5)));

    // Case, surrounding whitespace, and a trailing semicolon do not defeat
    // the guard.
    let probe = conn.query("  select found_rows()  ")?;
    assert_eq!(probe.query_text(), "");
    let probe = conn.query("SELECT FOUND_ROWS();")?;
    assert_eq!(probe.query_text(), "");
    assert_eq!(probe.row_count(), 0);
    Ok(())
}

#[test]
fn connect_failure_propagates() {
    let err = Connection::<MemoryConnection>::connect_default(
        "mysql:host=localhost;dbname=test",
        "root",
        "",
    )
    .unwrap_err();
    assert!(matches!(err, AwareSqlError::ConnectionError(_)));
}

#[test]
fn error_mode_defaults_to_exception_and_honors_overrides() -> Result<(), AwareSqlError> {
    let conn = Connection::<MemoryConnection>::connect_default("memory:test", "", "")?;
    assert_eq!(conn.error_mode(), ErrorMode::Exception);

    let conn = Connection::<MemoryConnection>::connect(
        "memory:test",
        "",
        "",
        ConnectOptions::default().with_error_mode(ErrorMode::Silent),
    )?;
    assert_eq!(conn.error_mode(), ErrorMode::Silent);
    Ok(())
}

#[test]
fn connection_debug_output_names_the_error_mode() -> Result<(), AwareSqlError> {
    let conn = Connection::<MemoryConnection>::connect(
        "memory:test",
        "",
        "",
        ConnectOptions::default().with_error_mode(ErrorMode::Silent),
    )?;
    let rendered = format!("{conn:?}");
    assert!(rendered.contains("Connection"));
    assert!(rendered.contains("Silent"));
    Ok(())
}

#[test]
fn init_command_prepares_the_session() -> Result<(), AwareSqlError> {
    let conn = Connection::<MemoryConnection>::connect(
        "memory:test",
        "",
        "",
        ConnectOptions::default().with_init_command("CREATE TABLE boot (id INT)"),
    )?;
    let stmt = conn.query("INSERT INTO boot (id) VALUES (1)")?;
    assert_eq!(stmt.row_count(), 1);
    Ok(())
}
