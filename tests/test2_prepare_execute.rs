#![cfg(feature = "memory")]

use sql_aware::memory::MemoryConnection;
use sql_aware::prelude::*;

fn seeded_connection() -> Connection<MemoryConnection> {
    let conn = Connection::<MemoryConnection>::connect_default("memory:test", "", "")
        .expect("connect");
    conn.query("CREATE TABLE inventory (id INT, something CHAR(50))")
        .expect("create");
    conn.query(
        "INSERT INTO inventory (id, something) VALUES \
         (1, 'a'), (2, 'xyz'), (3, 'apple'), (4, 'banana'), (5, '96720')",
    )
    .expect("seed");
    conn
}

#[test]
fn execute_with_inline_parameters() -> Result<(), AwareSqlError> {
    let conn = seeded_connection();
    let sql = "SELECT * FROM inventory WHERE something LIKE :search";
    let mut stmt = conn.prepare(sql)?;
    assert_eq!(stmt.query_text(), sql);
    assert_eq!(stmt.row_count(), 0); // not yet executed

    stmt.execute(Some(&[(":search", DbValue::Text("a%".into()))]))?;

    // 'a%' matches 'a' and 'apple'.
    assert_eq!(stmt.row_count(), 2);
    assert_eq!(
        stmt.params(),
        vec![(":search".to_string(), DbValue::Text("a%".into()))]
    );
    assert_eq!(
        stmt.substituted_query()?,
        "SELECT * FROM inventory WHERE something LIKE 'a%'"
    );

    let rows = stmt.fetch_all()?;
    assert_eq!(rows.len(), 2);
    Ok(())
}

#[test]
fn inline_names_are_normalized_with_or_without_colon() -> Result<(), AwareSqlError> {
    let conn = seeded_connection();
    let mut stmt = conn.prepare("SELECT * FROM inventory WHERE something LIKE :search")?;

    // Bare name and colon-prefixed name address the same parameter.
    stmt.execute(Some(&[("search", DbValue::Text("banana".into()))]))?;
    assert_eq!(stmt.row_count(), 1);

    stmt.execute(Some(&[(":search", DbValue::Text("xyz".into()))]))?;
    assert_eq!(stmt.row_count(), 1);

    // Still a single recorded parameter, holding the latest value.
    assert_eq!(
        stmt.params(),
        vec![(":search".to_string(), DbValue::Text("xyz".into()))]
    );
    Ok(())
}

#[test]
fn executing_without_required_binding_fails() {
    let conn = seeded_connection();
    let mut stmt = conn
        .prepare("SELECT * FROM inventory WHERE something LIKE :search")
        .expect("prepare");
    let err = stmt.execute(None).unwrap_err();
    assert!(matches!(err, AwareSqlError::ParameterError(_)));
}

#[test]
fn prepared_dml_uses_native_count_without_probing() -> Result<(), AwareSqlError> {
    let conn = seeded_connection();
    // Put a known value in the probe counter to show DML leaves it alone.
    conn.query("SELECT * FROM inventory")?;

    let mut stmt = conn.prepare("DELETE FROM inventory WHERE something LIKE :doomed")?;
    stmt.execute(Some(&[(":doomed", DbValue::Text("%an%".into()))]))?;
    assert_eq!(stmt.row_count(), 1); // banana

    let mut probe = conn.query(FOUND_ROWS_PROBE)?;
    assert_eq!(probe.fetch_scalar()?, Some(DbValue::Int(5)));
    Ok(())
}
