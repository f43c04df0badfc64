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
fn live_reference_is_reread_on_each_execute() -> Result<(), AwareSqlError> {
    let conn = seeded_connection();
    let mut stmt = conn.prepare("SELECT * FROM inventory WHERE something LIKE :search")?;

    let search = DbValue::Text("apple".into()).into_ref();
    stmt.bind_param(":search", ValueRef::clone(&search), None, None)?;

    stmt.execute(None)?;
    assert_eq!(stmt.row_count(), 1);
    assert!(stmt.substituted_query()?.contains("'apple'"));

    // Mutating the cell without rebinding changes the next execution.
    *search.borrow_mut() = DbValue::Text("orange".into());
    stmt.execute(None)?;
    assert_eq!(stmt.row_count(), 0);
    assert!(stmt.substituted_query()?.contains("'orange'"));

    *search.borrow_mut() = DbValue::Text("%a%".into());
    stmt.execute(None)?;
    // 'a', 'apple', 'banana' all contain an 'a'.
    assert_eq!(stmt.row_count(), 3);
    assert!(stmt.substituted_query()?.contains("'%a%'"));

    let rows = stmt.fetch_all()?;
    let names: Vec<_> = rows
        .results
        .iter()
        .filter_map(|row| row.get("something").and_then(|v| v.as_text().map(String::from)))
        .collect();
    assert_eq!(names, vec!["a", "apple", "banana"]);
    Ok(())
}

#[test]
fn params_snapshot_tracks_the_cell() -> Result<(), AwareSqlError> {
    let conn = seeded_connection();
    let mut stmt = conn.prepare("SELECT * FROM inventory WHERE something LIKE :search")?;

    let search = DbValue::Null.into_ref();
    stmt.bind_param("search", ValueRef::clone(&search), Some(ParamType::Str), Some(50))?;
    assert_eq!(stmt.params(), vec![(":search".to_string(), DbValue::Null)]);

    *search.borrow_mut() = DbValue::Text("xyz".into());
    assert_eq!(
        stmt.params(),
        vec![(":search".to_string(), DbValue::Text("xyz".into()))]
    );
    Ok(())
}

#[test]
fn bind_value_overrides_an_earlier_live_reference() -> Result<(), AwareSqlError> {
    let conn = seeded_connection();
    let mut stmt = conn.prepare("SELECT * FROM inventory WHERE something LIKE :search")?;

    let cell = DbValue::Text("apple".into()).into_ref();
    stmt.bind_param(":search", ValueRef::clone(&cell), None, None)?;
    stmt.bind_value(":search", DbValue::Text("xyz".into()), None)?;

    stmt.execute(None)?;
    assert_eq!(stmt.row_count(), 1);

    // The detached cell no longer influences anything.
    *cell.borrow_mut() = DbValue::Text("banana".into());
    assert_eq!(
        stmt.params(),
        vec![(":search".to_string(), DbValue::Text("xyz".into()))]
    );
    Ok(())
}
