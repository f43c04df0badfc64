//! A deterministic in-memory backend implementing the driver contract.
//!
//! Serves the same role the engine-specific modules serve in a
//! multi-backend middleware: something concrete to run the decorators
//! against. It deliberately reproduces the quirk this crate exists to fix:
//! its native row count is always zero for SELECT statements, and the
//! pre-LIMIT match count is only reachable through `SELECT FOUND_ROWS()`.
//!
//! DSNs use a `memory:` scheme, for example `memory:test`. Each connection
//! owns a fresh engine.

mod engine;
mod parser;

use std::cell::RefCell;
use std::collections::HashMap;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::driver::{
    ConnectOptions, DriverConnection, DriverStatement, FetchMode, PrepareOptions, QueryOptions,
};
use crate::error::AwareSqlError;
use crate::query_utils::normalize_param_name;
use crate::types::{DbValue, ErrorMode, ParamType, ValueRef};

use self::engine::Engine;
use self::parser::Command;

/// Quote a value for textual inclusion in a statement, MySQL style:
/// single-quoted text with backslash-escaped quotes and backslashes.
#[must_use]
pub fn quote_value(value: &DbValue) -> String {
    match value {
        DbValue::Null => "NULL".to_string(),
        DbValue::Int(i) => i.to_string(),
        DbValue::Float(f) => f.to_string(),
        DbValue::Bool(b) => i64::from(*b).to_string(),
        DbValue::Text(s) => quote_text(s),
        DbValue::Timestamp(dt) => quote_text(&dt.format("%F %T%.f").to_string()),
        DbValue::JSON(j) => quote_text(&j.to_string()),
        DbValue::Blob(bytes) => {
            let hex: String = bytes.iter().map(|b| format!("{b:02X}")).collect();
            format!("X'{hex}'")
        }
    }
}

fn quote_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for c in text.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            other => out.push(other),
        }
    }
    out.push('\'');
    out
}

/// An in-memory connection. Statements created from it share its engine.
#[derive(Debug)]
pub struct MemoryConnection {
    engine: Rc<RefCell<Engine>>,
    error_mode: ErrorMode,
}

impl DriverConnection for MemoryConnection {
    type Statement = MemoryStatement;

    fn connect(
        dsn: &str,
        _user: &str,
        _password: &str,
        options: &ConnectOptions,
    ) -> Result<Self, AwareSqlError> {
        if !dsn.starts_with("memory:") {
            return Err(AwareSqlError::ConnectionError(format!(
                "unsupported DSN: {dsn}"
            )));
        }
        let conn = Self {
            engine: Rc::new(RefCell::new(Engine::default())),
            error_mode: options.resolved_error_mode(),
        };
        if let Some(command) = &options.init_command {
            let parsed = parser::parse(command)?;
            conn.engine
                .borrow_mut()
                .execute(&parsed, &HashMap::new())?;
        }
        Ok(conn)
    }

    fn query(
        &mut self,
        sql: &str,
        options: &QueryOptions,
    ) -> Result<Self::Statement, AwareSqlError> {
        let mut stmt = MemoryStatement::new(Rc::clone(&self.engine), parser::parse(sql)?, options.fetch);
        stmt.execute()?;
        Ok(stmt)
    }

    fn prepare(
        &mut self,
        sql: &str,
        _options: &PrepareOptions,
    ) -> Result<Self::Statement, AwareSqlError> {
        Ok(MemoryStatement::new(
            Rc::clone(&self.engine),
            parser::parse(sql)?,
            None,
        ))
    }

    fn quote(&self, value: &DbValue) -> String {
        quote_value(value)
    }

    fn error_mode(&self) -> ErrorMode {
        self.error_mode
    }
}

enum Slot {
    Value(DbValue),
    Ref(ValueRef),
}

impl Slot {
    fn current(&self) -> DbValue {
        match self {
            Slot::Value(v) => v.clone(),
            Slot::Ref(cell) => cell.borrow().clone(),
        }
    }
}

/// A statement handle over the shared engine. Live-reference bindings are
/// re-read each time [`execute`](DriverStatement::execute) runs.
pub struct MemoryStatement {
    engine: Rc<RefCell<Engine>>,
    command: Command,
    fetch: Option<FetchMode>,
    binds: Vec<(String, Slot)>,
    columns: Vec<String>,
    pending: VecDeque<Vec<DbValue>>,
    affected: u64,
}

impl MemoryStatement {
    fn new(engine: Rc<RefCell<Engine>>, command: Command, fetch: Option<FetchMode>) -> Self {
        Self {
            engine,
            command,
            fetch,
            binds: Vec::new(),
            columns: Vec::new(),
            pending: VecDeque::new(),
            affected: 0,
        }
    }

    fn record(&mut self, name: &str, slot: Slot) {
        let key = normalize_param_name(name);
        if let Some(existing) = self.binds.iter_mut().find(|(n, _)| *n == key) {
            existing.1 = slot;
        } else {
            self.binds.push((key, slot));
        }
    }
}

impl DriverStatement for MemoryStatement {
    fn bind_value(
        &mut self,
        name: &str,
        value: DbValue,
        _hint: Option<ParamType>,
    ) -> Result<(), AwareSqlError> {
        self.record(name, Slot::Value(value));
        Ok(())
    }

    fn bind_ref(
        &mut self,
        name: &str,
        var: ValueRef,
        _hint: Option<ParamType>,
        _max_len: Option<usize>,
    ) -> Result<(), AwareSqlError> {
        self.record(name, Slot::Ref(var));
        Ok(())
    }

    fn execute(&mut self) -> Result<(), AwareSqlError> {
        let params: HashMap<String, DbValue> = self
            .binds
            .iter()
            .map(|(name, slot)| (name.clone(), slot.current()))
            .collect();
        let outcome = self.engine.borrow_mut().execute(&self.command, &params)?;
        match self.fetch {
            Some(FetchMode::Column(index)) => {
                self.columns = outcome
                    .columns
                    .get(index)
                    .map(|c| vec![c.clone()])
                    .unwrap_or_default();
                self.pending = outcome
                    .rows
                    .into_iter()
                    .map(|row| {
                        row.into_iter()
                            .nth(index)
                            .map_or_else(|| vec![DbValue::Null], |v| vec![v])
                    })
                    .collect();
            }
            _ => {
                self.columns = outcome.columns;
                self.pending = outcome.rows.into();
            }
        }
        self.affected = outcome.affected;
        Ok(())
    }

    fn fetch_row(&mut self) -> Result<Option<Vec<DbValue>>, AwareSqlError> {
        Ok(self.pending.pop_front())
    }

    fn column_names(&self) -> &[String] {
        &self.columns
    }

    fn row_count(&self) -> u64 {
        self.affected
    }
}
