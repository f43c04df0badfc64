//! Table storage and execution for the in-memory backend.

use std::collections::HashMap;

use regex::Regex;

use crate::error::AwareSqlError;
use crate::types::DbValue;

use super::parser::{Command, CompareOp, Filter, Operand};

#[derive(Debug, Default)]
struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<DbValue>>,
}

/// Outcome of one executed command.
#[derive(Debug, Default)]
pub(crate) struct Execution {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<DbValue>>,
    /// Driver-native count: affected rows for DML, zero for SELECT. This
    /// engine mimics drivers that do not report selected row counts.
    pub affected: u64,
}

/// The storage shared by every statement of one connection, plus the
/// last-found-rows counter backing `SELECT FOUND_ROWS()`.
#[derive(Debug, Default)]
pub(crate) struct Engine {
    tables: HashMap<String, Table>,
    last_found_rows: u64,
}

impl Engine {
    pub(crate) fn execute(
        &mut self,
        command: &Command,
        params: &HashMap<String, DbValue>,
    ) -> Result<Execution, AwareSqlError> {
        match command {
            Command::FoundRows => {
                let count = i64::try_from(self.last_found_rows).unwrap_or(i64::MAX);
                Ok(Execution {
                    columns: vec!["FOUND_ROWS()".to_string()],
                    rows: vec![vec![DbValue::Int(count)]],
                    affected: 0,
                })
            }
            Command::CreateTable { table, columns } => {
                if self.tables.contains_key(table) {
                    return Err(AwareSqlError::ExecutionError(format!(
                        "table {table} already exists"
                    )));
                }
                self.tables.insert(
                    table.clone(),
                    Table {
                        columns: columns.clone(),
                        rows: Vec::new(),
                    },
                );
                Ok(Execution::default())
            }
            Command::DropTable { table, if_exists } => {
                if self.tables.remove(table).is_none() && !if_exists {
                    return Err(AwareSqlError::ExecutionError(format!(
                        "no such table: {table}"
                    )));
                }
                Ok(Execution::default())
            }
            Command::Insert {
                table,
                columns,
                rows,
            } => self.insert(table, columns, rows, params),
            Command::Select {
                table,
                filter,
                limit,
            } => self.select(table, filter.as_ref(), *limit, params),
            Command::Update {
                table,
                assignments,
                filter,
            } => self.update(table, assignments, filter.as_ref(), params),
            Command::Delete { table, filter } => self.delete(table, filter.as_ref(), params),
        }
    }

    fn table(&self, name: &str) -> Result<&Table, AwareSqlError> {
        self.tables
            .get(name)
            .ok_or_else(|| AwareSqlError::ExecutionError(format!("no such table: {name}")))
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut Table, AwareSqlError> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| AwareSqlError::ExecutionError(format!("no such table: {name}")))
    }

    fn insert(
        &mut self,
        table: &str,
        columns: &[String],
        rows: &[Vec<Operand>],
        params: &HashMap<String, DbValue>,
    ) -> Result<Execution, AwareSqlError> {
        let resolved: Vec<Vec<DbValue>> = rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|operand| resolve(operand, params))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        let target = self.table_mut(table)?;
        let positions: Vec<usize> = if columns.is_empty() {
            (0..target.columns.len()).collect()
        } else {
            columns
                .iter()
                .map(|column| {
                    target.columns.iter().position(|c| c == column).ok_or_else(|| {
                        AwareSqlError::ExecutionError(format!(
                            "no such column in {table}: {column}"
                        ))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?
        };
        let mut affected = 0u64;
        for values in resolved {
            if values.len() != positions.len() {
                return Err(AwareSqlError::ExecutionError(format!(
                    "expected {} values, got {}",
                    positions.len(),
                    values.len()
                )));
            }
            let mut stored = vec![DbValue::Null; target.columns.len()];
            for (position, value) in positions.iter().zip(values) {
                stored[*position] = value;
            }
            target.rows.push(stored);
            affected += 1;
        }
        Ok(Execution {
            affected,
            ..Execution::default()
        })
    }

    fn select(
        &mut self,
        table: &str,
        filter: Option<&Filter>,
        limit: Option<u64>,
        params: &HashMap<String, DbValue>,
    ) -> Result<Execution, AwareSqlError> {
        let (columns, mut matched) = {
            let target = self.table(table)?;
            let matcher = filter
                .map(|f| RowMatcher::build(f, params, &target.columns))
                .transpose()?;
            let mut matched: Vec<Vec<DbValue>> = Vec::new();
            for row in &target.rows {
                let keep = match &matcher {
                    Some(m) => m.matches(row)?,
                    None => true,
                };
                if keep {
                    matched.push(row.clone());
                }
            }
            (target.columns.clone(), matched)
        };
        // FOUND_ROWS() reports the pre-LIMIT match count of this SELECT.
        self.last_found_rows = matched.len() as u64;
        if let Some(limit) = limit {
            matched.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }
        Ok(Execution {
            columns,
            rows: matched,
            affected: 0,
        })
    }

    fn update(
        &mut self,
        table: &str,
        assignments: &[(String, Operand)],
        filter: Option<&Filter>,
        params: &HashMap<String, DbValue>,
    ) -> Result<Execution, AwareSqlError> {
        let columns = self.table(table)?.columns.clone();
        let matcher = filter.map(|f| RowMatcher::build(f, params, &columns)).transpose()?;
        let changes: Vec<(usize, DbValue)> = assignments
            .iter()
            .map(|(column, operand)| {
                let position = columns.iter().position(|c| c == column).ok_or_else(|| {
                    AwareSqlError::ExecutionError(format!("no such column in {table}: {column}"))
                })?;
                Ok((position, resolve(operand, params)?))
            })
            .collect::<Result<Vec<_>, AwareSqlError>>()?;
        let target = self.table_mut(table)?;
        let mut affected = 0u64;
        for row in &mut target.rows {
            let keep = match &matcher {
                Some(m) => m.matches(row)?,
                None => true,
            };
            if keep {
                for (position, value) in &changes {
                    row[*position] = value.clone();
                }
                affected += 1;
            }
        }
        Ok(Execution {
            affected,
            ..Execution::default()
        })
    }

    fn delete(
        &mut self,
        table: &str,
        filter: Option<&Filter>,
        params: &HashMap<String, DbValue>,
    ) -> Result<Execution, AwareSqlError> {
        let columns = self.table(table)?.columns.clone();
        let matcher = filter.map(|f| RowMatcher::build(f, params, &columns)).transpose()?;
        let target = self.table_mut(table)?;
        let before = target.rows.len();
        let mut kept = Vec::with_capacity(before);
        for row in target.rows.drain(..) {
            let matches = match &matcher {
                Some(m) => m.matches(&row)?,
                None => true,
            };
            if !matches {
                kept.push(row);
            }
        }
        target.rows = kept;
        Ok(Execution {
            affected: (before - target.rows.len()) as u64,
            ..Execution::default()
        })
    }
}

/// A filter resolved against the bound parameters and column layout.
struct RowMatcher {
    position: usize,
    op: CompareOp,
    value: DbValue,
    like: Option<Regex>,
}

impl RowMatcher {
    fn build(
        filter: &Filter,
        params: &HashMap<String, DbValue>,
        columns: &[String],
    ) -> Result<Self, AwareSqlError> {
        let position = columns
            .iter()
            .position(|c| *c == filter.column)
            .ok_or_else(|| {
                AwareSqlError::ExecutionError(format!("no such column: {}", filter.column))
            })?;
        let value = resolve(&filter.operand, params)?;
        let like = if filter.op == CompareOp::Like {
            Some(like_regex(&text_of(&value))?)
        } else {
            None
        };
        Ok(Self {
            position,
            op: filter.op,
            value,
            like,
        })
    }

    fn matches(&self, row: &[DbValue]) -> Result<bool, AwareSqlError> {
        let cell = row.get(self.position).unwrap_or(&DbValue::Null);
        Ok(match self.op {
            CompareOp::Eq => values_equal(cell, &self.value),
            CompareOp::Ne => !values_equal(cell, &self.value),
            CompareOp::Like => match &self.like {
                Some(regex) => !cell.is_null() && regex.is_match(&text_of(cell)),
                None => false,
            },
        })
    }
}

fn resolve(
    operand: &Operand,
    params: &HashMap<String, DbValue>,
) -> Result<DbValue, AwareSqlError> {
    match operand {
        Operand::Literal(value) => Ok(value.clone()),
        Operand::Param(name) => params.get(name).cloned().ok_or_else(|| {
            AwareSqlError::ParameterError(format!("no value bound for {name}"))
        }),
    }
}

/// Canonical unquoted text of a value, used for LIKE and mixed-type
/// equality the way loosely typed engines compare.
fn text_of(value: &DbValue) -> String {
    match value {
        DbValue::Int(i) => i.to_string(),
        DbValue::Float(f) => f.to_string(),
        DbValue::Text(s) => s.clone(),
        DbValue::Bool(b) => i64::from(*b).to_string(),
        DbValue::Timestamp(dt) => dt.format("%F %T%.f").to_string(),
        DbValue::Null => String::new(),
        DbValue::JSON(j) => j.to_string(),
        DbValue::Blob(bytes) => bytes.iter().map(|b| format!("{b:02x}")).collect(),
    }
}

fn values_equal(a: &DbValue, b: &DbValue) -> bool {
    match (a, b) {
        (DbValue::Null, _) | (_, DbValue::Null) => false,
        (DbValue::Int(x), DbValue::Int(y)) => x == y,
        (DbValue::Text(x), DbValue::Text(y)) => x == y,
        (DbValue::Bool(x), DbValue::Bool(y)) => x == y,
        _ => text_of(a) == text_of(b),
    }
}

/// Translate a SQL LIKE pattern (`%` and `_` wildcards) into an anchored,
/// case-insensitive regex.
fn like_regex(pattern: &str) -> Result<Regex, AwareSqlError> {
    let mut translated = String::with_capacity(pattern.len() + 8);
    translated.push_str("(?is)^");
    for c in pattern.chars() {
        match c {
            '%' => translated.push_str(".*"),
            '_' => translated.push('.'),
            other => translated.push_str(&regex::escape(&other.to_string())),
        }
    }
    translated.push('$');
    Regex::new(&translated)
        .map_err(|e| AwareSqlError::ExecutionError(format!("bad LIKE pattern {pattern}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::parser::parse;

    fn run(engine: &mut Engine, sql: &str) -> Execution {
        engine
            .execute(&parse(sql).unwrap(), &HashMap::new())
            .unwrap()
    }

    #[test]
    fn found_rows_reports_pre_limit_count() {
        let mut engine = Engine::default();
        run(&mut engine, "CREATE TABLE t (id INT, name CHAR(20))");
        run(
            &mut engine,
            "INSERT INTO t (id, name) VALUES (1, 'apple'), (2, 'banana'), (3, 'avocado')",
        );
        let limited = run(&mut engine, "SELECT * FROM t WHERE name LIKE '%a%' LIMIT 1");
        assert_eq!(limited.rows.len(), 1);
        assert_eq!(limited.affected, 0);
        let probe = run(&mut engine, "SELECT FOUND_ROWS()");
        assert_eq!(probe.rows[0][0], DbValue::Int(3));
    }

    #[test]
    fn probe_does_not_disturb_the_counter() {
        let mut engine = Engine::default();
        run(&mut engine, "CREATE TABLE t (id INT)");
        run(&mut engine, "INSERT INTO t (id) VALUES (1), (2)");
        run(&mut engine, "SELECT * FROM t");
        assert_eq!(
            run(&mut engine, "SELECT FOUND_ROWS()").rows[0][0],
            DbValue::Int(2)
        );
        assert_eq!(
            run(&mut engine, "SELECT FOUND_ROWS()").rows[0][0],
            DbValue::Int(2)
        );
    }

    #[test]
    fn dml_reports_affected_counts() {
        let mut engine = Engine::default();
        run(&mut engine, "CREATE TABLE t (id INT, name CHAR(20))");
        let inserted = run(
            &mut engine,
            "INSERT INTO t (id, name) VALUES (1, 'a'), (2, 'b'), (3, 'c')",
        );
        assert_eq!(inserted.affected, 3);
        let updated = run(&mut engine, "UPDATE t SET name = 'x' WHERE id != 1");
        assert_eq!(updated.affected, 2);
        let deleted = run(&mut engine, "DELETE FROM t WHERE name = 'x'");
        assert_eq!(deleted.affected, 2);
    }

    #[test]
    fn like_is_case_insensitive_and_anchored() {
        assert!(like_regex("APP%").unwrap().is_match("apple"));
        assert!(!like_regex("pp%").unwrap().is_match("apple"));
        assert!(like_regex("_pple").unwrap().is_match("apple"));
    }

    #[test]
    fn unbound_parameter_is_a_parameter_error() {
        let mut engine = Engine::default();
        run(&mut engine, "CREATE TABLE t (id INT)");
        let err = engine
            .execute(
                &parse("SELECT * FROM t WHERE id = :missing").unwrap(),
                &HashMap::new(),
            )
            .unwrap_err();
        assert!(matches!(err, AwareSqlError::ParameterError(_)));
    }
}
