//! Statement parsing for the in-memory backend.
//!
//! Covers the shapes a debugging session actually issues: table setup and
//! teardown, inserts, single-condition selects with an optional LIMIT,
//! updates, deletes, and the `SELECT FOUND_ROWS()` probe. Anything else is a
//! parse error; this backend is a reference driver, not a SQL engine.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::AwareSqlError;
use crate::types::DbValue;

/// A literal or a named-parameter reference inside a statement.
#[derive(Debug, Clone)]
pub(crate) enum Operand {
    Literal(DbValue),
    Param(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompareOp {
    Eq,
    Ne,
    Like,
}

/// A single `column <op> operand` condition.
#[derive(Debug, Clone)]
pub(crate) struct Filter {
    pub column: String,
    pub op: CompareOp,
    pub operand: Operand,
}

#[derive(Debug, Clone)]
pub(crate) enum Command {
    CreateTable {
        table: String,
        columns: Vec<String>,
    },
    DropTable {
        table: String,
        if_exists: bool,
    },
    Insert {
        table: String,
        columns: Vec<String>,
        rows: Vec<Vec<Operand>>,
    },
    Select {
        table: String,
        filter: Option<Filter>,
        limit: Option<u64>,
    },
    Update {
        table: String,
        assignments: Vec<(String, Operand)>,
        filter: Option<Filter>,
    },
    Delete {
        table: String,
        filter: Option<Filter>,
    },
    FoundRows,
}

static FOUND_ROWS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*SELECT\s+FOUND_ROWS\(\)\s*;?\s*$").expect("static regex"));
static SELECT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^\s*SELECT\s+\*\s+FROM\s+(\w+)(?:\s+WHERE\s+(.+?))?(?:\s+LIMIT\s+(\d+))?\s*;?\s*$")
        .expect("static regex")
});
static INSERT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^\s*INSERT\s+INTO\s+(\w+)\s*(?:\(([^)]*)\)\s*)?VALUES\s*(.+?)\s*;?\s*$")
        .expect("static regex")
});
static CREATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^\s*CREATE\s+TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?(\w+)\s*\((.*)\)[^)]*$")
        .expect("static regex")
});
static DROP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^\s*DROP\s+TABLE\s+(IF\s+EXISTS\s+)?(\w+)\s*;?\s*$").expect("static regex")
});
static UPDATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^\s*UPDATE\s+(\w+)\s+SET\s+(.+?)(?:\s+WHERE\s+(.+?))?\s*;?\s*$")
        .expect("static regex")
});
static DELETE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^\s*DELETE\s+FROM\s+(\w+)(?:\s+WHERE\s+(.+?))?\s*;?\s*$").expect("static regex")
});
static CONDITION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^\s*(\w+)\s*(=|!=|<>|LIKE\b)\s*(.+?)\s*$").expect("static regex")
});

pub(crate) fn parse(sql: &str) -> Result<Command, AwareSqlError> {
    if FOUND_ROWS_RE.is_match(sql) {
        return Ok(Command::FoundRows);
    }
    if let Some(caps) = SELECT_RE.captures(sql) {
        let filter = caps.get(2).map(|m| parse_condition(m.as_str())).transpose()?;
        let limit = caps.get(3).map(|m| {
            m.as_str()
                .parse::<u64>()
                .map_err(|e| AwareSqlError::ParseError(format!("bad LIMIT: {e}")))
        });
        return Ok(Command::Select {
            table: caps[1].to_string(),
            filter,
            limit: limit.transpose()?,
        });
    }
    if let Some(caps) = INSERT_RE.captures(sql) {
        let columns = caps
            .get(2)
            .map(|m| split_idents(m.as_str()))
            .unwrap_or_default();
        let rows = parse_tuples(&caps[3])?;
        return Ok(Command::Insert {
            table: caps[1].to_string(),
            columns,
            rows,
        });
    }
    if let Some(caps) = CREATE_RE.captures(sql) {
        return Ok(Command::CreateTable {
            table: caps[1].to_string(),
            columns: column_names_from_defs(&caps[2]),
        });
    }
    if let Some(caps) = DROP_RE.captures(sql) {
        return Ok(Command::DropTable {
            table: caps[2].to_string(),
            if_exists: caps.get(1).is_some(),
        });
    }
    if let Some(caps) = UPDATE_RE.captures(sql) {
        let assignments = parse_assignments(&caps[2])?;
        let filter = caps.get(3).map(|m| parse_condition(m.as_str())).transpose()?;
        return Ok(Command::Update {
            table: caps[1].to_string(),
            assignments,
            filter,
        });
    }
    if let Some(caps) = DELETE_RE.captures(sql) {
        let filter = caps.get(2).map(|m| parse_condition(m.as_str())).transpose()?;
        return Ok(Command::Delete {
            table: caps[1].to_string(),
            filter,
        });
    }
    Err(AwareSqlError::ParseError(format!(
        "unsupported statement: {}",
        sql.trim()
    )))
}

fn parse_condition(text: &str) -> Result<Filter, AwareSqlError> {
    let caps = CONDITION_RE
        .captures(text)
        .ok_or_else(|| AwareSqlError::ParseError(format!("bad WHERE clause: {text}")))?;
    let op = match caps[2].to_ascii_uppercase().trim() {
        "=" => CompareOp::Eq,
        "!=" | "<>" => CompareOp::Ne,
        "LIKE" => CompareOp::Like,
        other => {
            return Err(AwareSqlError::ParseError(format!(
                "unsupported operator: {other}"
            )));
        }
    };
    Ok(Filter {
        column: caps[1].to_string(),
        op,
        operand: parse_operand(&caps[3])?,
    })
}

fn parse_assignments(text: &str) -> Result<Vec<(String, Operand)>, AwareSqlError> {
    let mut assignments = Vec::new();
    for part in split_top_level(text, ',') {
        let Some((column, value)) = part.split_once('=') else {
            return Err(AwareSqlError::ParseError(format!(
                "bad SET clause: {part}"
            )));
        };
        assignments.push((column.trim().to_string(), parse_operand(value.trim())?));
    }
    Ok(assignments)
}

fn parse_tuples(text: &str) -> Result<Vec<Vec<Operand>>, AwareSqlError> {
    let mut rows = Vec::new();
    for tuple in split_top_level(text, ',') {
        let tuple = tuple.trim();
        let inner = tuple
            .strip_prefix('(')
            .and_then(|t| t.strip_suffix(')'))
            .ok_or_else(|| {
                AwareSqlError::ParseError(format!("bad VALUES tuple: {tuple}"))
            })?;
        let mut row = Vec::new();
        for value in split_top_level(inner, ',') {
            row.push(parse_operand(value.trim())?);
        }
        rows.push(row);
    }
    Ok(rows)
}

fn parse_operand(text: &str) -> Result<Operand, AwareSqlError> {
    let text = text.trim();
    if let Some(name) = text.strip_prefix(':') {
        if !name.is_empty() && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
            return Ok(Operand::Param(format!(":{name}")));
        }
        return Err(AwareSqlError::ParseError(format!(
            "bad parameter reference: {text}"
        )));
    }
    if text.eq_ignore_ascii_case("NULL") {
        return Ok(Operand::Literal(DbValue::Null));
    }
    if text.eq_ignore_ascii_case("TRUE") {
        return Ok(Operand::Literal(DbValue::Bool(true)));
    }
    if text.eq_ignore_ascii_case("FALSE") {
        return Ok(Operand::Literal(DbValue::Bool(false)));
    }
    if text.starts_with('\'') || text.starts_with('"') {
        return Ok(Operand::Literal(DbValue::Text(unquote(text)?)));
    }
    if let Ok(i) = text.parse::<i64>() {
        return Ok(Operand::Literal(DbValue::Int(i)));
    }
    if let Ok(f) = text.parse::<f64>() {
        return Ok(Operand::Literal(DbValue::Float(f)));
    }
    Err(AwareSqlError::ParseError(format!("bad literal: {text}")))
}

/// Strip one level of quoting, honoring backslash escapes and doubled
/// quote characters.
fn unquote(text: &str) -> Result<String, AwareSqlError> {
    let mut chars = text.chars();
    let Some(quote) = chars.next() else {
        return Err(AwareSqlError::ParseError("empty literal".into()));
    };
    let mut out = String::with_capacity(text.len());
    let mut closed = false;
    while let Some(c) = chars.next() {
        if closed {
            return Err(AwareSqlError::ParseError(format!(
                "trailing characters after literal: {text}"
            )));
        }
        if c == '\\' {
            match chars.next() {
                Some(escaped) => out.push(escaped),
                None => {
                    return Err(AwareSqlError::ParseError(format!(
                        "dangling escape in literal: {text}"
                    )));
                }
            }
        } else if c == quote {
            // A doubled quote is an escaped quote; anything else closes.
            match chars.clone().next() {
                Some(next) if next == quote => {
                    out.push(quote);
                    chars.next();
                }
                _ => closed = true,
            }
        } else {
            out.push(c);
        }
    }
    if closed {
        Ok(out)
    } else {
        Err(AwareSqlError::ParseError(format!(
            "unterminated literal: {text}"
        )))
    }
}

/// Split on `delim` at paren depth zero, outside quoted literals.
fn split_top_level(input: &str, delim: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            current.push(c);
            if c == '\\' {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            } else if c == q {
                if chars.peek() == Some(&q) {
                    if let Some(doubled) = chars.next() {
                        current.push(doubled);
                    }
                } else {
                    quote = None;
                }
            }
            continue;
        }
        match c {
            '\'' | '"' => {
                quote = Some(c);
                current.push(c);
            }
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            _ if c == delim && depth == 0 => {
                parts.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() || !parts.is_empty() {
        parts.push(current);
    }
    parts
}

fn split_idents(text: &str) -> Vec<String> {
    text.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

const CONSTRAINT_KEYWORDS: &[&str] = &["PRIMARY", "UNIQUE", "KEY", "CONSTRAINT", "FOREIGN", "INDEX"];

/// Pull column names out of a CREATE TABLE definition list, skipping
/// table-level constraint entries.
fn column_names_from_defs(defs: &str) -> Vec<String> {
    split_top_level(defs, ',')
        .iter()
        .filter_map(|def| {
            let first = def.split_whitespace().next()?;
            let upper = first.to_ascii_uppercase();
            if CONSTRAINT_KEYWORDS.contains(&upper.as_str()) {
                None
            } else {
                Some(first.to_string())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_create_with_inner_parens_and_table_options() {
        let cmd = parse(
            "CREATE TABLE inventory (id INT AUTO_INCREMENT NOT NULL PRIMARY KEY, \
             something CHAR(50)) CHARACTER SET utf8 COLLATE utf8_general_ci",
        )
        .unwrap();
        match cmd {
            Command::CreateTable { table, columns } => {
                assert_eq!(table, "inventory");
                assert_eq!(columns, vec!["id", "something"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_multi_row_insert_with_quoted_commas() {
        let cmd =
            parse("INSERT INTO t (a, b) VALUES (1, 'x,y'), (2, \"z(z)\")").unwrap();
        match cmd {
            Command::Insert { columns, rows, .. } => {
                assert_eq!(columns, vec!["a", "b"]);
                assert_eq!(rows.len(), 2);
                match &rows[0][1] {
                    Operand::Literal(DbValue::Text(s)) => assert_eq!(s, "x,y"),
                    other => panic!("unexpected operand: {other:?}"),
                }
                match &rows[1][1] {
                    Operand::Literal(DbValue::Text(s)) => assert_eq!(s, "z(z)"),
                    other => panic!("unexpected operand: {other:?}"),
                }
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_select_with_where_param_and_limit() {
        let cmd = parse("SELECT * FROM t WHERE name LIKE :search LIMIT 3").unwrap();
        match cmd {
            Command::Select {
                table,
                filter: Some(filter),
                limit,
            } => {
                assert_eq!(table, "t");
                assert_eq!(filter.column, "name");
                assert_eq!(filter.op, CompareOp::Like);
                match filter.operand {
                    Operand::Param(name) => assert_eq!(name, ":search"),
                    other => panic!("unexpected operand: {other:?}"),
                }
                assert_eq!(limit, Some(3));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn probe_parses_as_found_rows() {
        assert!(matches!(
            parse("select found_rows()").unwrap(),
            Command::FoundRows
        ));
        // Aliased probe text is a plain (unsupported) select, not the probe.
        assert!(parse("SELECT FOUND_ROWS() AS n").is_err());
    }

    #[test]
    fn escaped_quotes_round_trip() {
        match parse(r"INSERT INTO t (a) VALUES ('it\'s')").unwrap() {
            Command::Insert { rows, .. } => match &rows[0][0] {
                Operand::Literal(DbValue::Text(s)) => assert_eq!(s, "it's"),
                other => panic!("unexpected operand: {other:?}"),
            },
            other => panic!("unexpected command: {other:?}"),
        }
        match parse("INSERT INTO t (a) VALUES ('it''s')").unwrap() {
            Command::Insert { rows, .. } => match &rows[0][0] {
                Operand::Literal(DbValue::Text(s)) => assert_eq!(s, "it's"),
                other => panic!("unexpected operand: {other:?}"),
            },
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_unsupported_statements() {
        assert!(parse("TRUNCATE TABLE t").is_err());
        assert!(parse("SELECT a, b FROM t").is_err());
    }
}
