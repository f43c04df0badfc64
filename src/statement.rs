use std::rc::Weak;
use std::sync::Arc;

use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::connection::ConnectionCore;
use crate::driver::{DriverConnection, DriverStatement};
use crate::error::AwareSqlError;
use crate::query_utils::{is_select, normalize_param_name, substitute_param};
use crate::results::{ResultSet, Row};
use crate::types::{DbValue, ParamType, ValueRef};

/// What a parameter is bound to: a snapshot or a live cell.
enum Binding {
    Value(DbValue),
    Var(ValueRef),
}

impl Binding {
    fn current(&self) -> DbValue {
        match self {
            Binding::Value(v) => v.clone(),
            Binding::Var(cell) => cell.borrow().clone(),
        }
    }
}

/// Decorator over a driver statement handle.
///
/// Records every binding so the statement can be reconstructed in
/// parameter-substituted form, and keeps a normalized row count: the
/// pre-LIMIT match count for SELECT statements (via the owning connection's
/// `SELECT FOUND_ROWS()` probe), the driver-native affected count otherwise.
///
/// The back-reference to the owning connection is non-owning; the connection
/// must outlive the statement for probing and quoting to work. A detached
/// statement degrades to driver-native counts, and
/// [`substituted_query`](Statement::substituted_query) reports
/// [`AwareSqlError::DetachedStatement`].
pub struct Statement<D: DriverConnection> {
    raw: D::Statement,
    query_text: String,
    bindings: Vec<(String, Binding)>,
    row_count: Option<u64>,
    conn: Option<Weak<ConnectionCore<D>>>,
    columns: Option<Arc<Vec<String>>>,
}

impl<D: DriverConnection> Statement<D> {
    pub(crate) fn from_raw(raw: D::Statement) -> Self {
        Self {
            raw,
            query_text: String::new(),
            bindings: Vec::new(),
            row_count: None,
            conn: None,
            columns: None,
        }
    }

    pub(crate) fn stamp(&mut self, sql: &str, conn: Weak<ConnectionCore<D>>) {
        self.query_text = sql.to_string();
        self.conn = Some(conn);
    }

    pub(crate) fn set_row_count(&mut self, count: u64) {
        self.row_count = Some(count);
    }

    pub(crate) fn native_row_count(&self) -> u64 {
        self.raw.row_count()
    }

    /// The statement text as originally submitted.
    #[must_use]
    pub fn query_text(&self) -> &str {
        &self.query_text
    }

    /// Record a value for `name` (with or without its leading colon) and
    /// bind it through the driver. Rebinding a name overwrites the earlier
    /// entry.
    ///
    /// # Errors
    /// Propagates the driver's bind failure.
    pub fn bind_value(
        &mut self,
        name: &str,
        value: DbValue,
        hint: Option<ParamType>,
    ) -> Result<(), AwareSqlError> {
        let key = normalize_param_name(name);
        self.record(key.clone(), Binding::Value(value.clone()));
        self.raw.bind_value(&key, value, hint)
    }

    /// Record a live cell for `name` and bind it through the driver. The
    /// cell is re-read at every execute, so mutating it between executes
    /// changes both the executed parameters and the reconstructed query.
    ///
    /// # Errors
    /// Propagates the driver's bind failure.
    pub fn bind_param(
        &mut self,
        name: &str,
        var: ValueRef,
        hint: Option<ParamType>,
        max_len: Option<usize>,
    ) -> Result<(), AwareSqlError> {
        let key = normalize_param_name(name);
        self.record(key.clone(), Binding::Var(ValueRef::clone(&var)));
        self.raw.bind_ref(&key, var, hint, max_len)
    }

    /// Execute the statement, optionally merging inline `(name, value)`
    /// pairs into the recorded bindings first, then refresh the row count.
    ///
    /// # Errors
    /// Propagates bind/execute failures from the driver, and probe failures
    /// when the SELECT row count is recomputed.
    pub fn execute(&mut self, input: Option<&[(&str, DbValue)]>) -> Result<(), AwareSqlError> {
        if let Some(entries) = input {
            for (name, value) in entries {
                let key = normalize_param_name(name);
                self.record(key.clone(), Binding::Value(value.clone()));
                self.raw.bind_value(&key, value.clone(), None)?;
            }
        }
        self.raw.execute()?;
        self.columns = None;
        self.refresh_row_count()
    }

    /// The normalized row count: for SELECT statements the server's
    /// last-found-row count, for everything else the driver-native affected
    /// count. Zero if the statement never executed.
    #[must_use]
    pub fn row_count(&self) -> u64 {
        self.row_count.unwrap_or(0)
    }

    /// Reconstruct the statement text with every recorded parameter replaced
    /// by the connection's quoted rendering of its current value.
    ///
    /// # Errors
    /// Returns [`AwareSqlError::DetachedStatement`] when no live owning
    /// connection is available for quoting.
    pub fn substituted_query(&self) -> Result<String, AwareSqlError> {
        let core = self
            .conn
            .as_ref()
            .and_then(Weak::upgrade)
            .ok_or(AwareSqlError::DetachedStatement)?;
        let mut rendered = self.query_text.clone();
        for (name, binding) in &self.bindings {
            let quoted = core.quote(&binding.current());
            rendered = substitute_param(&rendered, name, &quoted);
        }
        Ok(rendered)
    }

    /// Snapshot of the recorded parameters in binding order, with live cells
    /// resolved to their current contents. Keys carry exactly one leading
    /// colon.
    #[must_use]
    pub fn params(&self) -> Vec<(String, DbValue)> {
        self.bindings
            .iter()
            .map(|(name, binding)| (name.clone(), binding.current()))
            .collect()
    }

    /// The parameter snapshot as a JSON object, for log output.
    #[must_use]
    pub fn params_json(&self) -> JsonValue {
        let mut map = JsonMap::new();
        for (name, binding) in &self.bindings {
            map.insert(name.clone(), binding.current().to_json());
        }
        JsonValue::Object(map)
    }

    /// Fetch the next row, or `None` when the result set is exhausted.
    ///
    /// # Errors
    /// Propagates the driver's fetch failure.
    pub fn fetch_row(&mut self) -> Result<Option<Row>, AwareSqlError> {
        match self.raw.fetch_row()? {
            Some(values) => {
                let columns = self.columns_arc();
                Ok(Some(Row::new(columns, values)))
            }
            None => Ok(None),
        }
    }

    /// Drain the remaining rows into a [`ResultSet`].
    ///
    /// # Errors
    /// Propagates the driver's fetch failure.
    pub fn fetch_all(&mut self) -> Result<ResultSet, AwareSqlError> {
        let mut set = ResultSet::default();
        while let Some(row) = self.fetch_row()? {
            set.add_row(row);
        }
        Ok(set)
    }

    /// Fetch the first column of the next row, discarding the rest.
    ///
    /// # Errors
    /// Propagates the driver's fetch failure.
    pub fn fetch_scalar(&mut self) -> Result<Option<DbValue>, AwareSqlError> {
        Ok(self
            .raw
            .fetch_row()?
            .and_then(|values| values.into_iter().next()))
    }

    fn record(&mut self, key: String, binding: Binding) {
        if let Some(slot) = self.bindings.iter_mut().find(|(name, _)| *name == key) {
            slot.1 = binding;
        } else {
            self.bindings.push((key, binding));
        }
    }

    fn refresh_row_count(&mut self) -> Result<(), AwareSqlError> {
        let live = self.conn.as_ref().and_then(Weak::upgrade);
        if let Some(core) = live
            && is_select(&self.query_text)
        {
            self.row_count = Some(core.found_rows()?);
        } else {
            self.row_count = Some(self.raw.row_count());
        }
        Ok(())
    }

    fn columns_arc(&mut self) -> Arc<Vec<String>> {
        if let Some(columns) = &self.columns {
            Arc::clone(columns)
        } else {
            let columns = Arc::new(self.raw.column_names().to_vec());
            self.columns = Some(Arc::clone(&columns));
            columns
        }
    }
}
