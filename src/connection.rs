use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::driver::{ConnectOptions, DriverConnection, DriverStatement, PrepareOptions, QueryOptions};
use crate::error::AwareSqlError;
use crate::query_utils::{FOUND_ROWS_PROBE, is_found_rows_probe, is_select};
use crate::statement::Statement;
use crate::types::{DbValue, ErrorMode};

/// Shared connection state, held strongly by [`Connection`] and weakly by
/// every [`Statement`] it creates.
pub(crate) struct ConnectionCore<D: DriverConnection> {
    driver: RefCell<D>,
}

impl<D: DriverConnection> ConnectionCore<D> {
    /// Run the `SELECT FOUND_ROWS()` probe and read back its scalar.
    ///
    /// Uses the raw driver directly: the probe handle is never stamped or
    /// probed itself, so re-entry is impossible.
    pub(crate) fn found_rows(&self) -> Result<u64, AwareSqlError> {
        let mut raw = self
            .driver
            .borrow_mut()
            .query(FOUND_ROWS_PROBE, &QueryOptions::default())?;
        raw.fetch_row()?
            .and_then(|values| values.into_iter().next())
            .and_then(|value| value.as_int())
            .and_then(|count| u64::try_from(count).ok())
            .ok_or_else(|| {
                AwareSqlError::ExecutionError("row-count probe returned no scalar".into())
            })
    }

    pub(crate) fn quote(&self, value: &DbValue) -> String {
        self.driver.borrow().quote(value)
    }
}

/// Decorator over a driver connection.
///
/// Every statement handle it returns is wrapped in [`Statement`], stamped
/// with its originating text and a non-owning back-reference so the
/// statement can probe row counts and quote values later. Immediate SELECTs
/// issued through [`query`](Connection::query) cost a second round trip for
/// the `SELECT FOUND_ROWS()` probe; that is the documented price of accurate
/// counts on engines whose drivers do not report them.
pub struct Connection<D: DriverConnection> {
    core: Rc<ConnectionCore<D>>,
}

// Hand-written so no `D: Debug` bound is required.
impl<D: DriverConnection> fmt::Debug for Connection<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("error_mode", &self.error_mode())
            .finish_non_exhaustive()
    }
}

impl<D: DriverConnection> Connection<D> {
    /// Establish a connection, defaulting an unspecified error-reporting
    /// mode to [`ErrorMode::Exception`] before the driver sees the options.
    ///
    /// # Errors
    /// Propagates the driver's connect failure untranslated.
    pub fn connect(
        dsn: &str,
        user: &str,
        password: &str,
        options: ConnectOptions,
    ) -> Result<Self, AwareSqlError> {
        let resolved = ConnectOptions {
            error_mode: Some(options.resolved_error_mode()),
            ..options
        };
        let driver = D::connect(dsn, user, password, &resolved)?;
        Ok(Self {
            core: Rc::new(ConnectionCore {
                driver: RefCell::new(driver),
            }),
        })
    }

    /// Shorthand for [`connect`](Connection::connect) with default options,
    /// which means raise-on-error reporting.
    ///
    /// # Errors
    /// Propagates the driver's connect failure untranslated.
    pub fn connect_default(dsn: &str, user: &str, password: &str) -> Result<Self, AwareSqlError> {
        Self::connect(dsn, user, password, ConnectOptions::default())
    }

    /// The error-reporting mode the driver is operating under.
    #[must_use]
    pub fn error_mode(&self) -> ErrorMode {
        self.core.driver.borrow().error_mode()
    }

    /// Execute an immediate statement with default driver options.
    ///
    /// # Errors
    /// Propagates driver failures, and probe failures for SELECT text.
    pub fn query(&self, sql: &str) -> Result<Statement<D>, AwareSqlError> {
        self.query_with_options(sql, &QueryOptions::default())
    }

    /// Execute an immediate statement, forwarding `options` to the driver
    /// unchanged.
    ///
    /// Unless the text is the row-count probe itself, the returned handle is
    /// stamped with the statement text and a back-reference, and its row
    /// count is set: the probe scalar for SELECT text, the driver-native
    /// affected count otherwise. The probe guard is what keeps the probe
    /// from recursing into itself.
    ///
    /// # Errors
    /// Propagates driver failures, and probe failures for SELECT text.
    pub fn query_with_options(
        &self,
        sql: &str,
        options: &QueryOptions,
    ) -> Result<Statement<D>, AwareSqlError> {
        let raw = self.core.driver.borrow_mut().query(sql, options)?;
        let mut stmt = Statement::from_raw(raw);
        if !is_found_rows_probe(sql) {
            stmt.stamp(sql, Rc::downgrade(&self.core));
            if is_select(sql) {
                let count = self.core.found_rows()?;
                stmt.set_row_count(count);
            } else {
                let count = stmt.native_row_count();
                stmt.set_row_count(count);
            }
        }
        Ok(stmt)
    }

    /// Prepare a statement with default driver options.
    ///
    /// # Errors
    /// Propagates the driver's prepare failure.
    pub fn prepare(&self, sql: &str) -> Result<Statement<D>, AwareSqlError> {
        self.prepare_with_options(sql, &PrepareOptions::default())
    }

    /// Prepare a statement, forwarding `options` unchanged. The handle is
    /// stamped with its text and back-reference; no row count is known until
    /// it executes.
    ///
    /// # Errors
    /// Propagates the driver's prepare failure.
    pub fn prepare_with_options(
        &self,
        sql: &str,
        options: &PrepareOptions,
    ) -> Result<Statement<D>, AwareSqlError> {
        let raw = self.core.driver.borrow_mut().prepare(sql, options)?;
        let mut stmt = Statement::from_raw(raw);
        stmt.stamp(sql, Rc::downgrade(&self.core));
        Ok(stmt)
    }

    /// Quote a value through the driver, as used by query reconstruction.
    #[must_use]
    pub fn quote(&self, value: &DbValue) -> String {
        self.core.quote(value)
    }
}
