//! Contract the decorators expect from an underlying database client.
//!
//! The decorator layer never implements a wire protocol; it is generic over
//! these traits and forwards to whichever driver the caller picks. The
//! driver's statement type is produced by the driver itself, and
//! [`Connection`](crate::Connection) wraps every handle in the crate's
//! [`Statement`](crate::Statement) decorator.

use crate::error::AwareSqlError;
use crate::types::{DbValue, ErrorMode, ParamType, ValueRef};

/// Options applied when establishing a connection.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ConnectOptions {
    /// Error-reporting mode; `None` is resolved to [`ErrorMode::Exception`]
    /// by the connection decorator before the driver sees it.
    pub error_mode: Option<ErrorMode>,
    /// A statement the driver runs immediately after connecting.
    pub init_command: Option<String>,
}

impl ConnectOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = Some(mode);
        self
    }

    #[must_use]
    pub fn with_init_command(mut self, command: impl Into<String>) -> Self {
        self.init_command = Some(command.into());
        self
    }

    /// Error mode with the decorator's default applied.
    #[must_use]
    pub fn resolved_error_mode(&self) -> ErrorMode {
        self.error_mode.unwrap_or(ErrorMode::Exception)
    }
}

/// How fetched rows are shaped by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Rows addressable by column name (the default).
    Assoc,
    /// Rows addressable by position only.
    Indexed,
    /// A single column projected from each row.
    Column(usize),
}

/// Per-call options for immediate statements, forwarded to the driver
/// unchanged. Stands in for the variadic trailing arguments some clients
/// accept on their `query` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOptions {
    pub fetch: Option<FetchMode>,
}

impl QueryOptions {
    #[must_use]
    pub fn with_fetch(mut self, fetch: FetchMode) -> Self {
        self.fetch = Some(fetch);
        self
    }
}

/// Cursor behavior requested at prepare time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorKind {
    ForwardOnly,
    Scrollable,
}

/// Per-call options for prepared statements, forwarded unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrepareOptions {
    pub cursor: Option<CursorKind>,
}

impl PrepareOptions {
    #[must_use]
    pub fn with_cursor(mut self, cursor: CursorKind) -> Self {
        self.cursor = Some(cursor);
        self
    }
}

/// A raw client connection: connect, statement creation, and value quoting.
pub trait DriverConnection: Sized {
    /// Statement handles this driver produces.
    type Statement: DriverStatement;

    /// Establish a connection. Failures propagate as whatever error the
    /// driver reports, wrapped in [`AwareSqlError::ConnectionError`].
    ///
    /// # Errors
    /// Returns an error if the DSN is not understood or the connection
    /// cannot be established.
    fn connect(
        dsn: &str,
        user: &str,
        password: &str,
        options: &ConnectOptions,
    ) -> Result<Self, AwareSqlError>;

    /// Prepare and immediately execute a statement.
    ///
    /// # Errors
    /// Returns an error if the statement fails to parse or execute.
    fn query(
        &mut self,
        sql: &str,
        options: &QueryOptions,
    ) -> Result<Self::Statement, AwareSqlError>;

    /// Prepare a statement for later execution.
    ///
    /// # Errors
    /// Returns an error if the statement cannot be prepared.
    fn prepare(
        &mut self,
        sql: &str,
        options: &PrepareOptions,
    ) -> Result<Self::Statement, AwareSqlError>;

    /// Quote a value for safe textual inclusion in a statement.
    fn quote(&self, value: &DbValue) -> String;

    /// The error-reporting mode this connection is operating under.
    fn error_mode(&self) -> ErrorMode;
}

/// A raw statement handle: binding, execution, and row retrieval.
pub trait DriverStatement {
    /// Bind a value snapshot to a named placeholder.
    ///
    /// # Errors
    /// Returns an error if the placeholder is unknown to the driver.
    fn bind_value(
        &mut self,
        name: &str,
        value: DbValue,
        hint: Option<ParamType>,
    ) -> Result<(), AwareSqlError>;

    /// Bind a live cell to a named placeholder. The driver re-reads the
    /// cell's contents at each execute.
    ///
    /// # Errors
    /// Returns an error if the placeholder is unknown to the driver.
    fn bind_ref(
        &mut self,
        name: &str,
        var: ValueRef,
        hint: Option<ParamType>,
        max_len: Option<usize>,
    ) -> Result<(), AwareSqlError>;

    /// Execute with the bindings currently in place.
    ///
    /// # Errors
    /// Returns an error if execution fails or a placeholder is unbound.
    fn execute(&mut self) -> Result<(), AwareSqlError>;

    /// Fetch the next result row, or `None` when exhausted.
    ///
    /// # Errors
    /// Returns an error if the driver cannot advance the cursor.
    fn fetch_row(&mut self) -> Result<Option<Vec<DbValue>>, AwareSqlError>;

    /// Column names of the current result set.
    fn column_names(&self) -> &[String];

    /// The driver-native row count: affected rows for DML, whatever the
    /// engine reports for SELECT (possibly always zero).
    fn row_count(&self) -> u64;
}
