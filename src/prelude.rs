//! Convenient imports for common functionality.

pub use crate::driver::{
    ConnectOptions, CursorKind, DriverConnection, DriverStatement, FetchMode, PrepareOptions,
    QueryOptions,
};
pub use crate::{
    AwareSqlError, Connection, DbValue, ErrorMode, FOUND_ROWS_PROBE, ParamType, ResultSet, Row,
    Statement, ValueRef,
};

#[cfg(feature = "memory")]
pub use crate::memory::MemoryConnection;
