//! Debugging decorators for SQL client connections and statements.
//!
//! Two wrappers sit in front of any driver implementing the
//! [`driver`] contract:
//!
//! - [`Connection`] defaults error reporting to raise-on-error, hands out
//!   decorated statement handles, and stamps each one with its originating
//!   text and a back-reference for later probing and quoting.
//! - [`Statement`] records every bound parameter so the statement can be
//!   reconstructed with values substituted in, and normalizes
//!   [`row_count`](Statement::row_count): SELECT statements report the
//!   server's pre-LIMIT match count (via a `SELECT FOUND_ROWS()` companion
//!   query), everything else the driver-native affected count.
//!
//! The price of accurate SELECT counts is one extra round trip per SELECT.
//! The layer is synchronous and single-threaded; thread safety is whatever
//! the wrapped driver offers.
//!
//! ```rust
//! use sql_aware::prelude::*;
//! use sql_aware::memory::MemoryConnection;
//!
//! # fn main() -> Result<(), AwareSqlError> {
//! let conn = Connection::<MemoryConnection>::connect_default("memory:demo", "", "")?;
//! conn.query("CREATE TABLE fruit (id INT, name CHAR(50))")?;
//! conn.query("INSERT INTO fruit (id, name) VALUES (1, 'apple'), (2, 'banana'), (3, 'cherry')")?;
//!
//! let mut stmt = conn.prepare("SELECT * FROM fruit WHERE name LIKE :search LIMIT 1")?;
//! stmt.execute(Some(&[(":search", DbValue::Text("%a%".into()))]))?;
//!
//! // One row fetched, but the pre-LIMIT match count is reported.
//! assert_eq!(stmt.row_count(), 2);
//! assert_eq!(
//!     stmt.substituted_query()?,
//!     "SELECT * FROM fruit WHERE name LIKE '%a%' LIMIT 1"
//! );
//! # Ok(())
//! # }
//! ```

pub mod driver;
mod connection;
mod error;
#[cfg(feature = "memory")]
pub mod memory;
pub mod prelude;
mod query_utils;
mod results;
mod statement;
mod types;

pub use connection::Connection;
pub use error::AwareSqlError;
pub use query_utils::FOUND_ROWS_PROBE;
pub use results::{ResultSet, Row};
pub use statement::Statement;
pub use types::{DbValue, ErrorMode, ParamType, ValueRef};
