//! `sqlcall` drives SQL statements through a database engine's native call
//! interface.
//!
//! The crate covers the client side of the exchange:
//! - [`Statement`] lifecycle: prepare, bind, execute, define, fetch, close
//! - [`NullableValue`] marshalling to and from native wire buffers
//! - [`ResultSchema`] discovery and [`RowBinding`] construction
//! - deferred binds composed with the statement text ([`Statement::bind_q`])
//!
//! The engine itself sits behind the [`Driver`] trait. [`MemoryDriver`] is a
//! scripted in-process implementation.

mod bind_queue;
mod connection;
mod error;
mod options;
mod row;
mod schema;
mod statement;
mod value;

pub mod driver;
pub mod wire;

pub use bind_queue::{BindQueue, QueuedBind};
pub use connection::{Connection, Environment};
pub use driver::{memory::MemoryDriver, Diagnostic, Driver};
pub use error::{ErrorContext, ErrorKind, SqlCallError};
pub use options::{ConnectParams, StatementOptions};
pub use row::RowBinding;
pub use schema::{ColumnSchema, ResultSchema};
pub use statement::{BindTarget, ExecResult, InputBind, Statement, StatementKind, StatementState};
pub use value::{sql_quote, Cursor, Date, NullableValue, Number, Varchar, DEFAULT_DATE_FORMAT};

pub type Result<T> = std::result::Result<T, SqlCallError>;
