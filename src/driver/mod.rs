//! Boundary with the engine's native call interface.
//!
//! A [`Driver`] is the wire layer underneath this crate: it owns the actual
//! transport, allocates native handles and moves bytes between
//! [`WireBuffer`]s and the engine. Every call blocks until the engine answers.

pub mod memory;

use std::fmt;

use crate::wire::{TypeCode, WireBuffer};

/// Opaque native session handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SessionHandle(pub u64);

/// Opaque native statement handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StmtHandle(pub u64);

/// Native diagnostic: engine-specific numeric code plus message text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub code: i32,
    pub message: String,
}

impl Diagnostic {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

pub type DriverResult<T> = std::result::Result<T, Diagnostic>;

/// Statement type reported by the engine right after prepare.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NativeStatementType {
    Select,
    Other,
}

/// Outcome of an execute call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecStatus {
    /// Executed; carries the number of rows processed.
    Success { rows_affected: u64 },
    /// Executed, but a prefetch found no data.
    NoData,
}

/// Outcome of a single-row fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchStatus {
    Row,
    NoData,
}

/// Native call interface consumed by [`Connection`](crate::Connection) and
/// [`Statement`](crate::Statement).
///
/// Methods take `&self`; handles are opaque and any bookkeeping behind them
/// is the driver's own business. Implementations are not required to be
/// thread safe.
pub trait Driver {
    fn alloc_session(&self) -> DriverResult<SessionHandle>;
    fn attach_server(&self, session: SessionHandle, database: &str) -> DriverResult<()>;
    fn log_on(&self, session: SessionHandle, username: &str, password: &str)
        -> DriverResult<()>;
    fn log_off(&self, session: SessionHandle) -> DriverResult<()>;
    fn detach_server(&self, session: SessionHandle) -> DriverResult<()>;
    fn free_session(&self, session: SessionHandle);

    fn commit(&self, session: SessionHandle) -> DriverResult<()>;
    fn rollback(&self, session: SessionHandle) -> DriverResult<()>;

    fn alloc_statement(&self, session: SessionHandle) -> DriverResult<StmtHandle>;
    /// Releases a statement handle. Never fails from the caller's view.
    fn free_statement(&self, stmt: StmtHandle);

    /// Submits statement text for parsing.
    fn prepare(&self, stmt: StmtHandle, sql: &str) -> DriverResult<()>;
    fn statement_type(&self, stmt: StmtHandle) -> DriverResult<NativeStatementType>;

    /// Number of select-list columns; valid once the statement has executed.
    fn column_count(&self, stmt: StmtHandle) -> DriverResult<usize>;
    /// Column metadata. `ordinal` is one-based.
    fn column_type(&self, stmt: StmtHandle, ordinal: usize) -> DriverResult<TypeCode>;
    fn column_size(&self, stmt: StmtHandle, ordinal: usize) -> DriverResult<usize>;
    fn column_precision(&self, stmt: StmtHandle, ordinal: usize) -> DriverResult<i16>;
    fn column_scale(&self, stmt: StmtHandle, ordinal: usize) -> DriverResult<i8>;
    fn column_name(&self, stmt: StmtHandle, ordinal: usize) -> DriverResult<String>;

    /// Binds an input value by one-based position. The engine copies the
    /// buffer contents; the caller keeps ownership.
    fn bind_by_pos(&self, stmt: StmtHandle, position: usize, value: &WireBuffer)
        -> DriverResult<()>;
    /// Binds an input value by placeholder label (`:name`).
    fn bind_by_name(&self, stmt: StmtHandle, label: &str, value: &WireBuffer)
        -> DriverResult<()>;
    /// Declares the external type and capacity of output column `position`
    /// (one-based).
    fn define_by_pos(
        &self,
        stmt: StmtHandle,
        position: usize,
        type_code: TypeCode,
        max_size: usize,
    ) -> DriverResult<()>;

    /// Executes the statement `iterations` times. Row-producing statements
    /// pass 0.
    fn execute(
        &self,
        session: SessionHandle,
        stmt: StmtHandle,
        iterations: u32,
    ) -> DriverResult<ExecStatus>;

    /// Fetches the next row, writing column `i` into `outputs[i]`.
    ///
    /// Buffers are overwritten in place and never resized.
    fn fetch(&self, stmt: StmtHandle, outputs: &mut [&mut WireBuffer])
        -> DriverResult<FetchStatus>;
}
