use std::{
    cell::{Cell, RefCell},
    collections::HashSet,
    fmt,
    rc::Rc,
};

use crate::{
    driver::{Driver, SessionHandle, StmtHandle},
    statement::{Statement, StatementKind},
    ConnectParams, ErrorContext, Result, SqlCallError, StatementOptions,
};

/// Engine environment shared by every connection created from it.
///
/// Built once by the application and handed to each [`Connection`]; there
/// is no process-wide instance.
#[derive(Clone)]
pub struct Environment {
    driver: Rc<dyn Driver>,
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment").finish_non_exhaustive()
    }
}

impl Environment {
    /// Wraps a driver that the caller may keep a handle to.
    pub fn new(driver: Rc<dyn Driver>) -> Self {
        Self { driver }
    }

    /// Takes ownership of a driver.
    pub fn from_driver<D: Driver + 'static>(driver: D) -> Self {
        Self::new(Rc::new(driver))
    }

    pub fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }

    /// Creates an unopened connection.
    pub fn connect(&self, params: ConnectParams) -> Connection {
        Connection::new(self, params)
    }
}

/// One logged-on session.
///
/// Statements borrow the connection, so it cannot be closed or dropped while
/// any of them is alive. Opening happens lazily on first use.
pub struct Connection {
    env: Environment,
    params: ConnectParams,
    options: StatementOptions,
    session: Cell<Option<SessionHandle>>,
    /// Nested cursor handles fetched by some statement and not yet opened.
    cursors: RefCell<HashSet<StmtHandle>>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("params", &self.params)
            .field("options", &self.options)
            .field("session", &self.session.get())
            .field("unopened_cursors", &self.cursors.borrow().len())
            .finish()
    }
}

impl Connection {
    pub fn new(env: &Environment, params: ConnectParams) -> Self {
        Self {
            env: env.clone(),
            params,
            options: StatementOptions::default(),
            session: Cell::new(None),
            cursors: RefCell::new(HashSet::new()),
        }
    }

    /// Replaces the defaults inherited by statements created afterwards.
    pub fn with_options(mut self, options: StatementOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &StatementOptions {
        &self.options
    }

    pub fn params(&self) -> &ConnectParams {
        &self.params
    }

    pub fn is_connected(&self) -> bool {
        self.session.get().is_some()
    }

    /// Allocates a session, attaches to the database and logs on.
    ///
    /// A no-op when already connected. A failing step releases whatever the
    /// earlier steps acquired before the error is returned.
    pub fn open(&self) -> Result<()> {
        const OP: &str = "Connection::open";
        if self.is_connected() {
            return Ok(());
        }
        let driver = self.driver();
        let session = driver
            .alloc_session()
            .map_err(|diag| SqlCallError::driver(OP, diag).with_context(self.context()))?;

        if let Err(diag) = driver.attach_server(session, &self.params.database) {
            driver.free_session(session);
            return Err(SqlCallError::driver(OP, diag).with_context(self.context()));
        }

        if let Err(diag) = driver.log_on(session, &self.params.username, &self.params.password) {
            if let Err(_detach) = driver.detach_server(session) {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %_detach, "detach after failed logon also failed");
            }
            driver.free_session(session);
            return Err(SqlCallError::driver(OP, diag).with_context(self.context()));
        }

        self.session.set(Some(session));

        #[cfg(feature = "tracing")]
        tracing::debug!(
            username = %self.params.username,
            database = %self.params.database,
            "connection opened"
        );

        Ok(())
    }

    pub fn commit(&self) -> Result<()> {
        const OP: &str = "Connection::commit";
        let session = self.session(OP)?;
        self.driver()
            .commit(session)
            .map_err(|diag| SqlCallError::driver(OP, diag).with_context(self.context()))
    }

    pub fn rollback(&self) -> Result<()> {
        const OP: &str = "Connection::rollback";
        let session = self.session(OP)?;
        self.driver()
            .rollback(session)
            .map_err(|diag| SqlCallError::driver(OP, diag).with_context(self.context()))
    }

    /// Logs off, detaches and frees the session. Idempotent.
    ///
    /// Every step runs even if an earlier one fails; the first failure is
    /// returned once the session is gone.
    pub fn close(&mut self) -> Result<()> {
        const OP: &str = "Connection::close";
        let Some(session) = self.session.take() else {
            return Ok(());
        };
        let driver = self.driver();
        let log_off = driver.log_off(session);
        let detach = driver.detach_server(session);
        driver.free_session(session);

        #[cfg(feature = "tracing")]
        tracing::debug!(username = %self.params.username, "connection closed");

        log_off
            .and(detach)
            .map_err(|diag| SqlCallError::driver(OP, diag).with_context(self.context()))
    }

    /// Prepares `sql`, detecting from the engine whether it produces rows.
    pub fn prepare(&self, sql: &str) -> Result<Statement<'_>> {
        Statement::with_sql(self, sql)
    }

    /// Prepares a row-producing statement.
    ///
    /// Anything else leaves the statement [`Invalid`](crate::StatementState::Invalid)
    /// and returns a type error.
    pub fn query(&self, sql: &str) -> Result<Statement<'_>> {
        let mut stmt = Statement::with_sql(self, sql)?;
        stmt.require_kind(StatementKind::RowProducing, "Connection::query")?;
        Ok(stmt)
    }

    /// Prepares a statement that does not produce rows.
    pub fn mutation(&self, sql: &str) -> Result<Statement<'_>> {
        let mut stmt = Statement::with_sql(self, sql)?;
        stmt.require_kind(StatementKind::Mutation, "Connection::mutation")?;
        Ok(stmt)
    }

    pub(crate) fn driver(&self) -> &dyn Driver {
        self.env.driver()
    }

    pub(crate) fn session(&self, op: &'static str) -> Result<SessionHandle> {
        self.session
            .get()
            .ok_or_else(|| SqlCallError::state(op, "not connected").with_context(self.context()))
    }

    /// Records a cursor handle written into a fetched row. It stays
    /// unclaimed until [`Statement::from_cursor`] takes it.
    pub(crate) fn adopt_cursor(&self, handle: StmtHandle) {
        self.cursors.borrow_mut().insert(handle);
    }

    /// Hands an unclaimed cursor handle to its new owner. False when the
    /// handle was already claimed or released.
    pub(crate) fn claim_cursor(&self, handle: StmtHandle) -> bool {
        self.cursors.borrow_mut().remove(&handle)
    }

    /// Frees a cursor handle unless a statement has claimed it.
    pub(crate) fn release_cursor(&self, handle: StmtHandle) {
        if self.claim_cursor(handle) {
            self.driver().free_statement(handle);
        }
    }

    fn context(&self) -> ErrorContext {
        ErrorContext::new()
            .with("username", &self.params.username)
            .with("database", &self.params.database)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if !self.is_connected() {
            return;
        }
        if let Err(_err) = self.rollback() {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %_err, "rollback on drop failed");
        }
        if let Err(_err) = self.close() {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %_err, "close on drop failed");
        }
    }
}
