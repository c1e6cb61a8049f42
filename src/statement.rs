//! Statement lifecycle.
//!
//! A [`Statement`] walks a fixed sequence of states and every operation
//! checks where it stands before touching the engine:
//!
//! ```text
//! Invalid < Closed < Initialized < Prepared < Executed < Defined < Fetched
//! ```
//!
//! Operations that need an earlier step run it implicitly (`exec` prepares
//! accumulated text, `fetch` executes and defines a row), so the state never
//! skips a step. Only [`Statement::close`] moves it backwards.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    bind_queue::BindQueue,
    connection::Connection,
    driver::{Diagnostic, ExecStatus, FetchStatus, NativeStatementType, StmtHandle},
    row::RowBinding,
    schema::ResultSchema,
    value::NullableValue,
    ErrorContext, Result, SqlCallError, StatementOptions,
};

/// Lifecycle state, ordered from least to most advanced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StatementState {
    /// Construction found the statement unusable; its handle is released.
    Invalid,
    /// Terminal; every resource is released.
    Closed,
    /// A handle exists; text may still be accumulating.
    Initialized,
    /// The engine parsed the text; the kind is known.
    Prepared,
    /// The engine ran the statement at least once.
    Executed,
    /// Output containers are attached.
    Defined,
    /// At least one row was retrieved.
    Fetched,
}

/// Whether a statement yields a result set. Known once prepared.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatementKind {
    Unknown,
    RowProducing,
    Mutation,
}

/// Outcome of [`Statement::exec`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExecResult {
    /// Rows processed by the engine. Zero for queries.
    pub affected_rows: u64,
}

/// Where an input value was attached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BindTarget {
    /// One-based placeholder position.
    Position(usize),
    /// Placeholder label such as `:q1`.
    Label(String),
}

impl BindTarget {
    /// Labels match without their leading colon and ignoring ASCII case.
    fn matches(&self, other: &BindTarget) -> bool {
        match (self, other) {
            (Self::Position(a), Self::Position(b)) => a == b,
            (Self::Label(a), Self::Label(b)) => bare_label(a).eq_ignore_ascii_case(bare_label(b)),
            _ => false,
        }
    }
}

fn bare_label(label: &str) -> &str {
    label.trim().trim_start_matches(':')
}

impl fmt::Display for BindTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Position(position) => write!(f, "{position}"),
            Self::Label(label) => f.write_str(label),
        }
    }
}

/// A value handed to the engine as input.
#[derive(Clone, Debug)]
pub struct InputBind {
    pub target: BindTarget,
    pub value: NullableValue,
}

/// One SQL statement and the resources attached to it.
///
/// Bound input values are owned by the statement; change one with
/// [`bind_value_mut`](Self::bind_value_mut) and the next `exec` sends the new
/// contents. Output values are overwritten in place by every fetch; read
/// them with [`column`](Self::column) or [`row`](Self::row).
#[derive(Debug)]
pub struct Statement<'c> {
    conn: &'c Connection,
    handle: Option<StmtHandle>,
    text: String,
    state: StatementState,
    kind: StatementKind,
    options: StatementOptions,
    queue: BindQueue,
    binds: Vec<InputBind>,
    /// A bound value changed since the engine last received it.
    rebind: bool,
    positional: usize,
    schema: Option<ResultSchema>,
    outputs: Option<RowBinding>,
    /// Cursor handles carried by the current row and not yet opened.
    cursors: Vec<StmtHandle>,
    /// Opened from a cursor column: the engine already executed it.
    preexecuted: bool,
}

impl<'c> Statement<'c> {
    /// Allocates a statement with empty text, opening the connection first
    /// if needed.
    pub fn new(conn: &'c Connection) -> Result<Self> {
        const OP: &str = "Statement::new";
        conn.open()?;
        let session = conn.session(OP)?;
        let handle = conn
            .driver()
            .alloc_statement(session)
            .map_err(|diag| SqlCallError::driver(OP, diag))?;
        Ok(Self::from_parts(conn, handle, StatementState::Initialized))
    }

    /// Allocates a statement and prepares `sql` right away.
    pub fn with_sql(conn: &'c Connection, sql: &str) -> Result<Self> {
        let mut stmt = Self::new(conn)?;
        stmt.prepare(sql)?;
        Ok(stmt)
    }

    /// Opens the nested result set carried by a fetched cursor value.
    ///
    /// The engine has already executed it: the statement starts out
    /// prepared, and its first `exec` or `fetch` only discovers the columns.
    /// The statement takes over the native handle and frees it on close.
    /// Each cursor opens once, and only while the row that carried it is
    /// still current.
    pub fn from_cursor(conn: &'c Connection, value: &NullableValue) -> Result<Self> {
        const OP: &str = "Statement::from_cursor";
        let NullableValue::Cursor(cursor) = value else {
            return Err(SqlCallError::type_mismatch(
                OP,
                format!("expected a cursor value, found type {}", value.type_code()),
            ));
        };
        let handle = cursor
            .handle()
            .ok_or_else(|| SqlCallError::value(OP, "cursor has not been populated"))?;
        if !conn.claim_cursor(handle) {
            return Err(SqlCallError::state(
                OP,
                "cursor is already open or its row has moved on",
            ));
        }
        let mut stmt = Self::from_parts(conn, handle, StatementState::Prepared);
        stmt.kind = StatementKind::RowProducing;
        stmt.preexecuted = true;
        Ok(stmt)
    }

    fn from_parts(conn: &'c Connection, handle: StmtHandle, state: StatementState) -> Self {
        Self {
            conn,
            handle: Some(handle),
            text: String::new(),
            state,
            kind: StatementKind::Unknown,
            options: conn.options().clone(),
            queue: BindQueue::new(),
            binds: Vec::new(),
            rebind: false,
            positional: 0,
            schema: None,
            outputs: None,
            cursors: Vec::new(),
            preexecuted: false,
        }
    }

    pub fn state(&self) -> StatementState {
        self.state
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    /// Prepared text, or the text accumulated so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn options(&self) -> &StatementOptions {
        &self.options
    }

    /// Inputs handed to the engine, in bind order.
    pub fn binds(&self) -> &[InputBind] {
        &self.binds
    }

    /// Bound value for `target`, to change before the next `exec`.
    ///
    /// When a placeholder was bound more than once the latest value is
    /// returned, since that is the one the engine holds.
    pub fn bind_value_mut(&mut self, target: &BindTarget) -> Result<&mut NullableValue> {
        const OP: &str = "Statement::bind_value_mut";
        self.ensure_open(OP)?;
        let index = self
            .binds
            .iter()
            .rposition(|bind| bind.target.matches(target))
            .ok_or_else(|| {
                SqlCallError::value(OP, "no value is bound to this placeholder")
                    .with_context(self.context().with("bind", target))
            })?;
        self.rebind = true;
        Ok(&mut self.binds[index].value)
    }

    /// Values queued by [`bind_q`](Self::bind_q) and not yet bound.
    pub fn pending_binds(&self) -> usize {
        self.queue.len()
    }

    /// Appends a fragment to the statement text.
    pub fn append(&mut self, fragment: &str) -> Result<&mut Self> {
        const OP: &str = "Statement::append";
        if self.state != StatementState::Initialized {
            return Err(self.state_error(OP, "cannot alter statement text in this state"));
        }
        self.text.push_str(fragment);
        Ok(self)
    }

    /// Submits `sql` to the engine for parsing and binds any queued values.
    ///
    /// The engine may reject the text; the statement then stays where it was
    /// and can be prepared again.
    pub fn prepare(&mut self, sql: &str) -> Result<()> {
        const OP: &str = "Statement::prepare";
        self.ensure_open(OP)?;
        if self.state >= StatementState::Prepared {
            return Err(self.state_error(OP, "too late to prepare statement"));
        }
        let handle = self.handle(OP)?;
        let driver = self.conn.driver();
        driver.prepare(handle, sql).map_err(|diag| {
            SqlCallError::driver(OP, diag).with_context(ErrorContext::statement(sql))
        })?;
        let kind = match driver.statement_type(handle) {
            Ok(NativeStatementType::Select) => StatementKind::RowProducing,
            Ok(NativeStatementType::Other) => StatementKind::Mutation,
            Err(diag) => {
                return Err(SqlCallError::driver(OP, diag)
                    .with_context(ErrorContext::statement(sql)));
            }
        };
        self.text = sql.to_owned();
        self.kind = kind;
        self.state = StatementState::Prepared;

        #[cfg(feature = "tracing")]
        tracing::debug!(statement = %self.text, kind = ?self.kind, "statement prepared");

        self.bind_queued()
    }

    /// Binds queued values in order. An entry leaves the queue only once the
    /// engine accepted it.
    fn bind_queued(&mut self) -> Result<()> {
        while let Some(entry) = self.queue.front().cloned() {
            self.bind_named(&entry.value, &entry.label)?;
            self.queue.pop_front();
        }
        Ok(())
    }

    /// Prepares the accumulated text.
    pub fn prepare_text(&mut self) -> Result<()> {
        const OP: &str = "Statement::prepare_text";
        if self.text.is_empty() {
            return Err(SqlCallError::state(OP, "no statement text has been specified"));
        }
        let sql = self.text.clone();
        self.prepare(&sql)
    }

    /// Binds `value` at the next positional placeholder.
    pub fn bind(&mut self, value: &NullableValue) -> Result<()> {
        const OP: &str = "Statement::bind";
        let position = self.positional + 1;
        self.prepare_for_bind(OP, ErrorContext::new().with("position", position))?;
        let handle = self.handle(OP)?;
        self.conn
            .driver()
            .bind_by_pos(handle, position, value.wire())
            .map_err(|diag| {
                self.driver_error(OP, diag)
                    .with_context(self.context().with("position", position))
            })?;
        self.positional = position;
        self.binds.push(InputBind {
            target: BindTarget::Position(position),
            value: value.clone(),
        });
        Ok(())
    }

    /// Binds `value` to the placeholder named `label` (`:name` or `name`).
    pub fn bind_named(&mut self, value: &NullableValue, label: &str) -> Result<()> {
        const OP: &str = "Statement::bind_named";
        self.prepare_for_bind(OP, ErrorContext::new().with("label", label))?;
        let handle = self.handle(OP)?;
        self.conn
            .driver()
            .bind_by_name(handle, label, value.wire())
            .map_err(|diag| {
                self.driver_error(OP, diag)
                    .with_context(self.context().with("label", label))
            })?;
        self.binds.push(InputBind {
            target: BindTarget::Label(label.to_owned()),
            value: value.clone(),
        });
        Ok(())
    }

    /// Queues `value` and appends its generated placeholder to the text.
    /// The value is bound when the statement is prepared.
    pub fn bind_q(&mut self, value: &NullableValue) -> Result<&mut Self> {
        const OP: &str = "Statement::bind_q";
        if self.state != StatementState::Initialized {
            return Err(self.state_error(OP, "cannot alter statement text in this state"));
        }
        let label = self.queue.push(value, &self.options.bind_label_prefix);
        self.text.push_str(&label);
        Ok(self)
    }

    /// Queues every value of `row`, separating the placeholders with `", "`.
    pub fn bind_q_row(&mut self, row: &RowBinding) -> Result<&mut Self> {
        const OP: &str = "Statement::bind_q_row";
        if self.state != StatementState::Initialized {
            return Err(self.state_error(OP, "cannot alter statement text in this state"));
        }
        if row.is_empty() {
            return Err(SqlCallError::value(OP, "row has no columns").with_context(self.context()));
        }
        let labels: Vec<String> = row
            .values()
            .iter()
            .map(|value| self.queue.push(value, &self.options.bind_label_prefix))
            .collect();
        self.text.push_str(&labels.join(", "));
        Ok(self)
    }

    /// Executes the statement, preparing accumulated text first if needed.
    ///
    /// Queries run with zero iterations and get their column schema on the
    /// first successful call; other statements run
    /// [`mutation_iterations`](StatementOptions::mutation_iterations) times.
    pub fn exec(&mut self) -> Result<ExecResult> {
        let iterations = self.options.mutation_iterations;
        self.execute("Statement::exec", iterations)
    }

    /// Executes a non-row-producing statement `iterations` times.
    pub fn exec_n(&mut self, iterations: u32) -> Result<ExecResult> {
        const OP: &str = "Statement::exec_n";
        self.ensure_open(OP)?;
        if self.state == StatementState::Initialized {
            self.prepare_text()?;
        }
        if self.kind == StatementKind::RowProducing {
            return Err(SqlCallError::type_mismatch(
                OP,
                "iteration count applies only to statements that do not produce rows",
            )
            .with_context(self.context()));
        }
        self.execute(OP, iterations)
    }

    fn execute(&mut self, op: &'static str, iterations: u32) -> Result<ExecResult> {
        self.ensure_open(op)?;
        if self.state == StatementState::Initialized {
            self.prepare_text()?;
        }
        if !self.queue.is_empty() {
            self.bind_queued()?;
        }
        let handle = self.handle(op)?;
        if self.rebind {
            self.send_binds(op, handle)?;
        }

        let affected_rows = if self.preexecuted {
            0
        } else {
            let session = self.conn.session(op)?;
            let iterations = match self.kind {
                StatementKind::RowProducing => 0,
                _ => iterations,
            };
            match self.conn.driver().execute(session, handle, iterations) {
                Ok(ExecStatus::Success { rows_affected }) => rows_affected,
                Ok(ExecStatus::NoData) => 0,
                Err(diag) => return Err(self.driver_error(op, diag)),
            }
        };
        if self.state < StatementState::Executed {
            self.state = StatementState::Executed;
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(statement = %self.text, affected_rows, "statement executed");

        if self.kind == StatementKind::RowProducing && self.schema.is_none() {
            let schema =
                ResultSchema::discover(self.conn.driver(), handle, &self.text, &self.options)?;
            self.schema = Some(schema);
        }
        Ok(ExecResult { affected_rows })
    }

    /// Hands every bound value to the engine again.
    fn send_binds(&mut self, op: &'static str, handle: StmtHandle) -> Result<()> {
        let driver = self.conn.driver();
        for bind in &self.binds {
            let sent = match &bind.target {
                BindTarget::Position(position) => {
                    driver.bind_by_pos(handle, *position, bind.value.wire())
                }
                BindTarget::Label(label) => driver.bind_by_name(handle, label, bind.value.wire()),
            };
            sent.map_err(|diag| {
                self.driver_error(op, diag)
                    .with_context(self.context().with("bind", &bind.target))
            })?;
        }
        self.rebind = false;
        Ok(())
    }

    /// Defines `value` as the output for the next undefined column.
    ///
    /// Columns are defined left to right; the statement keeps the value and
    /// exposes it through [`column`](Self::column).
    pub fn bind_col(&mut self, value: NullableValue) -> Result<()> {
        const OP: &str = "Statement::bind_col";
        let schema_len = self.ready_for_define(OP)?;
        let position = self.outputs.as_ref().map_or(0, RowBinding::len);
        if position >= schema_len {
            return Err(SqlCallError::type_mismatch(OP, "every column is already defined")
                .with_context(self.context().with("columns", schema_len)));
        }
        let handle = self.handle(OP)?;
        self.conn
            .driver()
            .define_by_pos(handle, position + 1, value.type_code(), value.max_wire_size())
            .map_err(|diag| {
                self.driver_error(OP, diag)
                    .with_context(self.context().with("position", position + 1))
            })?;
        let name = self.schema_column_name(position);
        self.outputs.get_or_insert_with(RowBinding::new).add(value, name);
        self.state = StatementState::Defined;
        Ok(())
    }

    /// Defines one output per column, in column order.
    pub fn bind_cols(&mut self, values: Vec<NullableValue>) -> Result<()> {
        const OP: &str = "Statement::bind_cols";
        self.ready_for_define(OP)?;
        let mut row = RowBinding::new();
        for (position, value) in values.into_iter().enumerate() {
            let name = self.schema_column_name(position);
            row.add(value, name);
        }
        self.bind_whole_row(OP, row)
    }

    /// Defines `row` as the output of every column.
    pub fn bind_row(&mut self, row: RowBinding) -> Result<()> {
        self.bind_whole_row("Statement::bind_row", row)
    }

    fn bind_whole_row(&mut self, op: &'static str, row: RowBinding) -> Result<()> {
        let schema_len = self.ready_for_define(op)?;
        if self.state == StatementState::Defined {
            return Err(self.state_error(op, "columns are already defined"));
        }
        if row.len() != schema_len {
            return Err(SqlCallError::type_mismatch(
                op,
                format!("{} outputs for {schema_len} columns", row.len()),
            )
            .with_context(self.context()));
        }
        self.define(op, row)
    }

    /// Checks the statement can take output definitions and returns the
    /// column count.
    fn ready_for_define(&mut self, op: &'static str) -> Result<usize> {
        self.ensure_open(op)?;
        if self.state == StatementState::Initialized {
            self.prepare_text()?;
        }
        self.require_rows(op)?;
        if self.state > StatementState::Defined {
            return Err(self.state_error(op, "too late to bind a column"));
        }
        if self.state < StatementState::Executed {
            self.exec()?;
        }
        Ok(self.schema.as_ref().map_or(0, ResultSchema::len))
    }

    /// Defines every value of `outputs` against the engine and stores them.
    fn define(&mut self, op: &'static str, outputs: RowBinding) -> Result<()> {
        let handle = self.handle(op)?;
        let driver = self.conn.driver();
        for (index, value) in outputs.values().iter().enumerate() {
            driver
                .define_by_pos(handle, index + 1, value.type_code(), value.max_wire_size())
                .map_err(|diag| {
                    self.driver_error(op, diag)
                        .with_context(self.context().with("position", index + 1))
                })?;
        }
        self.outputs = Some(outputs);
        self.state = StatementState::Defined;
        Ok(())
    }

    /// Retrieves the next row into the defined outputs.
    ///
    /// Executes the statement first if needed, and defines a row built from
    /// the column schema when nothing was defined. Returns `false` once the
    /// result set is exhausted.
    pub fn fetch(&mut self) -> Result<bool> {
        const OP: &str = "Statement::fetch";
        self.ensure_open(OP)?;
        if self.state == StatementState::Initialized {
            self.prepare_text()?;
        }
        self.require_rows(OP)?;
        if self.state < StatementState::Executed {
            self.exec()?;
        }
        if self.state == StatementState::Executed {
            let schema = self.schema.as_ref().ok_or_else(|| {
                SqlCallError::state(OP, "column schema was not discovered")
            })?;
            let row = RowBinding::from_schema(schema, &self.options)?;
            self.define(OP, row)?;
        }

        let handle = self.handle(OP)?;
        self.release_cursors();
        let driver = self.conn.driver();
        let status = match self.outputs.as_mut() {
            Some(outputs) => driver.fetch(handle, &mut outputs.wire_buffers_mut()),
            None => driver.fetch(handle, &mut []),
        };
        match status {
            Ok(FetchStatus::Row) => {
                self.state = StatementState::Fetched;
                self.adopt_cursors();
                #[cfg(feature = "tracing")]
                tracing::trace!(
                    row = %self.outputs.as_ref().map(ToString::to_string).unwrap_or_default(),
                    "fetched row"
                );
                Ok(true)
            }
            Ok(FetchStatus::NoData) => Ok(false),
            Err(diag) => Err(self.driver_error(OP, diag)),
        }
    }

    /// Registers the cursor handles of the current row with the connection.
    fn adopt_cursors(&mut self) {
        let Some(outputs) = &self.outputs else {
            return;
        };
        for value in outputs.values() {
            if let NullableValue::Cursor(cursor) = value {
                if let Some(handle) = cursor.handle() {
                    self.conn.adopt_cursor(handle);
                    self.cursors.push(handle);
                }
            }
        }
    }

    /// Frees the cursors of the current row that were never opened.
    fn release_cursors(&mut self) {
        for handle in self.cursors.drain(..) {
            self.conn.release_cursor(handle);
        }
    }

    /// Column metadata; `None` until a query has executed.
    pub fn schema(&self) -> Option<&ResultSchema> {
        self.schema.as_ref()
    }

    /// Defined output values.
    pub fn row(&self) -> Option<&RowBinding> {
        self.outputs.as_ref()
    }

    pub fn column_count(&self) -> Result<usize> {
        self.executed_schema("Statement::column_count")
            .map(ResultSchema::len)
    }

    pub fn column_name(&self, index: usize) -> Result<&str> {
        const OP: &str = "Statement::column_name";
        let schema = self.executed_schema(OP)?;
        schema
            .column(index)
            .map(|column| column.name.as_str())
            .ok_or_else(|| {
                SqlCallError::value(OP, "column number out of range")
                    .with_context(self.context().with("index", index))
            })
    }

    /// Output value at `index`.
    pub fn column(&self, index: usize) -> Result<&NullableValue> {
        self.defined_row("Statement::column")?.get(index)
    }

    /// Output value of the column named `name` (case-sensitive).
    pub fn column_by_name(&self, name: &str) -> Result<&NullableValue> {
        self.defined_row("Statement::column_by_name")?.by_name(name)
    }

    /// Releases the native handle and everything attached to the statement.
    ///
    /// Never fails; calling it again is a no-op.
    pub fn close(&mut self) {
        if self.state == StatementState::Closed {
            return;
        }
        self.release_cursors();
        if let Some(handle) = self.handle.take() {
            self.conn.driver().free_statement(handle);
        }
        self.queue.clear();
        self.binds.clear();
        self.rebind = false;
        self.positional = 0;
        self.schema = None;
        self.outputs = None;
        self.state = StatementState::Closed;

        #[cfg(feature = "tracing")]
        tracing::debug!(statement = %self.text, "statement closed");
    }

    /// Marks the statement unusable and frees its handle when it is not of
    /// the `expected` kind.
    pub(crate) fn require_kind(&mut self, expected: StatementKind, op: &'static str) -> Result<()> {
        if self.kind == expected {
            return Ok(());
        }
        if let Some(handle) = self.handle.take() {
            self.conn.driver().free_statement(handle);
        }
        self.state = StatementState::Invalid;
        let message = match expected {
            StatementKind::RowProducing => "statement does not produce rows",
            _ => "statement produces rows",
        };
        Err(SqlCallError::type_mismatch(op, message).with_context(self.context()))
    }

    fn require_rows(&self, op: &'static str) -> Result<()> {
        if self.kind == StatementKind::Mutation {
            return Err(SqlCallError::type_mismatch(op, "statement does not produce rows")
                .with_context(self.context()));
        }
        Ok(())
    }

    fn prepare_for_bind(&mut self, op: &'static str, target: ErrorContext) -> Result<()> {
        self.ensure_open(op)?;
        if self.state == StatementState::Initialized {
            self.prepare_text()?;
        }
        if self.state > StatementState::Prepared {
            let mut context = self.context();
            for (key, value) in target.iter() {
                context = context.with(key, value);
            }
            return Err(
                SqlCallError::state(op, "cannot bind after execution").with_context(context)
            );
        }
        Ok(())
    }

    fn ensure_open(&self, op: &'static str) -> Result<()> {
        match self.state {
            StatementState::Closed => Err(self.state_error(op, "statement is closed")),
            StatementState::Invalid => Err(self.state_error(op, "statement is invalid")),
            _ => Ok(()),
        }
    }

    fn handle(&self, op: &'static str) -> Result<StmtHandle> {
        self.handle
            .ok_or_else(|| self.state_error(op, "statement handle has been released"))
    }

    fn executed_schema(&self, op: &'static str) -> Result<&ResultSchema> {
        if self.state < StatementState::Executed {
            return Err(self.state_error(op, "statement not yet executed"));
        }
        self.schema
            .as_ref()
            .ok_or_else(|| {
                SqlCallError::type_mismatch(op, "statement has no result columns")
                    .with_context(self.context())
            })
    }

    fn defined_row(&self, op: &'static str) -> Result<&RowBinding> {
        self.outputs
            .as_ref()
            .ok_or_else(|| self.state_error(op, "columns not defined"))
    }

    fn schema_column_name(&self, position: usize) -> String {
        self.schema
            .as_ref()
            .and_then(|schema| schema.column(position))
            .map(|column| column.name.clone())
            .unwrap_or_default()
    }

    fn context(&self) -> ErrorContext {
        ErrorContext::statement(&self.text)
    }

    fn state_error(&self, op: &'static str, message: &str) -> SqlCallError {
        SqlCallError::state(op, message).with_context(self.context())
    }

    fn driver_error(&self, op: &'static str, diag: Diagnostic) -> SqlCallError {
        SqlCallError::driver(op, diag).with_context(self.context())
    }
}

impl Drop for Statement<'_> {
    fn drop(&mut self) {
        if self.state > StatementState::Closed {
            self.close();
        }
    }
}
