//! In-process engine with scripted statements.
//!
//! [`MemoryDriver`] implements [`Driver`] without any server. Statement text
//! is matched against registered [`Script`]s: queries return fixed rows,
//! mutations report a fixed row count and failures raise a diagnostic on
//! execute. `SELECT :a, :b FROM dual` echoes its bound values back without a
//! script. Errors use the engine's native numeric codes.

use std::{
    cell::RefCell,
    collections::{HashMap, VecDeque},
};

use chrono::NaiveDateTime;

use crate::{
    driver::{
        Diagnostic, Driver, DriverResult, ExecStatus, FetchStatus, NativeStatementType,
        SessionHandle, StmtHandle,
    },
    value::{format_decimal, parse_decimal, DEFAULT_DATE_FORMAT},
    wire::{self, TypeCode, WireBuffer, CURSOR_WIRE_SIZE, DATE_WIRE_SIZE},
};

pub const INVALID_HANDLE: i32 = -2;
pub const INCONSISTENT_DATATYPES: i32 = 932;
pub const INVALID_SQL: i32 = 900;
pub const UNKNOWN_OBJECT: i32 = 942;
pub const FETCH_OUT_OF_SEQUENCE: i32 = 1002;
pub const NOT_ALL_BOUND: i32 = 1008;
pub const INVALID_LOGON: i32 = 1017;
pub const ILLEGAL_VARIABLE: i32 = 1036;
pub const VALUE_TRUNCATED: i32 = 1406;
pub const INVALID_NUMBER: i32 = 1722;
pub const DATE_FORMAT_MISMATCH: i32 = 1861;
pub const NOT_CONNECTED: i32 = 3114;
pub const UNKNOWN_DATABASE: i32 = 12154;
pub const ZERO_ITERATIONS: i32 = 24333;
pub const NO_DESCRIPTOR: i32 = 24334;
pub const NOT_EXECUTED: i32 = 24338;
pub const EMPTY_STATEMENT: i32 = 24373;

/// Result column of a scripted query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub type_code: TypeCode,
    pub size: usize,
    pub precision: i16,
    pub scale: i8,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, type_code: TypeCode, size: usize) -> Self {
        Self {
            name: name.into(),
            type_code,
            size,
            precision: 0,
            scale: 0,
        }
    }

    pub fn varchar(name: impl Into<String>, size: usize) -> Self {
        Self::new(name, TypeCode::VARCHAR2, size)
    }

    pub fn char(name: impl Into<String>, size: usize) -> Self {
        Self::new(name, TypeCode::CHAR, size)
    }

    pub fn number(name: impl Into<String>, precision: i16, scale: i8) -> Self {
        Self {
            precision,
            scale,
            ..Self::new(name, TypeCode::NUMBER, 22)
        }
    }

    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, TypeCode::DATE, DATE_WIRE_SIZE)
    }

    pub fn cursor(name: impl Into<String>) -> Self {
        Self::new(name, TypeCode::CURSOR, CURSOR_WIRE_SIZE)
    }
}

/// One cell of a scripted row.
#[derive(Clone, Debug)]
pub enum Cell {
    Null,
    Text(String),
    /// Decimal literal, e.g. `"-12.50"`.
    Number(String),
    Date(NaiveDateTime),
    /// Value bound to the named placeholder (`:x` or `x`).
    Param(String),
    /// Nested result set opened when the row is fetched.
    Cursor(Box<Script>),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn number(value: impl Into<String>) -> Self {
        Self::Number(value.into())
    }

    pub fn param(label: impl Into<String>) -> Self {
        Self::Param(label.into())
    }

    pub fn cursor(script: Script) -> Self {
        Self::Cursor(Box::new(script))
    }
}

/// Canned engine behaviour for one statement text.
#[derive(Clone, Debug)]
pub enum Script {
    Query {
        columns: Vec<ColumnDef>,
        rows: Vec<Vec<Cell>>,
    },
    Mutation {
        /// Rows affected per iteration.
        affected: u64,
    },
    /// Parses fine, fails on execute.
    Failure(Diagnostic),
}

impl Script {
    pub fn query(columns: Vec<ColumnDef>, rows: Vec<Vec<Cell>>) -> Self {
        Self::Query { columns, rows }
    }

    pub fn mutation(affected: u64) -> Self {
        Self::Mutation { affected }
    }

    pub fn failure(code: i32, message: impl Into<String>) -> Self {
        Self::Failure(Diagnostic::new(code, message))
    }
}

/// Engine-side copy of a bound or fetched value.
#[derive(Clone, Debug, PartialEq)]
pub enum Datum {
    Null,
    Text(String),
    Number { mantissa: i128, scale: u8 },
    Date(NaiveDateTime),
    Cursor(u64),
}

/// Record of one execute call.
#[derive(Clone, Debug, PartialEq)]
pub struct Execution {
    pub sql: String,
    pub iterations: u32,
    /// Bound values in placeholder order, labelled `:name`.
    pub binds: Vec<(String, Datum)>,
}

#[derive(Clone, Debug)]
struct Bound {
    type_code: TypeCode,
    capacity: usize,
    datum: Datum,
}

#[derive(Debug, Default)]
struct SessionSlot {
    attached: bool,
    logged_on: bool,
}

#[derive(Debug)]
enum Plan {
    Script(Script),
    Echo(Vec<String>),
}

#[derive(Debug)]
struct ResultSet {
    columns: Vec<ColumnDef>,
    rows: VecDeque<Vec<Cell>>,
    binds: HashMap<String, Bound>,
}

#[derive(Debug, Default)]
struct StmtSlot {
    sql: String,
    plan: Option<Plan>,
    placeholders: Vec<String>,
    binds: HashMap<String, Bound>,
    result: Option<ResultSet>,
}

#[derive(Debug, Default)]
struct Engine {
    scripts: HashMap<String, Script>,
    credentials: Option<(String, String)>,
    databases: Option<Vec<String>>,
    next_handle: u64,
    sessions: HashMap<u64, SessionSlot>,
    statements: HashMap<u64, StmtSlot>,
    commits: usize,
    rollbacks: usize,
    calls: Vec<&'static str>,
    executions: Vec<Execution>,
}

impl Engine {
    fn allocate(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn session(&mut self, session: SessionHandle) -> DriverResult<&mut SessionSlot> {
        self.sessions
            .get_mut(&session.0)
            .ok_or_else(|| Diagnostic::new(INVALID_HANDLE, "invalid session handle"))
    }

    fn live_session(&mut self, session: SessionHandle) -> DriverResult<&mut SessionSlot> {
        let slot = self.session(session)?;
        if !slot.logged_on {
            return Err(Diagnostic::new(NOT_CONNECTED, "not connected to the database"));
        }
        Ok(slot)
    }

    fn statement(&mut self, stmt: StmtHandle) -> DriverResult<&mut StmtSlot> {
        self.statements
            .get_mut(&stmt.0)
            .ok_or_else(|| Diagnostic::new(INVALID_HANDLE, "invalid statement handle"))
    }
}

/// Scripted in-memory [`Driver`].
///
/// Not thread safe; wrap it in an `Rc` to keep inspecting it while an
/// [`Environment`](crate::Environment) uses it.
#[derive(Debug, Default)]
pub struct MemoryDriver {
    engine: RefCell<Engine>,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the behaviour of `sql` (matched after trimming).
    pub fn with_script(self, sql: &str, script: Script) -> Self {
        self.add_script(sql, script);
        self
    }

    pub fn add_script(&self, sql: &str, script: Script) {
        self.engine
            .borrow_mut()
            .scripts
            .insert(sql.trim().to_owned(), script);
    }

    /// Accepts only this username (case-insensitive) and password at logon.
    pub fn with_credentials(self, username: &str, password: &str) -> Self {
        self.engine.borrow_mut().credentials = Some((username.to_owned(), password.to_owned()));
        self
    }

    /// Restricts attachable databases. The empty name, the default
    /// database, is always accepted.
    pub fn with_databases<I, S>(self, databases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.engine.borrow_mut().databases = Some(databases.into_iter().map(Into::into).collect());
        self
    }

    pub fn open_sessions(&self) -> usize {
        self.engine.borrow().sessions.len()
    }

    pub fn attached_sessions(&self) -> usize {
        self.engine
            .borrow()
            .sessions
            .values()
            .filter(|slot| slot.attached)
            .count()
    }

    pub fn open_statements(&self) -> usize {
        self.engine.borrow().statements.len()
    }

    pub fn commits(&self) -> usize {
        self.engine.borrow().commits
    }

    pub fn rollbacks(&self) -> usize {
        self.engine.borrow().rollbacks
    }

    /// Names of the driver methods called so far, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.engine.borrow().calls.clone()
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.engine
            .borrow()
            .calls
            .iter()
            .filter(|call| **call == name)
            .count()
    }

    pub fn executions(&self) -> Vec<Execution> {
        self.engine.borrow().executions.clone()
    }

    pub fn last_execution(&self) -> Option<Execution> {
        self.engine.borrow().executions.last().cloned()
    }

    fn engine(&self, call: &'static str) -> std::cell::RefMut<'_, Engine> {
        #[cfg(feature = "tracing")]
        tracing::trace!(call, "memory driver call");
        let mut engine = self.engine.borrow_mut();
        engine.calls.push(call);
        engine
    }
}

impl Driver for MemoryDriver {
    fn alloc_session(&self) -> DriverResult<SessionHandle> {
        let mut engine = self.engine("alloc_session");
        let handle = engine.allocate();
        engine.sessions.insert(handle, SessionSlot::default());
        Ok(SessionHandle(handle))
    }

    fn attach_server(&self, session: SessionHandle, database: &str) -> DriverResult<()> {
        let mut engine = self.engine("attach_server");
        let known = match &engine.databases {
            Some(databases) => {
                database.is_empty() || databases.iter().any(|db| db.eq_ignore_ascii_case(database))
            }
            None => true,
        };
        if !known {
            return Err(Diagnostic::new(
                UNKNOWN_DATABASE,
                format!("could not resolve the connect identifier '{database}'"),
            ));
        }
        engine.session(session)?.attached = true;
        Ok(())
    }

    fn log_on(&self, session: SessionHandle, username: &str, password: &str) -> DriverResult<()> {
        let mut engine = self.engine("log_on");
        let accepted = match &engine.credentials {
            Some((user, pass)) => user.eq_ignore_ascii_case(username) && pass == password,
            None => true,
        };
        let slot = engine.session(session)?;
        if !slot.attached {
            return Err(Diagnostic::new(NOT_CONNECTED, "not attached to a server"));
        }
        if !accepted {
            return Err(Diagnostic::new(
                INVALID_LOGON,
                "invalid username/password; logon denied",
            ));
        }
        slot.logged_on = true;
        Ok(())
    }

    fn log_off(&self, session: SessionHandle) -> DriverResult<()> {
        let mut engine = self.engine("log_off");
        engine.live_session(session)?.logged_on = false;
        Ok(())
    }

    fn detach_server(&self, session: SessionHandle) -> DriverResult<()> {
        let mut engine = self.engine("detach_server");
        engine.session(session)?.attached = false;
        Ok(())
    }

    fn free_session(&self, session: SessionHandle) {
        self.engine("free_session").sessions.remove(&session.0);
    }

    fn commit(&self, session: SessionHandle) -> DriverResult<()> {
        let mut engine = self.engine("commit");
        engine.live_session(session)?;
        engine.commits += 1;
        Ok(())
    }

    fn rollback(&self, session: SessionHandle) -> DriverResult<()> {
        let mut engine = self.engine("rollback");
        engine.live_session(session)?;
        engine.rollbacks += 1;
        Ok(())
    }

    fn alloc_statement(&self, session: SessionHandle) -> DriverResult<StmtHandle> {
        let mut engine = self.engine("alloc_statement");
        engine.live_session(session)?;
        let handle = engine.allocate();
        engine.statements.insert(handle, StmtSlot::default());
        Ok(StmtHandle(handle))
    }

    fn free_statement(&self, stmt: StmtHandle) {
        self.engine("free_statement").statements.remove(&stmt.0);
    }

    fn prepare(&self, stmt: StmtHandle, sql: &str) -> DriverResult<()> {
        let mut engine = self.engine("prepare");
        let plan = plan_for(&engine.scripts, sql)?;
        let slot = engine.statement(stmt)?;
        *slot = StmtSlot {
            sql: sql.to_owned(),
            plan: Some(plan),
            placeholders: placeholders(sql),
            ..StmtSlot::default()
        };
        Ok(())
    }

    fn statement_type(&self, stmt: StmtHandle) -> DriverResult<NativeStatementType> {
        let mut engine = self.engine("statement_type");
        let slot = engine.statement(stmt)?;
        match &slot.plan {
            Some(Plan::Script(Script::Query { .. }) | Plan::Echo(_)) => {
                Ok(NativeStatementType::Select)
            }
            Some(_) => Ok(NativeStatementType::Other),
            None if slot.result.is_some() => Ok(NativeStatementType::Select),
            None => Err(Diagnostic::new(NOT_EXECUTED, "statement has not been prepared")),
        }
    }

    fn column_count(&self, stmt: StmtHandle) -> DriverResult<usize> {
        let mut engine = self.engine("column_count");
        Ok(result_set(engine.statement(stmt)?)?.columns.len())
    }

    fn column_type(&self, stmt: StmtHandle, ordinal: usize) -> DriverResult<TypeCode> {
        let mut engine = self.engine("column_type");
        Ok(column_def(engine.statement(stmt)?, ordinal)?.type_code)
    }

    fn column_size(&self, stmt: StmtHandle, ordinal: usize) -> DriverResult<usize> {
        let mut engine = self.engine("column_size");
        Ok(column_def(engine.statement(stmt)?, ordinal)?.size)
    }

    fn column_precision(&self, stmt: StmtHandle, ordinal: usize) -> DriverResult<i16> {
        let mut engine = self.engine("column_precision");
        Ok(column_def(engine.statement(stmt)?, ordinal)?.precision)
    }

    fn column_scale(&self, stmt: StmtHandle, ordinal: usize) -> DriverResult<i8> {
        let mut engine = self.engine("column_scale");
        Ok(column_def(engine.statement(stmt)?, ordinal)?.scale)
    }

    fn column_name(&self, stmt: StmtHandle, ordinal: usize) -> DriverResult<String> {
        let mut engine = self.engine("column_name");
        Ok(column_def(engine.statement(stmt)?, ordinal)?.name.clone())
    }

    fn bind_by_pos(&self, stmt: StmtHandle, position: usize, value: &WireBuffer) -> DriverResult<()> {
        let mut engine = self.engine("bind_by_pos");
        let slot = engine.statement(stmt)?;
        let name = position
            .checked_sub(1)
            .and_then(|index| slot.placeholders.get(index))
            .cloned()
            .ok_or_else(|| illegal_variable(&position.to_string()))?;
        slot.binds.insert(name, read_bound(value)?);
        Ok(())
    }

    fn bind_by_name(&self, stmt: StmtHandle, label: &str, value: &WireBuffer) -> DriverResult<()> {
        let mut engine = self.engine("bind_by_name");
        let slot = engine.statement(stmt)?;
        let name = normalize_label(label);
        if !slot.placeholders.contains(&name) {
            return Err(illegal_variable(label));
        }
        slot.binds.insert(name, read_bound(value)?);
        Ok(())
    }

    fn define_by_pos(
        &self,
        stmt: StmtHandle,
        position: usize,
        type_code: TypeCode,
        _max_size: usize,
    ) -> DriverResult<()> {
        let mut engine = self.engine("define_by_pos");
        let column = column_def(engine.statement(stmt)?, position)?;
        if !convertible(column.type_code, type_code) {
            return Err(Diagnostic::new(
                INCONSISTENT_DATATYPES,
                format!(
                    "inconsistent datatypes: cannot define {} column {} as {type_code}",
                    column.type_code, column.name
                ),
            ));
        }
        Ok(())
    }

    fn execute(
        &self,
        session: SessionHandle,
        stmt: StmtHandle,
        iterations: u32,
    ) -> DriverResult<ExecStatus> {
        let mut engine = self.engine("execute");
        engine.live_session(session)?;
        let slot = engine.statement(stmt)?;
        let plan = slot
            .plan
            .as_ref()
            .ok_or_else(|| Diagnostic::new(NOT_EXECUTED, "statement has not been prepared"))?;

        let mut binds = Vec::with_capacity(slot.placeholders.len());
        for name in &slot.placeholders {
            let bound = slot.binds.get(name).ok_or_else(|| {
                Diagnostic::new(NOT_ALL_BOUND, format!("not all variables bound: :{name}"))
            })?;
            binds.push((format!(":{name}"), bound.datum.clone()));
        }

        let (status, result) = match plan {
            Plan::Script(Script::Failure(diag)) => return Err(diag.clone()),
            Plan::Script(Script::Mutation { affected }) => {
                if iterations == 0 {
                    return Err(Diagnostic::new(ZERO_ITERATIONS, "iteration count is zero"));
                }
                let rows_affected = affected * u64::from(iterations);
                (ExecStatus::Success { rows_affected }, None)
            }
            Plan::Script(Script::Query { columns, rows }) => (
                ExecStatus::Success { rows_affected: 0 },
                Some(ResultSet {
                    columns: columns.clone(),
                    rows: rows.iter().cloned().collect(),
                    binds: slot.binds.clone(),
                }),
            ),
            Plan::Echo(labels) => {
                let mut columns = Vec::with_capacity(labels.len());
                let mut row = Vec::with_capacity(labels.len());
                for label in labels {
                    let bound = slot
                        .binds
                        .get(label)
                        .ok_or_else(|| illegal_variable(label))?;
                    columns.push(echo_column(label, bound));
                    row.push(Cell::Param(label.clone()));
                }
                (
                    ExecStatus::Success { rows_affected: 0 },
                    Some(ResultSet {
                        columns,
                        rows: VecDeque::from([row]),
                        binds: slot.binds.clone(),
                    }),
                )
            }
        };
        let sql = slot.sql.clone();
        slot.result = result;
        engine.executions.push(Execution {
            sql,
            iterations,
            binds,
        });
        Ok(status)
    }

    fn fetch(&self, stmt: StmtHandle, outputs: &mut [&mut WireBuffer]) -> DriverResult<FetchStatus> {
        let mut engine = self.engine("fetch");
        let slot = engine.statement(stmt)?;
        let result = slot
            .result
            .as_mut()
            .ok_or_else(|| Diagnostic::new(FETCH_OUT_OF_SEQUENCE, "fetch out of sequence"))?;
        let Some(row) = result.rows.pop_front() else {
            return Ok(FetchStatus::NoData);
        };
        let binds = result.binds.clone();

        let mut nested = Vec::new();
        for (index, out) in outputs.iter_mut().enumerate() {
            let datum = match row.get(index) {
                Some(Cell::Cursor(script)) => {
                    let Script::Query { columns, rows } = script.as_ref() else {
                        return Err(Diagnostic::new(
                            INCONSISTENT_DATATYPES,
                            "cursor cell must hold a query",
                        ));
                    };
                    nested.push((index, columns.clone(), rows.clone()));
                    continue;
                }
                Some(cell) => resolve(cell, &binds)?,
                None => Datum::Null,
            };
            store(&datum, out)?;
        }

        for (index, columns, rows) in nested {
            let handle = engine.allocate();
            engine.statements.insert(
                handle,
                StmtSlot {
                    result: Some(ResultSet {
                        columns,
                        rows: rows.into_iter().collect(),
                        binds: HashMap::new(),
                    }),
                    ..StmtSlot::default()
                },
            );
            store(&Datum::Cursor(handle), &mut *outputs[index])?;
        }
        Ok(FetchStatus::Row)
    }
}

const KEYWORDS: &[&str] = &[
    "SELECT", "WITH", "INSERT", "UPDATE", "DELETE", "MERGE", "CREATE", "ALTER", "DROP",
    "TRUNCATE", "BEGIN", "DECLARE", "CALL", "GRANT", "REVOKE", "LOCK",
];

fn plan_for(scripts: &HashMap<String, Script>, sql: &str) -> DriverResult<Plan> {
    let key = sql.trim();
    if key.is_empty() {
        return Err(Diagnostic::new(EMPTY_STATEMENT, "statement text is empty"));
    }
    if let Some(script) = scripts.get(key) {
        return Ok(Plan::Script(script.clone()));
    }
    if let Some(labels) = echo_labels(key) {
        return Ok(Plan::Echo(labels));
    }
    let keyword = key
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();
    if KEYWORDS.contains(&keyword.as_str()) {
        Err(Diagnostic::new(UNKNOWN_OBJECT, "table or view does not exist"))
    } else {
        Err(Diagnostic::new(INVALID_SQL, "invalid SQL statement"))
    }
}

/// Placeholder names of `SELECT :a, :b FROM dual`, lowercased.
fn echo_labels(sql: &str) -> Option<Vec<String>> {
    let upper = sql.to_ascii_uppercase();
    if !upper.starts_with("SELECT ") {
        return None;
    }
    let list_end = upper.strip_suffix(" FROM DUAL")?.len();
    let list = sql.get("SELECT ".len()..list_end)?;
    list.split(',')
        .map(|item| {
            let name = item.trim().strip_prefix(':')?;
            is_identifier(name).then(|| name.to_ascii_lowercase())
        })
        .collect()
}

fn echo_column(label: &str, bound: &Bound) -> ColumnDef {
    let name = format!(":{}", label.to_ascii_uppercase());
    match bound.type_code {
        TypeCode::VARNUM | TypeCode::NUMBER => ColumnDef::number(name, 0, -127),
        TypeCode::DATE => ColumnDef::date(name),
        _ => ColumnDef::varchar(name, bound.capacity.max(1)),
    }
}

/// Distinct placeholder names in order of first appearance, lowercased.
/// Colons inside quoted literals are ignored.
fn placeholders(sql: &str) -> Vec<String> {
    let chars: Vec<char> = sql.chars().collect();
    let mut names: Vec<String> = Vec::new();
    let mut in_literal = false;
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '\'' => in_literal = !in_literal,
            ':' if !in_literal => {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && (chars[end].is_ascii_alphanumeric() || chars[end] == '_')
                {
                    end += 1;
                }
                if end > start {
                    let name: String = chars[start..end].iter().collect();
                    let name = name.to_ascii_lowercase();
                    if !names.contains(&name) {
                        names.push(name);
                    }
                    i = end;
                    continue;
                }
            }
            _ => {}
        }
        i += 1;
    }
    names
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn normalize_label(label: &str) -> String {
    label.trim().trim_start_matches(':').to_ascii_lowercase()
}

fn illegal_variable(name: &str) -> Diagnostic {
    Diagnostic::new(ILLEGAL_VARIABLE, format!("illegal variable name/number: {name}"))
}

fn result_set(slot: &StmtSlot) -> DriverResult<&ResultSet> {
    slot.result
        .as_ref()
        .ok_or_else(|| Diagnostic::new(NOT_EXECUTED, "statement handle not executed"))
}

fn column_def(slot: &StmtSlot, ordinal: usize) -> DriverResult<&ColumnDef> {
    result_set(slot)?
        .columns
        .get(ordinal.wrapping_sub(1))
        .ok_or_else(|| {
            Diagnostic::new(NO_DESCRIPTOR, format!("no descriptor for position {ordinal}"))
        })
}

fn is_text(type_code: TypeCode) -> bool {
    matches!(
        type_code,
        TypeCode::STRING | TypeCode::VARCHAR2 | TypeCode::CHAR | TypeCode::ROWID
    )
}

fn is_number(type_code: TypeCode) -> bool {
    matches!(type_code, TypeCode::VARNUM | TypeCode::NUMBER)
}

fn is_cursor(type_code: TypeCode) -> bool {
    matches!(type_code, TypeCode::RSET | TypeCode::CURSOR)
}

/// Whether a column of type `column` can be fetched into a buffer of type
/// `output`.
fn convertible(column: TypeCode, output: TypeCode) -> bool {
    if is_text(column) {
        is_text(output) || is_number(output) || output == TypeCode::DATE
    } else if is_number(column) {
        is_text(output) || is_number(output)
    } else if column == TypeCode::DATE {
        is_text(output) || output == TypeCode::DATE
    } else if is_cursor(column) {
        is_cursor(output)
    } else {
        false
    }
}

fn inconsistent(target: TypeCode) -> Diagnostic {
    Diagnostic::new(
        INCONSISTENT_DATATYPES,
        format!("inconsistent datatypes: cannot convert to {target}"),
    )
}

fn invalid_number(text: &str) -> Diagnostic {
    Diagnostic::new(INVALID_NUMBER, format!("invalid number: '{text}'"))
}

fn read_bound(buf: &WireBuffer) -> DriverResult<Bound> {
    let type_code = buf.type_code();
    let datum = if buf.is_null() {
        Datum::Null
    } else if is_text(type_code) {
        let text = std::str::from_utf8(buf.bytes())
            .map_err(|_| Diagnostic::new(INCONSISTENT_DATATYPES, "bound text is not UTF-8"))?;
        Datum::Text(text.to_owned())
    } else if is_number(type_code) {
        let (mantissa, scale) = wire::decode_number(buf.bytes())
            .ok_or_else(|| Diagnostic::new(INVALID_NUMBER, "malformed bound number"))?;
        Datum::Number { mantissa, scale }
    } else if type_code == TypeCode::DATE {
        let date = wire::decode_date(buf.bytes())
            .ok_or_else(|| Diagnostic::new(DATE_FORMAT_MISMATCH, "malformed bound date"))?;
        Datum::Date(date)
    } else {
        return Err(Diagnostic::new(
            INCONSISTENT_DATATYPES,
            format!("cannot bind a value of type {type_code}"),
        ));
    };
    Ok(Bound {
        type_code,
        capacity: buf.capacity(),
        datum,
    })
}

fn resolve(cell: &Cell, binds: &HashMap<String, Bound>) -> DriverResult<Datum> {
    match cell {
        Cell::Null => Ok(Datum::Null),
        Cell::Text(text) => Ok(Datum::Text(text.clone())),
        Cell::Number(text) => parse_decimal(text)
            .map(|(mantissa, scale)| Datum::Number { mantissa, scale })
            .ok_or_else(|| invalid_number(text)),
        Cell::Date(date) => Ok(Datum::Date(*date)),
        Cell::Param(label) => binds
            .get(&normalize_label(label))
            .map(|bound| bound.datum.clone())
            .ok_or_else(|| {
                Diagnostic::new(NOT_ALL_BOUND, format!("not all variables bound: {label}"))
            }),
        Cell::Cursor(_) => Err(inconsistent(TypeCode::RSET)),
    }
}

/// Converts `datum` to the buffer's type and writes it in place. Text is cut
/// to fit; fixed-size types must fit exactly.
fn store(datum: &Datum, out: &mut WireBuffer) -> DriverResult<()> {
    let target = out.type_code();
    if let Datum::Null = datum {
        out.set_null();
        return Ok(());
    }
    if is_text(target) {
        let text = match datum {
            Datum::Text(text) => text.clone(),
            Datum::Number { mantissa, scale } => format_decimal(*mantissa, *scale),
            Datum::Date(date) => date.format(DEFAULT_DATE_FORMAT).to_string(),
            _ => return Err(inconsistent(target)),
        };
        out.write_truncated(&text);
        return Ok(());
    }
    let bytes = match datum {
        Datum::Number { mantissa, scale } if is_number(target) => {
            wire::encode_number(*mantissa, *scale).to_vec()
        }
        Datum::Text(text) if is_number(target) => {
            let (mantissa, scale) =
                parse_decimal(text.trim()).ok_or_else(|| invalid_number(text))?;
            wire::encode_number(mantissa, scale).to_vec()
        }
        Datum::Date(date) if target == TypeCode::DATE => wire::encode_date(date)
            .ok_or_else(|| inconsistent(target))?
            .to_vec(),
        Datum::Text(text) if target == TypeCode::DATE => {
            let date = NaiveDateTime::parse_from_str(text.trim(), DEFAULT_DATE_FORMAT).map_err(
                |_| {
                    Diagnostic::new(
                        DATE_FORMAT_MISMATCH,
                        format!("literal does not match format string: '{text}'"),
                    )
                },
            )?;
            wire::encode_date(&date)
                .ok_or_else(|| inconsistent(target))?
                .to_vec()
        }
        Datum::Cursor(handle) if is_cursor(target) => wire::encode_cursor(*handle).to_vec(),
        _ => return Err(inconsistent(target)),
    };
    out.write(&bytes).map_err(|overflow| {
        Diagnostic::new(
            VALUE_TRUNCATED,
            format!(
                "fetched column value was truncated: {} bytes into {}",
                overflow.needed, overflow.capacity
            ),
        )
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::NaiveDate;

    use crate::{
        driver::memory::{
            echo_labels, placeholders, plan_for, store, Datum, Plan, Script, INVALID_SQL,
            UNKNOWN_OBJECT, VALUE_TRUNCATED,
        },
        wire::{self, TypeCode, WireBuffer},
    };

    #[test]
    fn placeholders_skip_literals_and_repeats() {
        assert_eq!(
            placeholders("SELECT ':no' FROM t WHERE a = :A AND b = :b_2 OR c = :a"),
            vec!["a".to_owned(), "b_2".to_owned()]
        );
        assert!(placeholders("SELECT 1 FROM dual").is_empty());
    }

    #[test]
    fn echo_statement_is_recognized() {
        assert_eq!(
            echo_labels("SELECT :x, :Y FROM dual"),
            Some(vec!["x".to_owned(), "y".to_owned()])
        );
        assert_eq!(echo_labels("SELECT :x, 1 FROM dual"), None);
        assert_eq!(echo_labels("SELECT :x FROM t"), None);
    }

    #[test]
    fn unscripted_text_is_rejected_with_native_codes() {
        let scripts = HashMap::new();
        let err = plan_for(&scripts, "SELEKT 1").expect_err("must fail");
        assert_eq!(err.code, INVALID_SQL);
        let err = plan_for(&scripts, "select * from missing").expect_err("must fail");
        assert_eq!(err.code, UNKNOWN_OBJECT);
        assert!(matches!(plan_for(&scripts, "SELECT :a FROM DUAL"), Ok(Plan::Echo(_))));
    }

    #[test]
    fn scripts_match_trimmed_text() {
        let mut scripts = HashMap::new();
        scripts.insert("DELETE FROM t".to_owned(), Script::mutation(1));
        assert!(matches!(
            plan_for(&scripts, "  DELETE FROM t\n"),
            Ok(Plan::Script(Script::Mutation { affected: 1 }))
        ));
    }

    #[test]
    fn store_converts_between_types() {
        let mut text = WireBuffer::new(TypeCode::STRING, 16);
        store(&Datum::Number { mantissa: -1250, scale: 2 }, &mut text).expect("must store");
        assert_eq!(text.bytes(), b"-12.5");

        let mut number = WireBuffer::new(TypeCode::VARNUM, wire::NUMBER_WIRE_SIZE);
        store(&Datum::Text(" 42 ".to_owned()), &mut number).expect("must store");
        assert_eq!(wire::decode_number(number.bytes()), Some((42, 0)));

        let mut date = WireBuffer::new(TypeCode::DATE, wire::DATE_WIRE_SIZE);
        store(&Datum::Text("2024/02/29 13:45:00".to_owned()), &mut date).expect("must store");
        let expected = NaiveDate::from_ymd_opt(2024, 2, 29)
            .and_then(|d| d.and_hms_opt(13, 45, 0))
            .expect("valid date");
        assert_eq!(wire::decode_date(date.bytes()), Some(expected));
    }

    #[test]
    fn store_truncates_text_and_rejects_short_fixed_buffers() {
        let mut text = WireBuffer::new(TypeCode::STRING, 3);
        store(&Datum::Text("hello".to_owned()), &mut text).expect("must store");
        assert_eq!(text.bytes(), b"hel");
        assert_eq!(text.indicator().0, 5);

        let mut tiny = WireBuffer::new(TypeCode::VARNUM, 4);
        let err = store(&Datum::Number { mantissa: 1, scale: 0 }, &mut tiny).expect_err("must fail");
        assert_eq!(err.code, VALUE_TRUNCATED);
    }

    #[test]
    fn store_null_sets_indicator() {
        let mut text = WireBuffer::new(TypeCode::STRING, 3);
        store(&Datum::Text("a".to_owned()), &mut text).expect("must store");
        store(&Datum::Null, &mut text).expect("must store");
        assert!(text.is_null());
    }
}
