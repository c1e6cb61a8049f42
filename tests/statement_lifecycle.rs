use std::rc::Rc;

use sqlcall::{
    driver::memory::{Cell, ColumnDef, Datum, Script},
    BindTarget, ConnectParams, Connection, Environment, ErrorKind, MemoryDriver, NullableValue,
    RowBinding, SqlCallError, Statement, StatementKind, StatementOptions, StatementState,
};

const SELECT_EMP: &str = "SELECT id, name FROM emp";
const INSERT_T: &str = "INSERT INTO t VALUES (:q1, :q2)";
const RAISE: &str = "UPDATE emp SET sal = :sal WHERE id = :id";

fn driver() -> Rc<MemoryDriver> {
    Rc::new(
        MemoryDriver::new()
            .with_credentials("scott", "tiger")
            .with_script(
                SELECT_EMP,
                Script::query(
                    vec![ColumnDef::number("ID", 6, 0), ColumnDef::varchar("NAME", 20)],
                    vec![
                        vec![Cell::number("7369"), Cell::text("SMITH")],
                        vec![Cell::number("7499"), Cell::text("ALLEN")],
                        vec![Cell::number("7521"), Cell::Null],
                    ],
                ),
            )
            .with_script(INSERT_T, Script::mutation(1))
            .with_script("INSERT INTO t VALUES (:q1)", Script::mutation(1))
            .with_script("UPDATE emp SET sal = sal * 1.1", Script::mutation(14))
            .with_script(RAISE, Script::mutation(1))
            .with_script(
                "INSERT INTO dup VALUES (:id)",
                Script::failure(1, "unique constraint violated"),
            ),
    )
}

fn connect(driver: &Rc<MemoryDriver>) -> Connection {
    let env = Environment::new(driver.clone());
    Connection::new(&env, ConnectParams::parse("scott/tiger"))
}

fn assert_kind(result: Result<impl std::fmt::Debug, SqlCallError>, kind: ErrorKind) {
    let err = result.expect_err("must fail");
    assert_eq!(err.kind(), kind, "unexpected error: {err}");
}

#[test]
fn deferred_binds_build_the_insert() {
    let driver = driver();
    let conn = connect(&driver);
    let mut stmt = Statement::new(&conn).expect("must allocate");

    stmt.append("INSERT INTO t VALUES (")
        .and_then(|s| s.bind_q(&NullableValue::integer(42)))
        .and_then(|s| s.append(", "))
        .and_then(|s| s.bind_q(&NullableValue::text("hello")))
        .and_then(|s| s.append(")"))
        .expect("must compose");
    assert_eq!(stmt.text(), INSERT_T);

    stmt.prepare_text().expect("must prepare");
    assert_eq!(stmt.pending_binds(), 0);
    let binds = stmt.binds();
    assert_eq!(binds.len(), 2);
    assert_eq!(binds[0].target, BindTarget::Label(":q1".to_owned()));
    assert_eq!(binds[0].value.as_integer().expect("must convert"), 42);
    assert_eq!(binds[1].target, BindTarget::Label(":q2".to_owned()));
    assert_eq!(binds[1].value.as_string().expect("must convert"), "hello");

    let result = stmt.exec().expect("must execute");
    assert_eq!(result.affected_rows, 1);

    let execution = driver.last_execution().expect("must be recorded");
    assert_eq!(
        execution.binds,
        vec![
            (":q1".to_owned(), Datum::Number { mantissa: 42, scale: 0 }),
            (":q2".to_owned(), Datum::Text("hello".to_owned())),
        ]
    );
}

#[test]
fn deferred_and_immediate_binds_are_equivalent() {
    let driver = driver();
    let conn = connect(&driver);
    let first = NullableValue::integer(42);
    let second = NullableValue::text("hello");

    let mut deferred = Statement::new(&conn).expect("must allocate");
    deferred
        .append("INSERT INTO t VALUES (")
        .and_then(|s| s.bind_q(&first))
        .and_then(|s| s.append(", "))
        .and_then(|s| s.bind_q(&second))
        .and_then(|s| s.append(")"))
        .expect("must compose");
    deferred.exec().expect("must execute");

    let mut immediate = conn.prepare(INSERT_T).expect("must prepare");
    immediate.bind_named(&first, ":q1").expect("must bind");
    immediate.bind_named(&second, ":q2").expect("must bind");
    immediate.exec().expect("must execute");

    let executions = driver.executions();
    assert_eq!(executions.len(), 2);
    assert_eq!(executions[0], executions[1]);
}

#[test]
fn queued_row_joins_placeholders() {
    let driver = driver();
    let conn = connect(&driver);
    let mut row = RowBinding::new();
    row.add(NullableValue::integer(1), "A");
    row.add(NullableValue::text("x"), "B");

    let mut stmt = Statement::new(&conn).expect("must allocate");
    stmt.append("INSERT INTO t VALUES (")
        .and_then(|s| s.bind_q_row(&row))
        .and_then(|s| s.append(")"))
        .expect("must compose");
    assert_eq!(stmt.text(), INSERT_T);
    assert_eq!(stmt.exec().expect("must execute").affected_rows, 1);

    assert_kind(
        Statement::new(&conn)
            .expect("must allocate")
            .bind_q_row(&RowBinding::new())
            .map(|_| ()),
        ErrorKind::Value,
    );
}

#[test]
fn label_prefix_comes_from_connection_options() {
    let driver = driver();
    let env = Environment::new(driver.clone());
    let conn = Connection::new(&env, ConnectParams::parse("scott/tiger")).with_options(
        StatementOptions {
            bind_label_prefix: "bindq".to_owned(),
            ..StatementOptions::default()
        },
    );
    let mut stmt = Statement::new(&conn).expect("must allocate");
    stmt.bind_q(&NullableValue::integer(1)).expect("must queue");
    assert_eq!(stmt.text(), ":bindq1");
}

#[test]
fn state_never_decreases_until_close() {
    let driver = driver();
    let conn = connect(&driver);
    let mut stmt = Statement::new(&conn).expect("must allocate");
    let mut seen = vec![stmt.state()];

    stmt.append(SELECT_EMP).expect("must append");
    seen.push(stmt.state());
    stmt.exec().expect("must execute");
    seen.push(stmt.state());
    stmt.exec().expect("must execute again");
    seen.push(stmt.state());
    while stmt.fetch().expect("must fetch") {
        seen.push(stmt.state());
    }
    seen.push(stmt.state());
    stmt.exec().expect("re-execution keeps the state");
    seen.push(stmt.state());

    assert!(seen.windows(2).all(|pair| pair[0] <= pair[1]), "{seen:?}");
    assert_eq!(seen.last(), Some(&StatementState::Fetched));

    stmt.close();
    assert_eq!(stmt.state(), StatementState::Closed);
}

#[test]
fn exec_prepares_implicitly() {
    let driver = driver();
    let conn = connect(&driver);
    let mut stmt = Statement::new(&conn).expect("must allocate");
    stmt.append("UPDATE emp SET sal = sal * 1.1").expect("must append");
    assert_eq!(stmt.exec().expect("must execute").affected_rows, 14);
    assert_eq!(stmt.kind(), StatementKind::Mutation);
    assert_eq!(driver.call_count("prepare"), 1);
    assert_eq!(stmt.state(), StatementState::Executed);
}

#[test]
fn exec_n_repeats_mutations() {
    let driver = driver();
    let conn = connect(&driver);
    let mut stmt = conn.mutation("UPDATE emp SET sal = sal * 1.1").expect("must prepare");
    assert_eq!(stmt.exec_n(3).expect("must execute").affected_rows, 42);
    assert_eq!(driver.last_execution().expect("must be recorded").iterations, 3);

    let mut query = conn.query(SELECT_EMP).expect("must prepare");
    assert_kind(query.exec_n(2), ErrorKind::Type);
}

#[test]
fn queries_execute_with_zero_iterations() {
    let driver = driver();
    let conn = connect(&driver);
    let mut stmt = conn.query(SELECT_EMP).expect("must prepare");
    assert_eq!(stmt.exec().expect("must execute").affected_rows, 0);
    assert_eq!(driver.last_execution().expect("must be recorded").iterations, 0);
}

#[test]
fn fetch_iterates_rows_in_place() {
    let driver = driver();
    let conn = connect(&driver);
    let mut stmt = conn.query(SELECT_EMP).expect("must prepare");

    let mut names = Vec::new();
    while stmt.fetch().expect("must fetch") {
        let id = stmt.column(0).expect("must exist").as_integer().expect("must convert");
        let name = stmt
            .column_by_name("NAME")
            .expect("must exist")
            .as_string_or("<none>")
            .expect("must convert");
        names.push(format!("{id}:{name}"));
    }
    assert_eq!(names, ["7369:SMITH", "7499:ALLEN", "7521:<none>"]);

    let schema = stmt.schema().expect("must be discovered");
    let row = stmt.row().expect("must be defined");
    assert_eq!(schema.len(), row.len());
    for column in schema.iter() {
        assert_eq!(row.position_of(&column.name), Some(column.position));
    }
}

#[test]
fn illegal_orders_are_state_errors() {
    let driver = driver();
    let conn = connect(&driver);

    let mut stmt = conn.query(SELECT_EMP).expect("must prepare");
    stmt.fetch().expect("must fetch");
    assert_kind(stmt.bind_col(NullableValue::null_number()), ErrorKind::State);
    assert_kind(stmt.bind(&NullableValue::integer(1)), ErrorKind::State);
    assert_kind(stmt.bind_q(&NullableValue::integer(1)).map(|_| ()), ErrorKind::State);
    assert_kind(stmt.prepare(SELECT_EMP), ErrorKind::State);

    stmt.close();
    assert_kind(stmt.fetch(), ErrorKind::State);
    assert_kind(stmt.exec(), ErrorKind::State);
    assert_kind(stmt.bind(&NullableValue::integer(1)), ErrorKind::State);
}

#[test]
fn unresolved_placeholders_are_not_fabricated() {
    let driver = driver();
    let conn = connect(&driver);
    let mut stmt = conn.prepare("INSERT INTO t VALUES (:q1)").expect("must prepare");
    assert!(stmt.binds().is_empty());

    let err = stmt.exec().expect_err("must fail");
    assert_eq!(err.native_code(), Some(1008));
    assert_eq!(stmt.state(), StatementState::Prepared);
}

#[test]
fn rejected_queued_bind_stays_queued() {
    let driver = driver();
    let conn = connect(&driver);
    let mut stmt = Statement::new(&conn).expect("must allocate");
    stmt.append("INSERT INTO t VALUES (")
        .and_then(|s| s.bind_q(&NullableValue::integer(1)))
        .and_then(|s| s.append(", "))
        .and_then(|s| s.bind_q(&NullableValue::integer(2)))
        .and_then(|s| s.append(")"))
        .expect("must compose");

    let err = stmt.prepare("INSERT INTO t VALUES (:q1)").expect_err("must fail");
    assert_eq!(err.native_code(), Some(1036));
    assert_eq!(err.context().get("label"), Some(":q2"));
    assert_eq!(stmt.state(), StatementState::Prepared);
    assert_eq!(stmt.binds().len(), 1);
    assert_eq!(stmt.pending_binds(), 1);

    let err = stmt.exec().expect_err("queued value must still be pending");
    assert_eq!(err.native_code(), Some(1036));
    assert_eq!(stmt.pending_binds(), 1);
    assert!(driver.executions().is_empty());
}

#[test]
fn rebound_value_reaches_the_next_exec() {
    let driver = driver();
    let conn = connect(&driver);
    let mut stmt = conn.mutation(RAISE).expect("must prepare");
    stmt.bind_named(&NullableValue::integer(800), ":sal").expect("must bind");
    stmt.bind_named(&NullableValue::integer(7369), ":id").expect("must bind");
    stmt.exec().expect("must execute");

    let sal = stmt
        .bind_value_mut(&BindTarget::Label("SAL".to_owned()))
        .expect("must be bound");
    *sal = NullableValue::integer(950);
    stmt.exec().expect("must execute again");

    let executions = driver.executions();
    assert_eq!(executions.len(), 2);
    assert_eq!(
        executions[0].binds[0],
        (":sal".to_owned(), Datum::Number { mantissa: 800, scale: 0 })
    );
    assert_eq!(
        executions[1].binds,
        vec![
            (":sal".to_owned(), Datum::Number { mantissa: 950, scale: 0 }),
            (":id".to_owned(), Datum::Number { mantissa: 7369, scale: 0 }),
        ]
    );
    assert_eq!(stmt.binds()[0].value.as_integer().expect("must convert"), 950);

    assert_kind(stmt.bind_value_mut(&BindTarget::Position(3)), ErrorKind::Value);
    assert_kind(stmt.bind(&NullableValue::integer(1)), ErrorKind::State);
    stmt.close();
    assert_kind(
        stmt.bind_value_mut(&BindTarget::Label(":sal".to_owned())),
        ErrorKind::State,
    );
}

#[test]
fn engine_failures_carry_code_and_statement() {
    let driver = driver();
    let conn = connect(&driver);
    let mut stmt = conn.prepare("INSERT INTO dup VALUES (:id)").expect("must prepare");
    stmt.bind(&NullableValue::integer(7)).expect("must bind");
    let err = stmt.exec().expect_err("must fail");
    assert!(matches!(err, SqlCallError::Driver { code: 1, .. }));
    assert_eq!(err.context().get("statement"), Some("INSERT INTO dup VALUES (:id)"));

    let err = stmt.bind_named(&NullableValue::integer(1), ":nope").expect_err("must fail");
    assert_eq!(err.native_code(), Some(1036));
    assert_eq!(err.context().get("label"), Some(":nope"));
}

#[test]
fn rejected_text_reports_native_code() {
    let driver = driver();
    let conn = connect(&driver);
    let err = conn.prepare("SELECT * FROM missing").expect_err("must fail");
    assert_eq!(err.native_code(), Some(942));
    assert_eq!(err.context().get("statement"), Some("SELECT * FROM missing"));
    assert_eq!(driver.open_statements(), 0);
}

#[test]
fn close_twice_is_harmless() {
    let driver = driver();
    let conn = connect(&driver);
    let mut stmt = conn.query(SELECT_EMP).expect("must prepare");
    stmt.fetch().expect("must fetch");
    stmt.close();
    let frees = driver.call_count("free_statement");
    stmt.close();
    assert_eq!(stmt.state(), StatementState::Closed);
    assert_eq!(driver.call_count("free_statement"), frees);
    assert_eq!(driver.open_statements(), 0);
}

#[test]
fn factory_mismatch_invalidates_and_releases() {
    let driver = driver();
    let conn = connect(&driver);
    assert_kind(conn.query("UPDATE emp SET sal = sal * 1.1"), ErrorKind::Type);
    assert_kind(conn.mutation(SELECT_EMP), ErrorKind::Type);
    assert_eq!(driver.open_statements(), 0);
}

#[test]
fn dropping_the_connection_rolls_back() {
    let driver = driver();
    {
        let conn = connect(&driver);
        let mut stmt = conn.mutation("UPDATE emp SET sal = sal * 1.1").expect("must prepare");
        stmt.exec().expect("must execute");
        conn.commit().expect("must commit");
    }
    assert_eq!(driver.commits(), 1);
    assert_eq!(driver.rollbacks(), 1);
    assert_eq!(driver.open_sessions(), 0);
    assert_eq!(driver.open_statements(), 0);
}
