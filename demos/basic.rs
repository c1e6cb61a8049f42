use sqlcall::{
    driver::memory::{Cell, ColumnDef, Script},
    ConnectParams, Environment, MemoryDriver, NullableValue, Statement,
};

fn main() -> anyhow::Result<()> {
    let driver = MemoryDriver::new()
        .with_script(
            "INSERT INTO users (id, name) VALUES (:q1, :q2)",
            Script::mutation(1),
        )
        .with_script(
            "SELECT id, name FROM users WHERE name = :name",
            Script::query(
                vec![ColumnDef::number("ID", 10, 0), ColumnDef::varchar("NAME", 40)],
                vec![vec![Cell::number("1"), Cell::param(":name")]],
            ),
        );
    let env = Environment::from_driver(driver);
    let params = ConnectParams::from_env().unwrap_or_else(|_| ConnectParams::parse("scott/tiger"));
    let conn = env.connect(params);

    let mut insert = Statement::new(&conn)?;
    insert
        .append("INSERT INTO users (id, name) VALUES (")?
        .bind_q(&NullableValue::integer(1))?
        .append(", ")?
        .bind_q(&NullableValue::text("Kit"))?
        .append(")")?;
    let result = insert.exec()?;
    println!("inserted {} row(s)", result.affected_rows);
    conn.commit()?;

    let mut query = conn.query("SELECT id, name FROM users WHERE name = :name")?;
    query.bind_named(&NullableValue::text("Kit"), ":name")?;
    while query.fetch()? {
        if let Some(row) = query.row() {
            println!("{row}");
        }
    }

    Ok(())
}
