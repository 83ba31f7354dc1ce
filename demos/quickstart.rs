//! End-to-end walkthrough: configuration, session, mapper dispatch.
//!
//! Run with: cargo run --example quickstart

use sqlbind::fixture::FixtureSource;
use sqlbind::{
    Cardinality, Configuration, DataType, DirectTransactionFactory, Environment, MappedStatement,
    MapperDescriptor, ResultSet, ReturnShape, SessionFactory,
};

fn main() -> anyhow::Result<()> {
    // A fixture source stands in for a real driver; swap in any
    // ConnectionSource implementation backed by an actual database.
    let source = FixtureSource::new()
        .with_result(
            "SELECT id, name FROM users WHERE name = ?",
            ResultSet::new(
                vec!["id".into(), "name".into()],
                vec![vec![1i64.into(), "chenqincheng".into()]],
            ),
        )
        .with_result(
            "SELECT id, name FROM users",
            ResultSet::new(
                vec!["id".into(), "name".into()],
                vec![
                    vec![1i64.into(), "chenqincheng".into()],
                    vec![2i64.into(), "alice".into()],
                ],
            ),
        );

    let mut config = Configuration::new();
    config.add_environment(
        Environment::builder("dev")
            .transaction_factory(DirectTransactionFactory::new())
            .data_source(source)
            .build()?,
    )?;
    config.add_statement(
        MappedStatement::builder("UserMapper.selectByName")
            .sql("SELECT id, name FROM users WHERE name = ?")
            .param("name", DataType::Text)
            .result_column("id", DataType::Integer)
            .result_column("name", DataType::Text)
            .cardinality(Cardinality::One)
            .build()?,
    )?;
    config.add_statement(
        MappedStatement::builder("UserMapper.selectAll")
            .sql("SELECT id, name FROM users")
            .result_column("id", DataType::Integer)
            .result_column("name", DataType::Text)
            .cardinality(Cardinality::Many)
            .build()?,
    )?;

    let descriptor = MapperDescriptor::new("UserMapper")
        .method("selectByName", ReturnShape::Single)
        .method("selectAll", ReturnShape::Sequence);

    let factory = SessionFactory::new(config);
    let mut session = factory.open_session()?;

    {
        let mut users = session.mapper(&descriptor)?;

        let user = users.one("selectByName", &["chenqincheng".into()])?;
        match user {
            Some(row) => println!(
                "found user #{}: {}",
                row.get_i64("id").unwrap_or_default(),
                row.get_str("name").unwrap_or_default()
            ),
            None => println!("no such user"),
        }

        for row in users.list("selectAll", &[])? {
            println!(
                "  - #{} {}",
                row.get_i64("id").unwrap_or_default(),
                row.get_str("name").unwrap_or_default()
            );
        }
    }

    session.commit()?;
    session.close()?;
    Ok(())
}
